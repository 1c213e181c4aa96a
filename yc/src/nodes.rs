//! Node variants exposed to a host graph
//!
//! Each node is a fixed composition of category loading, cycling, mask
//! lookup and LoRA parsing with a fixed-shape output. Cycling nodes take the
//! caller's `CycleState`; nothing is kept between calls otherwise.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::categories::{CategoryConfig, CategoryConfigs, LORA_SLOTS};
use crate::cycle::{CycleState, ImageEntry};
use crate::error::CyclerResult;
use crate::frame::ImageFrame;
use crate::lora::{LoraLibrary, NO_LORA, ParsedLora, parse_lora};
use crate::mask::{ResolvedMask, resolve_mask};

/// Registered node types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    ImageCycler,
    LoraExtractor,
    ImageCyclerSimple,
    LoraSelector,
    LoraLoader,
}

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [
        NodeKind::ImageCycler,
        NodeKind::LoraExtractor,
        NodeKind::ImageCyclerSimple,
        NodeKind::LoraSelector,
        NodeKind::LoraLoader,
    ];

    /// Stable identifier used for registration
    pub fn id(&self) -> &'static str {
        match self {
            Self::ImageCycler => "YAMLImageCycler",
            Self::LoraExtractor => "YAMLLoRAExtractor",
            Self::ImageCyclerSimple => "YAMLImageCyclerSimple",
            Self::LoraSelector => "YAMLLoRASelector",
            Self::LoraLoader => "YAMLLoRALoader",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ImageCycler => "YAML Image Cycler (Full)",
            Self::LoraExtractor => "YAML LoRA Extractor",
            Self::ImageCyclerSimple => "YAML Image Cycler (Simple)",
            Self::LoraSelector => "YAML LoRA Selector",
            Self::LoraLoader => "YAML LoRA Loader",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Inputs of the cycling nodes
#[derive(Debug, Clone)]
pub struct CycleRequest {
    pub yaml_path: PathBuf,
    pub parent_dir: PathBuf,
    pub category: String,
}

/// Inputs of the LoRA nodes
#[derive(Debug, Clone)]
pub struct LoraRequest {
    pub yaml_path: PathBuf,
    pub category: String,
}

/// Inputs of [`LoraLoader`]
#[derive(Debug, Clone)]
pub struct LoraLoaderRequest {
    pub yaml_path: PathBuf,
    pub category: String,
    /// Per-slot names used instead of the YAML tags; `None`, `""` and
    /// `"None"` leave the slot to the YAML
    pub overrides: [Option<String>; LORA_SLOTS],
}

/// One cycling step: the selected image, its pixels and its mask
#[derive(Debug, Clone)]
struct CycledImage {
    entry: ImageEntry,
    image: ImageFrame,
    mask: ResolvedMask,
}

fn cycle_image(
    state: &mut CycleState,
    parent_dir: &Path,
    category: &str,
    config: &CategoryConfig,
) -> CyclerResult<CycledImage> {
    let entry = state.next_image(category, parent_dir)?;
    let image = ImageFrame::load(&entry.path)?;
    let mask = resolve_mask(
        &entry.path,
        parent_dir,
        category,
        config.mask_folder.as_deref(),
        image.dimensions(),
    );
    Ok(CycledImage { entry, image, mask })
}

fn parse_slots(config: &CategoryConfig) -> CyclerResult<[ParsedLora; LORA_SLOTS]> {
    let [a, b, c] = &config.lora_slots;
    Ok([parse_lora(a)?, parse_lora(b)?, parse_lora(c)?])
}

fn report<T>(kind: NodeKind, result: CyclerResult<T>) -> CyclerResult<T> {
    result.inspect_err(|e| debug!("[{}] {}", kind, e))
}

/// Output of [`ImageCycler`]
#[derive(Debug, Clone)]
pub struct ImageCyclerOutput {
    pub image: ImageFrame,
    pub mask: ResolvedMask,
    pub prompt: String,
    /// Raw LoRA tags as written in the YAML
    pub loras: [String; LORA_SLOTS],
    pub entry: ImageEntry,
}

/// Full cycler: image, mask, prompt and LoRA tags
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCycler;

impl ImageCycler {
    pub fn execute(&self, state: &mut CycleState, request: &CycleRequest) -> CyclerResult<ImageCyclerOutput> {
        debug!(?request, "ImageCycler::execute: called");
        report(NodeKind::ImageCycler, Self::run(state, request))
    }

    fn run(state: &mut CycleState, request: &CycleRequest) -> CyclerResult<ImageCyclerOutput> {
        let configs = CategoryConfigs::load(&request.yaml_path)?;
        let config = configs.resolve(&request.category)?;
        let cycled = cycle_image(state, &request.parent_dir, &request.category, &config)?;

        Ok(ImageCyclerOutput {
            image: cycled.image,
            mask: cycled.mask,
            prompt: config.prompt,
            loras: config.lora_slots,
            entry: cycled.entry,
        })
    }
}

/// Output of [`ImageCyclerSimple`]
#[derive(Debug, Clone)]
pub struct ImageCyclerSimpleOutput {
    pub image: ImageFrame,
    pub mask: ResolvedMask,
    /// Echo of the requested category, for chaining into LoRA nodes
    pub category: String,
    /// Echo of the requested YAML path
    pub yaml_path: PathBuf,
    pub entry: ImageEntry,
}

/// Simple cycler: image and mask only
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCyclerSimple;

impl ImageCyclerSimple {
    pub fn execute(&self, state: &mut CycleState, request: &CycleRequest) -> CyclerResult<ImageCyclerSimpleOutput> {
        debug!(?request, "ImageCyclerSimple::execute: called");
        report(NodeKind::ImageCyclerSimple, Self::run(state, request))
    }

    fn run(state: &mut CycleState, request: &CycleRequest) -> CyclerResult<ImageCyclerSimpleOutput> {
        let configs = CategoryConfigs::load(&request.yaml_path)?;
        let config = configs.resolve(&request.category)?;
        let cycled = cycle_image(state, &request.parent_dir, &request.category, &config)?;

        Ok(ImageCyclerSimpleOutput {
            image: cycled.image,
            mask: cycled.mask,
            category: request.category.clone(),
            yaml_path: request.yaml_path.clone(),
            entry: cycled.entry,
        })
    }
}

/// Output of [`LoraExtractor`]
#[derive(Debug, Clone, PartialEq)]
pub struct LoraExtractorOutput {
    pub prompt: String,
    pub names: [String; LORA_SLOTS],
    pub weights: [f64; LORA_SLOTS],
}

/// Splits a category's LoRA tags into names and weights
///
/// With a library set, each name is checked for a model file; a missing
/// file is only logged.
#[derive(Debug, Clone, Default)]
pub struct LoraExtractor {
    library: Option<LoraLibrary>,
}

impl LoraExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(library: LoraLibrary) -> Self {
        Self { library: Some(library) }
    }

    /// Fails with `LoraWeight` when any slot holds a tag with a malformed
    /// weight; the other slots are not returned in that case.
    pub fn execute(&self, request: &LoraRequest) -> CyclerResult<LoraExtractorOutput> {
        debug!(?request, "LoraExtractor::execute: called");
        report(NodeKind::LoraExtractor, self.run(request))
    }

    fn run(&self, request: &LoraRequest) -> CyclerResult<LoraExtractorOutput> {
        let configs = CategoryConfigs::load(&request.yaml_path)?;
        let config = configs.resolve(&request.category)?;
        let parsed = parse_slots(&config)?;

        if let Some(library) = &self.library {
            for lora in &parsed {
                library.check(&lora.name);
            }
        }

        info!("Category: {}", request.category);
        info!("Prompt: {}", config.prompt);
        for (i, lora) in parsed.iter().enumerate() {
            info!("LoRA{}: {} (weight: {})", i + 1, lora.name, lora.weight);
        }

        let [a, b, c] = parsed;
        Ok(LoraExtractorOutput {
            prompt: config.prompt,
            weights: [a.weight, b.weight, c.weight],
            names: [a.name, b.name, c.name],
        })
    }
}

/// Output of [`LoraSelector`]
#[derive(Debug, Clone, PartialEq)]
pub struct LoraSelectorOutput {
    /// Matched model files relative to the library root, empty when unmatched
    pub files: [String; LORA_SLOTS],
    pub strengths: [f64; LORA_SLOTS],
}

/// Maps a category's LoRA tags onto model files in a library
#[derive(Debug, Clone)]
pub struct LoraSelector {
    library: LoraLibrary,
}

impl LoraSelector {
    pub fn new(library: LoraLibrary) -> Self {
        Self { library }
    }

    /// Fails like [`LoraExtractor::execute`] on a malformed weight.
    pub fn execute(&self, request: &LoraRequest) -> CyclerResult<LoraSelectorOutput> {
        debug!(?request, "LoraSelector::execute: called");
        report(NodeKind::LoraSelector, self.run(request))
    }

    fn run(&self, request: &LoraRequest) -> CyclerResult<LoraSelectorOutput> {
        let configs = CategoryConfigs::load(&request.yaml_path)?;
        let config = configs.resolve(&request.category)?;
        let parsed = parse_slots(&config)?;

        let files = parsed.each_ref().map(|lora| match self.library.find(&lora.name) {
            Some(file) => file.to_string(),
            None => {
                self.library.check(&lora.name);
                String::new()
            }
        });

        info!("Category: {}", request.category);
        for (i, (file, lora)) in files.iter().zip(&parsed).enumerate() {
            info!("LoRA{}: {} (weight: {})", i + 1, file, lora.weight);
        }

        Ok(LoraSelectorOutput {
            strengths: parsed.each_ref().map(|lora| lora.weight),
            files,
        })
    }
}

/// Output of [`LoraLoader`]
#[derive(Debug, Clone, PartialEq)]
pub struct LoraLoaderOutput {
    pub prompt: String,
    /// Library names (file path without extension), `"None"` when unmatched
    pub names: [String; LORA_SLOTS],
}

/// Resolves a category's LoRA names against a library, in the loader form
/// hosts expect: the library's spelling of each name or `"None"`
#[derive(Debug, Clone)]
pub struct LoraLoader {
    library: LoraLibrary,
}

impl LoraLoader {
    pub fn new(library: LoraLibrary) -> Self {
        Self { library }
    }

    /// Overridden slots skip tag parsing. Fails like
    /// [`LoraExtractor::execute`] when a parsed slot has a malformed weight.
    pub fn execute(&self, request: &LoraLoaderRequest) -> CyclerResult<LoraLoaderOutput> {
        debug!(?request, "LoraLoader::execute: called");
        report(NodeKind::LoraLoader, self.run(request))
    }

    fn run(&self, request: &LoraLoaderRequest) -> CyclerResult<LoraLoaderOutput> {
        let configs = CategoryConfigs::load(&request.yaml_path)?;
        let config = configs.resolve(&request.category)?;

        let mut names: [String; LORA_SLOTS] = Default::default();
        for (i, name) in names.iter_mut().enumerate() {
            *name = match request.overrides[i].as_deref() {
                Some(over) if !over.is_empty() && over != NO_LORA => over.to_string(),
                _ => self.validate(&parse_lora(&config.lora_slots[i])?.name),
            };
        }

        info!("Category: {}", request.category);
        info!("Prompt: {}", config.prompt);
        for (i, name) in names.iter().enumerate() {
            info!("LoRA{}: {}", i + 1, name);
        }

        Ok(LoraLoaderOutput {
            prompt: config.prompt,
            names,
        })
    }

    fn validate(&self, name: &str) -> String {
        if name.is_empty() {
            return NO_LORA.to_string();
        }
        match self.library.canonical_name(name) {
            Some(found) => found.to_string(),
            None => {
                self.library.check(name);
                NO_LORA.to_string()
            }
        }
    }
}
