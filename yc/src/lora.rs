//! LoRA tag parsing and model file lookup
//!
//! Tags have the form `<lora:NAME:WEIGHT>`. Model files are looked up in a
//! LoRA directory by name; a missing file only produces a warning.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{CyclerError, CyclerResult};

/// Weight used when a slot is empty or not a LoRA tag
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Sentinel a host uses for an empty LoRA slot
pub const NO_LORA: &str = "None";

/// Extensions recognised as LoRA model files, in lookup priority order
pub const LORA_EXTENSIONS: &[&str] = &["safetensors", "ckpt", "pt", "pth"];

#[allow(clippy::expect_used)]
static LORA_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<lora:([^:>]+):([^>]*)>$").expect("valid regex"));

/// Name and blend weight extracted from a LoRA tag
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLora {
    pub name: String,
    pub weight: f64,
}

impl Default for ParsedLora {
    fn default() -> Self {
        Self {
            name: String::new(),
            weight: DEFAULT_WEIGHT,
        }
    }
}

impl ParsedLora {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

/// Parse a `<lora:NAME:WEIGHT>` tag
///
/// Empty or non-matching input gives an empty name with the default weight,
/// as does a tag whose name is blank. A tag whose weight is not a finite
/// number is an error.
pub fn parse_lora(raw: &str) -> CyclerResult<ParsedLora> {
    let raw = raw.trim();
    let Some(caps) = LORA_TAG_RE.captures(raw) else {
        if !raw.is_empty() {
            debug!(%raw, "parse_lora: not a LoRA tag");
        }
        return Ok(ParsedLora::default());
    };

    let name = caps[1].trim();
    if name.is_empty() {
        debug!(%raw, "parse_lora: blank LoRA name");
        return Ok(ParsedLora::default());
    }
    let weight_text = caps[2].trim();
    let weight = weight_text
        .parse::<f64>()
        .ok()
        .filter(|w| w.is_finite())
        .ok_or_else(|| CyclerError::LoraWeight {
            raw: raw.to_string(),
            weight: weight_text.to_string(),
        })?;

    Ok(ParsedLora {
        name: name.to_string(),
        weight,
    })
}

/// Model files available in a LoRA directory
#[derive(Debug, Clone, Default)]
pub struct LoraLibrary {
    root: PathBuf,
    /// Paths relative to `root`, `/`-separated, sorted
    files: Vec<String>,
}

impl LoraLibrary {
    /// Collect model files under `dir`, recursively
    ///
    /// A missing directory gives an empty library.
    pub fn scan(dir: impl AsRef<Path>) -> Self {
        let root = dir.as_ref().to_path_buf();
        debug!(?root, "LoraLibrary::scan: called");
        if !root.is_dir() {
            warn!("LoRA directory not found: {}", root.display());
            return Self { root, files: Vec::new() };
        }

        let mut files: Vec<String> = WalkDir::new(&root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| crate::scanner::matching_extension(e.path(), LORA_EXTENSIONS).is_some())
            .filter_map(|e| {
                e.path().strip_prefix(&root).ok().map(|rel| {
                    rel.components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/")
                })
            })
            .collect();
        files.sort();

        debug!(count = files.len(), "LoraLibrary::scan: files collected");
        Self { root, files }
    }

    /// Build a library from already-known relative file names
    pub fn from_files(root: impl Into<PathBuf>, files: impl IntoIterator<Item = String>) -> Self {
        let mut files: Vec<String> = files.into_iter().collect();
        files.sort();
        Self {
            root: root.into(),
            files,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Find the model file for `name`
    ///
    /// Tries `{name}.{ext}` for each known extension, then an exact stem
    /// match, then a case-insensitive stem match.
    pub fn find(&self, name: &str) -> Option<&str> {
        if name.is_empty() {
            return None;
        }

        for ext in LORA_EXTENSIONS {
            let wanted = format!("{}.{}", name, ext);
            if let Some(file) = self.files.iter().find(|f| **f == wanted) {
                return Some(file);
            }
        }

        if let Some(file) = self.files.iter().find(|f| stem(f) == name) {
            info!("Found LoRA file: {} -> {}", name, file);
            return Some(file);
        }

        let lowered = name.to_lowercase();
        if let Some(file) = self.files.iter().find(|f| stem(f).to_lowercase() == lowered) {
            info!("Found LoRA file (case corrected): {} -> {}", name, file);
            return Some(file);
        }

        None
    }

    /// Library spelling of `name`: the matched file's path without extension
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.find(name).map(stem)
    }

    /// Check that a model file exists for `name`, warning when it does not
    ///
    /// Returns whether the file was found; empty names count as found.
    pub fn check(&self, name: &str) -> bool {
        if name.is_empty() || self.find(name).is_some() {
            return true;
        }
        let preview: Vec<&str> = self.files.iter().take(10).map(String::as_str).collect();
        warn!("LoRA file for '{}' not found in {}", name, self.root.display());
        warn!("Available LoRAs: {:?}", preview);
        false
    }
}

/// Relative path without its extension
fn stem(file: &str) -> &str {
    match file.rfind('.') {
        Some(dot) if dot > file.rfind('/').map_or(0, |s| s + 1) => &file[..dot],
        _ => file,
    }
}
