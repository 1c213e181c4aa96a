//! Category configuration loading
//!
//! The category file is a YAML mapping from category name to the prompt,
//! LoRA tags and optional mask folder for that category:
//!
//! ```yaml
//! cats:
//!   prompt: "a cat sitting on a windowsill"
//!   lora1: "<lora:cat_style_v2:0.8>"
//!   lora2: ""
//!   mask_folder: masks/cats
//! ```
//!
//! A missing file is not an error: it yields an empty mapping and the caller
//! falls back to free-text category entry ("manual mode").

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{CyclerError, CyclerResult};

/// Number of LoRA slots per category
pub const LORA_SLOTS: usize = 3;

/// Settings for one category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryConfig {
    /// Prompt text paired with every image of the category
    pub prompt: String,

    /// Raw LoRA tags (`lora1`..`lora3`), empty when unset
    pub lora_slots: [String; LORA_SLOTS],

    /// Mask folder override, relative to the parent directory unless absolute
    pub mask_folder: Option<PathBuf>,
}

/// A YAML scalar rendered as text; anything else is rejected at load time
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_yaml::Number),
    Flag(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
            Scalar::Flag(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCategory {
    prompt: Option<Scalar>,
    lora1: Option<Scalar>,
    lora2: Option<Scalar>,
    lora3: Option<Scalar>,
    mask_folder: Option<Scalar>,
}

fn text(value: Option<Scalar>) -> String {
    value.map(Scalar::into_string).unwrap_or_default()
}

impl From<RawCategory> for CategoryConfig {
    fn from(raw: RawCategory) -> Self {
        let mask_folder = Some(text(raw.mask_folder))
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Self {
            prompt: text(raw.prompt),
            lora_slots: [text(raw.lora1), text(raw.lora2), text(raw.lora3)],
            mask_folder,
        }
    }
}

/// All categories loaded from one YAML file
#[derive(Debug, Clone, Default)]
pub struct CategoryConfigs {
    source: Option<PathBuf>,
    categories: BTreeMap<String, CategoryConfig>,
}

impl CategoryConfigs {
    /// Load categories from `path`
    ///
    /// Returns an empty, manual-mode mapping when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> CyclerResult<Self> {
        let path = path.as_ref();
        debug!(?path, "CategoryConfigs::load: called");

        if !path.exists() {
            info!("Category file {} not found, using manual category entry", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| CyclerError::io(path, e))?;
        let categories = Self::parse(&content).map_err(|source| CyclerError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!(count = categories.len(), "Loaded categories from {}", path.display());
        Ok(Self {
            source: Some(path.to_path_buf()),
            categories,
        })
    }

    fn parse(content: &str) -> Result<BTreeMap<String, CategoryConfig>, serde_yaml::Error> {
        if content.trim().is_empty() {
            debug!("CategoryConfigs::parse: empty document");
            return Ok(BTreeMap::new());
        }

        let raw: Option<BTreeMap<String, Option<RawCategory>>> = serde_yaml::from_str(content)?;
        Ok(raw
            .unwrap_or_default()
            .into_iter()
            .map(|(name, cat)| (name, cat.unwrap_or_default().into()))
            .collect())
    }

    /// True when no category file was found
    pub fn is_manual(&self) -> bool {
        self.source.is_none()
    }

    /// Path the categories were loaded from
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn get(&self, category: &str) -> Option<&CategoryConfig> {
        self.categories.get(category)
    }

    /// Category names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Settings for `category`
    ///
    /// In manual mode any category is accepted and gets default settings.
    /// With a loaded file the category must be one of its keys.
    pub fn resolve(&self, category: &str) -> CyclerResult<CategoryConfig> {
        debug!(%category, manual = self.is_manual(), "CategoryConfigs::resolve: called");
        if self.is_manual() {
            return Ok(CategoryConfig::default());
        }

        self.get(category).cloned().ok_or_else(|| CyclerError::UnknownCategory {
            category: category.to_string(),
            available: self.names(),
        })
    }
}

/// Category names offered for selection
///
/// Any failure yields an empty list, which tells the caller to accept a
/// free-text category instead.
pub fn category_choices(path: impl AsRef<Path>) -> Vec<String> {
    match CategoryConfigs::load(path) {
        Ok(configs) => configs.names(),
        Err(e) => {
            debug!(%e, "category_choices: falling back to free-text entry");
            Vec::new()
        }
    }
}
