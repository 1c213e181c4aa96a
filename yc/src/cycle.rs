//! Per-category round-robin cycling
//!
//! Each category keeps an unbounded counter. The image for an invocation is
//! `counter % len` over the folder listing as it is at that moment, so adding
//! or removing images between calls never yields an out-of-range index.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CyclerResult;
use crate::scanner;

/// The image picked by one cycling step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// Full path of the selected image
    pub path: PathBuf,
    /// 1-based position within the sorted listing
    pub position: usize,
    /// Number of images in the listing
    pub total: usize,
}

impl ImageEntry {
    /// File name of the selected image, for diagnostics
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Cycle counters keyed by category
///
/// Owned by the caller for the lifetime of a session; nothing here is global.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleState {
    counters: BTreeMap<String, u64>,
}

impl CycleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter for `category` (0 if never cycled)
    pub fn peek(&self, category: &str) -> u64 {
        self.counters.get(category).copied().unwrap_or(0)
    }

    /// Forget the counter for `category`, restarting it at the first image
    pub fn reset(&mut self, category: &str) {
        debug!(%category, "CycleState::reset: called");
        self.counters.remove(category);
    }

    /// Forget all counters
    pub fn clear(&mut self) {
        self.counters.clear();
    }

    /// Categories with a stored counter
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.counters.keys().map(String::as_str)
    }

    /// Select the next image of `category` under `parent_dir` and advance
    /// its counter
    ///
    /// On error the counter is left untouched.
    pub fn next_image(&mut self, category: &str, parent_dir: &Path) -> CyclerResult<ImageEntry> {
        debug!(%category, ?parent_dir, "CycleState::next_image: called");
        let folder = parent_dir.join(category);
        let images = scanner::list_images(&folder)?;

        let counter = self.peek(category);
        let idx = (counter % images.len() as u64) as usize;
        self.counters.insert(category.to_string(), counter.wrapping_add(1));

        let entry = ImageEntry {
            path: images[idx].clone(),
            position: idx + 1,
            total: images.len(),
        };
        info!(
            "Category: {}, image: {} ({}/{})",
            category,
            entry.file_name(),
            entry.position,
            entry.total
        );
        Ok(entry)
    }
}
