//! Mask lookup for cycled images
//!
//! Masks share the image's file stem and live in one of:
//!
//! ```text
//! {mask_folder}/            # from the category's YAML entry, if set
//! {parent}/{category}/masks/
//! {parent}/masks/{category}/
//! ```
//!
//! The first folder holding a match wins. When nothing matches, the caller
//! gets an all-zero mask the size of the image.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::frame::Mask;
use crate::scanner::{self, MASK_EXTENSIONS};

/// Result of a mask lookup
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMask {
    pub mask: Mask,
    /// File the mask was read from; `None` for the zero fallback
    pub source: Option<PathBuf>,
}

/// Folders searched for masks, in priority order
pub fn candidate_folders(parent_dir: &Path, category: &str, explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut folders = Vec::with_capacity(3);
    if let Some(folder) = explicit {
        folders.push(parent_dir.join(folder));
    }
    folders.push(parent_dir.join(category).join("masks"));
    folders.push(parent_dir.join("masks").join(category));
    folders
}

/// Mask file in `folder` whose stem equals `stem`
///
/// Extensions are compared case-insensitively; the earliest entry of
/// `MASK_EXTENSIONS` wins when several files match.
pub fn find_in_folder(folder: &Path, stem: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(folder).ok()?;

    let mut best: Option<(usize, PathBuf)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || path.file_stem().and_then(|s| s.to_str()) != Some(stem) {
            continue;
        }
        let Some(ext) = scanner::matching_extension(&path, MASK_EXTENSIONS) else {
            continue;
        };
        let rank = MASK_EXTENSIONS.iter().position(|e| *e == ext).unwrap_or(usize::MAX);
        if best.as_ref().is_none_or(|(r, p)| rank < *r || (rank == *r && path < *p)) {
            best = Some((rank, path));
        }
    }
    best.map(|(_, path)| path)
}

/// Locate the mask file for `image_path`, if any
pub fn find_mask(image_path: &Path, parent_dir: &Path, category: &str, explicit: Option<&Path>) -> Option<PathBuf> {
    let stem = image_path.file_stem()?.to_str()?;
    debug!(%stem, %category, "find_mask: called");

    candidate_folders(parent_dir, category, explicit)
        .into_iter()
        .filter(|folder| folder.is_dir())
        .find_map(|folder| find_in_folder(&folder, stem))
}

/// Load the mask for `image_path`, or a zero mask of `dimensions`
///
/// Never fails: an undecodable mask file is logged and replaced by the zero
/// mask.
pub fn resolve_mask(
    image_path: &Path,
    parent_dir: &Path,
    category: &str,
    explicit: Option<&Path>,
    dimensions: (u32, u32),
) -> ResolvedMask {
    let (width, height) = dimensions;

    if let Some(path) = find_mask(image_path, parent_dir, category, explicit) {
        match Mask::load(&path) {
            Ok(mask) => {
                if mask.dimensions() != dimensions {
                    warn!(
                        "Mask {} is {}x{}, image is {}x{}",
                        path.display(),
                        mask.width,
                        mask.height,
                        width,
                        height
                    );
                }
                info!("Loaded mask: {}", path.display());
                return ResolvedMask {
                    mask,
                    source: Some(path),
                };
            }
            Err(e) => {
                warn!("Failed to load mask, using empty mask: {}", e);
            }
        }
    } else {
        info!("No mask found for {}, using empty mask", image_path.display());
    }

    ResolvedMask {
        mask: Mask::zeros(width, height),
        source: None,
    }
}
