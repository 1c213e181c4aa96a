//! Image folder listing

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CyclerError, CyclerResult};

/// Extensions accepted as source images
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp", "tiff", "tga"];

/// Extensions accepted as masks, in lookup priority order
pub const MASK_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// Lowercased extension of `path` if it is one of `allowed`
///
/// The extension is whatever follows the last dot of the file name, so a
/// bare `.png` counts as a PNG.
pub fn matching_extension(path: &Path, allowed: &[&str]) -> Option<String> {
    let (_, ext) = path.file_name()?.to_str()?.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    allowed.contains(&ext.as_str()).then_some(ext)
}

/// List the images in `folder`, sorted by file name
///
/// Fails with `FolderNotFound` if `folder` is not a directory and with
/// `EmptyFolder` if it holds no file with an image extension.
pub fn list_images(folder: &Path) -> CyclerResult<Vec<PathBuf>> {
    debug!(?folder, "list_images: called");
    if !folder.is_dir() {
        debug!("list_images: not a directory");
        return Err(CyclerError::FolderNotFound(folder.to_path_buf()));
    }

    let mut images = Vec::new();
    for entry in fs::read_dir(folder).map_err(|e| CyclerError::io(folder, e))? {
        let entry = entry.map_err(|e| CyclerError::io(folder, e))?;
        let path = entry.path();
        if path.is_file() && matching_extension(&path, IMAGE_EXTENSIONS).is_some() {
            images.push(path);
        }
    }

    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!(count = images.len(), "list_images: images collected");

    if images.is_empty() {
        return Err(CyclerError::EmptyFolder(folder.to_path_buf()));
    }
    Ok(images)
}
