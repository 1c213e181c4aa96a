//! Error types for category loading, cycling and LoRA parsing

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a single node evaluation
///
/// Missing config files, missing masks and missing LoRA model files are not
/// represented here: they fall back to manual mode, a zero mask and a warning
/// respectively.
#[derive(Debug, Error)]
pub enum CyclerError {
    #[error("Failed to parse YAML {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid LoRA weight '{weight}' in '{raw}'")]
    LoraWeight { raw: String, weight: String },

    #[error("Folder not found: {0}")]
    FolderNotFound(PathBuf),

    #[error("No images found in folder: {0}")]
    EmptyFolder(PathBuf),

    #[error("Category '{category}' not found in YAML. Available categories: {available:?}")]
    UnknownCategory { category: String, available: Vec<String> },

    #[error("Failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CyclerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CyclerError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by the contents of the category folder rather
    /// than by configuration
    pub fn is_folder_error(&self) -> bool {
        matches!(self, CyclerError::FolderNotFound(_) | CyclerError::EmptyFolder(_))
    }
}

/// Result alias used across the library
pub type CyclerResult<T> = Result<T, CyclerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_folder_error() {
        assert!(CyclerError::FolderNotFound(PathBuf::from("data/cats")).is_folder_error());
        assert!(CyclerError::EmptyFolder(PathBuf::from("data/cats")).is_folder_error());
        assert!(
            !CyclerError::LoraWeight {
                raw: "<lora:a:x>".to_string(),
                weight: "x".to_string()
            }
            .is_folder_error()
        );
    }

    #[test]
    fn test_unknown_category_lists_available() {
        let err = CyclerError::UnknownCategory {
            category: "dogs".to_string(),
            available: vec!["birds".to_string(), "cats".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'dogs'"));
        assert!(msg.contains("\"birds\""));
        assert!(msg.contains("\"cats\""));
    }
}
