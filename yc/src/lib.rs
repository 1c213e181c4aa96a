//! yamlcycler - YAML-driven per-category image cycler
//!
//! Steps through the images of a category folder one at a time, pairing each
//! image with the prompt and LoRA tags configured for the category and with
//! a mask of the same name.
//!
//! # Layout
//!
//! ```text
//! setting.yaml            # category -> prompt, lora1..lora3, mask_folder
//! data/
//! ├── cats/
//! │   ├── 001.png
//! │   ├── 002.jpg
//! │   └── masks/
//! │       └── 001.png
//! └── masks/
//!     └── cats/
//!         └── 002.png
//! ```
//!
//! # Example
//!
//! ```ignore
//! use yamlcycler::{CycleRequest, CycleState, ImageCycler};
//!
//! let mut state = CycleState::new();
//! let request = CycleRequest {
//!     yaml_path: "setting.yaml".into(),
//!     parent_dir: "data".into(),
//!     category: "cats".to_string(),
//! };
//! let out = ImageCycler.execute(&mut state, &request)?;
//! println!("{} ({}/{})", out.prompt, out.entry.position, out.entry.total);
//! ```

pub mod categories;
pub mod cli;
pub mod config;
pub mod cycle;
pub mod error;
pub mod frame;
pub mod lora;
pub mod mask;
pub mod nodes;
pub mod scanner;
pub mod state_file;

pub use categories::{CategoryConfig, CategoryConfigs, LORA_SLOTS, category_choices};
pub use cycle::{CycleState, ImageEntry};
pub use error::{CyclerError, CyclerResult};
pub use frame::{ImageFrame, Mask};
pub use lora::{LoraLibrary, NO_LORA, ParsedLora, parse_lora};
pub use mask::{ResolvedMask, resolve_mask};
pub use nodes::{
    CycleRequest, ImageCycler, ImageCyclerOutput, ImageCyclerSimple, ImageCyclerSimpleOutput, LoraExtractor,
    LoraExtractorOutput, LoraLoader, LoraLoaderOutput, LoraLoaderRequest, LoraRequest, LoraSelector,
    LoraSelectorOutput, NodeKind,
};

/// Default category YAML file
pub const DEFAULT_YAML_PATH: &str = "setting.yaml";

/// Default parent directory of the category folders
pub const DEFAULT_PARENT_DIR: &str = "./data";
