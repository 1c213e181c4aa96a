//! Integration tests for the node variants
//!
//! Each test builds a small category tree in a temp dir with real image files.

use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, Luma, Rgb, RgbImage};
use tempfile::TempDir;
use yamlcycler::{
    CycleRequest, CycleState, CyclerError, ImageCycler, ImageCyclerSimple, LoraExtractor, LoraLibrary, LoraLoader,
    LoraLoaderRequest, LoraRequest, LoraSelector,
};

const SETTINGS: &str = r#"
cats:
  prompt: "a cat, soft light"
  lora1: "<lora:cat_style:0.8>"
  lora2: "<lora:Soft_Light:0.35>"
  lora3: ""
dogs:
  prompt: "a dog in the park"
  lora1: "<lora:dog_style:1.2>"
  mask_folder: custom_masks
broken:
  prompt: "bad weight"
  lora1: "<lora:oops:heavy>"
"#;

struct Fixture {
    temp: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp.path().join("setting.yaml"), SETTINGS).unwrap();
        Self { temp }
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    fn yaml(&self) -> PathBuf {
        self.root().join("setting.yaml")
    }

    fn data(&self) -> PathBuf {
        self.root().join("data")
    }

    fn image(&self, category: &str, name: &str, width: u32, height: u32) {
        let folder = self.data().join(category);
        fs::create_dir_all(&folder).unwrap();
        RgbImage::from_pixel(width, height, Rgb([10, 20, 30]))
            .save(folder.join(name))
            .unwrap();
    }

    fn mask(&self, rel: &str, width: u32, height: u32, value: u8) -> PathBuf {
        let path = self.data().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        GrayImage::from_pixel(width, height, Luma([value])).save(&path).unwrap();
        path
    }

    fn cycle_request(&self, category: &str) -> CycleRequest {
        CycleRequest {
            yaml_path: self.yaml(),
            parent_dir: self.data(),
            category: category.to_string(),
        }
    }

    fn lora_request(&self, category: &str) -> LoraRequest {
        LoraRequest {
            yaml_path: self.yaml(),
            category: category.to_string(),
        }
    }

    fn loader_request(&self, category: &str, overrides: [Option<&str>; 3]) -> LoraLoaderRequest {
        LoraLoaderRequest {
            yaml_path: self.yaml(),
            category: category.to_string(),
            overrides: overrides.map(|o| o.map(str::to_string)),
        }
    }

    fn library(&self, files: &[&str]) -> LoraLibrary {
        let loras = self.root().join("loras");
        fs::create_dir_all(&loras).unwrap();
        for file in files {
            fs::write(loras.join(file), "").unwrap();
        }
        LoraLibrary::scan(&loras)
    }
}

// =============================================================================
// ImageCycler
// =============================================================================

#[test]
fn test_full_cycler_outputs() {
    let fx = Fixture::new();
    fx.image("cats", "b.png", 4, 3);
    fx.image("cats", "a.png", 8, 6);
    let mask_path = fx.mask("cats/masks/a.png", 8, 6, 255);

    let mut state = CycleState::new();
    let out = ImageCycler.execute(&mut state, &fx.cycle_request("cats")).unwrap();

    assert_eq!(out.entry.file_name(), "a.png");
    assert_eq!((out.entry.position, out.entry.total), (1, 2));
    assert_eq!(out.image.dimensions(), (8, 6));
    assert_eq!(out.mask.source, Some(mask_path));
    assert_eq!(out.mask.mask.data, vec![1.0; 48]);
    assert_eq!(out.prompt, "a cat, soft light");
    assert_eq!(
        out.loras,
        [
            "<lora:cat_style:0.8>".to_string(),
            "<lora:Soft_Light:0.35>".to_string(),
            String::new()
        ]
    );

    let out = ImageCycler.execute(&mut state, &fx.cycle_request("cats")).unwrap();
    assert_eq!(out.entry.file_name(), "b.png");
    assert_eq!(out.mask.source, None);
    assert_eq!(out.mask.mask.dimensions(), (4, 3));
    assert!(out.mask.mask.is_zero());
}

#[test]
fn test_full_cycler_uses_configured_mask_folder() {
    let fx = Fixture::new();
    fx.image("dogs", "rex.jpg", 5, 5);
    fx.mask("dogs/masks/rex.png", 5, 5, 0);
    let custom = fx.mask("custom_masks/rex.png", 5, 5, 255);

    let mut state = CycleState::new();
    let out = ImageCycler.execute(&mut state, &fx.cycle_request("dogs")).unwrap();
    assert_eq!(out.mask.source, Some(custom));
}

#[test]
fn test_full_cycler_shared_masks_folder() {
    let fx = Fixture::new();
    fx.image("cats", "tom.png", 2, 2);
    let shared = fx.mask("masks/cats/tom.png", 2, 2, 128);

    let mut state = CycleState::new();
    let out = ImageCycler.execute(&mut state, &fx.cycle_request("cats")).unwrap();
    assert_eq!(out.mask.source, Some(shared));
    assert!(!out.mask.mask.is_zero());
}

#[test]
fn test_unknown_category_is_error() {
    let fx = Fixture::new();
    fx.image("birds", "tweety.png", 2, 2);

    let mut state = CycleState::new();
    let err = ImageCycler.execute(&mut state, &fx.cycle_request("birds")).unwrap_err();
    assert!(matches!(err, CyclerError::UnknownCategory { .. }));
    assert_eq!(state.peek("birds"), 0);
}

#[test]
fn test_manual_mode_without_yaml() {
    let fx = Fixture::new();
    fx.image("birds", "tweety.png", 2, 2);
    let request = CycleRequest {
        yaml_path: fx.root().join("missing.yaml"),
        ..fx.cycle_request("birds")
    };

    let mut state = CycleState::new();
    let out = ImageCycler.execute(&mut state, &request).unwrap();
    assert_eq!(out.entry.file_name(), "tweety.png");
    assert_eq!(out.prompt, "");
    assert_eq!(out.loras, [String::new(), String::new(), String::new()]);
}

#[test]
fn test_empty_category_folder_fails_every_time() {
    let fx = Fixture::new();
    fs::create_dir_all(fx.data().join("cats")).unwrap();

    let mut state = CycleState::new();
    for _ in 0..3 {
        let err = ImageCycler.execute(&mut state, &fx.cycle_request("cats")).unwrap_err();
        assert!(matches!(err, CyclerError::EmptyFolder(_)));
    }
}

#[test]
fn test_undecodable_image_is_error() {
    let fx = Fixture::new();
    let folder = fx.data().join("cats");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("a.png"), b"not a png").unwrap();

    let mut state = CycleState::new();
    let err = ImageCycler.execute(&mut state, &fx.cycle_request("cats")).unwrap_err();
    assert!(matches!(err, CyclerError::Image { .. }));
}

// =============================================================================
// ImageCyclerSimple
// =============================================================================

#[test]
fn test_simple_cycler_echoes_inputs() {
    let fx = Fixture::new();
    fx.image("cats", "a.png", 3, 3);

    let mut state = CycleState::new();
    let out = ImageCyclerSimple.execute(&mut state, &fx.cycle_request("cats")).unwrap();
    assert_eq!(out.category, "cats");
    assert_eq!(out.yaml_path, fx.yaml());
    assert_eq!(out.image.dimensions(), (3, 3));
    assert_eq!(out.mask.mask.dimensions(), (3, 3));
}

#[test]
fn test_cyclers_share_state_per_category() {
    let fx = Fixture::new();
    fx.image("cats", "a.png", 2, 2);
    fx.image("cats", "b.png", 2, 2);

    let mut state = CycleState::new();
    let first = ImageCycler.execute(&mut state, &fx.cycle_request("cats")).unwrap();
    let second = ImageCyclerSimple.execute(&mut state, &fx.cycle_request("cats")).unwrap();
    assert_eq!(first.entry.file_name(), "a.png");
    assert_eq!(second.entry.file_name(), "b.png");
}

// =============================================================================
// LoRA nodes
// =============================================================================

#[test]
fn test_lora_extractor() {
    let fx = Fixture::new();
    let out = LoraExtractor::new().execute(&fx.lora_request("cats")).unwrap();

    assert_eq!(out.prompt, "a cat, soft light");
    assert_eq!(
        out.names,
        ["cat_style".to_string(), "Soft_Light".to_string(), String::new()]
    );
    assert_eq!(out.weights, [0.8, 0.35, 1.0]);
}

#[test]
fn test_lora_extractor_missing_file_only_warns() {
    let fx = Fixture::new();
    let loras = fx.root().join("loras");
    fs::create_dir_all(&loras).unwrap();

    let extractor = LoraExtractor::with_library(LoraLibrary::scan(&loras));
    let out = extractor.execute(&fx.lora_request("dogs")).unwrap();
    assert_eq!(out.names[0], "dog_style");
    assert_eq!(out.weights[0], 1.2);
}

#[test]
fn test_lora_extractor_bad_weight() {
    let fx = Fixture::new();
    let err = LoraExtractor::new().execute(&fx.lora_request("broken")).unwrap_err();
    assert!(matches!(err, CyclerError::LoraWeight { .. }));
}

#[test]
fn test_lora_selector_matches_files() {
    let fx = Fixture::new();
    let loras = fx.root().join("loras");
    fs::create_dir_all(loras.join("styles")).unwrap();
    fs::write(loras.join("cat_style.safetensors"), "").unwrap();
    fs::write(loras.join("soft_light.pt"), "").unwrap();

    let selector = LoraSelector::new(LoraLibrary::scan(&loras));
    let out = selector.execute(&fx.lora_request("cats")).unwrap();
    assert_eq!(
        out.files,
        [
            "cat_style.safetensors".to_string(),
            "soft_light.pt".to_string(),
            String::new()
        ]
    );
    assert_eq!(out.strengths, [0.8, 0.35, 1.0]);

    let out = selector.execute(&fx.lora_request("dogs")).unwrap();
    assert_eq!(out.files[0], "");
    assert_eq!(out.strengths[0], 1.2);
}

#[test]
fn test_lora_extractor_keeps_double_precision() {
    let fx = Fixture::new();
    let out = LoraExtractor::new().execute(&fx.lora_request("cats")).unwrap();
    assert_eq!(out.weights[0], 0.8_f64);
}

// =============================================================================
// LoraLoader
// =============================================================================

#[test]
fn test_lora_loader_matches_and_corrects_names() {
    let fx = Fixture::new();
    let loader = LoraLoader::new(fx.library(&["cat_style.safetensors", "soft_light.pt"]));

    let out = loader.execute(&fx.loader_request("cats", [None, None, None])).unwrap();
    assert_eq!(out.prompt, "a cat, soft light");
    assert_eq!(
        out.names,
        ["cat_style".to_string(), "soft_light".to_string(), "None".to_string()]
    );
}

#[test]
fn test_lora_loader_missing_file_is_none() {
    let fx = Fixture::new();
    let loader = LoraLoader::new(fx.library(&["cat_style.safetensors"]));

    let out = loader.execute(&fx.loader_request("dogs", [None, None, None])).unwrap();
    assert_eq!(out.prompt, "a dog in the park");
    assert_eq!(out.names, ["None".to_string(), "None".to_string(), "None".to_string()]);
}

#[test]
fn test_lora_loader_overrides_skip_parsing() {
    let fx = Fixture::new();
    let loader = LoraLoader::new(fx.library(&["cat_style.safetensors"]));

    let out = loader
        .execute(&fx.loader_request("cats", [Some("None"), Some("custom_style"), Some("")]))
        .unwrap();
    assert_eq!(
        out.names,
        ["cat_style".to_string(), "custom_style".to_string(), "None".to_string()]
    );

    // The malformed tag in slot 1 is never parsed once overridden
    let out = loader
        .execute(&fx.loader_request("broken", [Some("cat_style"), None, None]))
        .unwrap();
    assert_eq!(out.names[0], "cat_style");
}

#[test]
fn test_lora_loader_bad_weight_without_override() {
    let fx = Fixture::new();
    let loader = LoraLoader::new(fx.library(&[]));
    let err = loader.execute(&fx.loader_request("broken", [None, None, None])).unwrap_err();
    assert!(matches!(err, CyclerError::LoraWeight { .. }));
}
