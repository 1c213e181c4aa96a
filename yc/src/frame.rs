//! In-memory image and mask buffers
//!
//! Both are row-major `f32` buffers normalised to `[0, 1]`, the layout a host
//! expects for its IMAGE (RGB, HWC) and MASK (single channel, HW) values.

use std::path::Path;

use image::{GrayImage, ImageBuffer, Luma};
use tracing::debug;

use crate::error::{CyclerError, CyclerResult};

/// An RGB image, `width * height * 3` values
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl ImageFrame {
    /// Decode the image at `path` as RGB
    pub fn load(path: &Path) -> CyclerResult<Self> {
        debug!(?path, "ImageFrame::load: called");
        let rgb = image::open(path)
            .map_err(|source| CyclerError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();

        let (width, height) = rgb.dimensions();
        Ok(Self {
            width,
            height,
            data: rgb.into_raw().into_iter().map(normalize).collect(),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// RGB value at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        let i = ((y * self.width + x) * 3) as usize;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

/// A single-channel mask, `width * height` values
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl Mask {
    /// All-zero mask of the given size
    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
        }
    }

    /// Decode the image at `path` as 8-bit grayscale
    pub fn load(path: &Path) -> CyclerResult<Self> {
        debug!(?path, "Mask::load: called");
        let gray = image::open(path)
            .map_err(|source| CyclerError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_luma8();

        let (width, height) = gray.dimensions();
        Ok(Self {
            width,
            height,
            data: gray.into_raw().into_iter().map(normalize).collect(),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn value(&self, x: u32, y: u32) -> f32 {
        self.data[(y * self.width + x) as usize]
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|v| *v == 0.0)
    }

    /// Convert back to an 8-bit grayscale image
    pub fn to_gray_image(&self) -> GrayImage {
        ImageBuffer::from_fn(self.width, self.height, |x, y| {
            Luma([(self.value(x, y).clamp(0.0, 1.0) * 255.0).round() as u8])
        })
    }

    /// Write the mask as an 8-bit grayscale image; format follows the extension
    pub fn save(&self, path: &Path) -> CyclerResult<()> {
        debug!(?path, "Mask::save: called");
        self.to_gray_image().save(path).map_err(|source| CyclerError::Image {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn normalize(v: u8) -> f32 {
    f32::from(v) / 255.0
}
