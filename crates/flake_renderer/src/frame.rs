//! Single-channel frame buffer.

use std::path::Path;

use image::GrayImage;

use crate::renderer::RenderError;

/// An 8-bit grayscale frame stored top-down, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Create a new frame filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Get the gray level at column `x`, buffer row `y` (row 0 is the top).
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.pixels
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Convert to an `image` buffer for encoding.
    pub fn to_image(&self) -> Result<GrayImage, RenderError> {
        GrayImage::from_raw(self.width, self.height, self.pixels.clone()).ok_or(
            RenderError::FrameSize {
                expected: self.width as usize * self.height as usize,
                actual: self.pixels.len(),
            },
        )
    }

    /// Save the frame, picking the format from the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RenderError> {
        self.to_image()?.save(path)?;
        Ok(())
    }
}
