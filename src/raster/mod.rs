//! Decoded page images and the operations the cache performs on them.

mod decode;
mod scale;

pub use decode::{ImageCrateDecoder, PageDecoder};
pub use scale::scale_to_fit;

use crate::error::DecodeError;

/// Bytes per pixel of every raster (RGBA, 8 bits per channel).
pub const BYTES_PER_PIXEL: usize = 4;

/// A decoded image: tightly packed RGBA8 rows, top to bottom.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    /// Wrap an RGBA8 buffer, checking it matches the dimensions.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, DecodeError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(BYTES_PER_PIXEL));
        if width == 0 || height == 0 || expected != Some(pixels.len()) {
            return Err(DecodeError::Dimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Row stride in bytes.
    pub fn pitch(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// RGBA value at (`x`, `y`), or `None` outside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = y as usize * self.pitch() + x as usize * BYTES_PER_PIXEL;
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&self.pixels[at..at + BYTES_PER_PIXEL]);
        Some(rgba)
    }

    /// Size of the pixel buffer.
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }

    /// Hand the pixels to the `image` crate, e.g. for saving.
    pub fn into_image(self) -> image::RgbaImage {
        let (width, height) = (self.width, self.height);
        image::RgbaImage::from_raw(width, height, self.pixels)
            .unwrap_or_else(|| image::RgbaImage::new(width, height))
    }
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}
