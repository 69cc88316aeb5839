use crate::error::DecodeError;

use super::Raster;

/// Turns still-encoded page bytes into a raster.
///
/// Implementations must be callable from the blocking thread pool.
pub trait PageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Raster, DecodeError>;
}

/// Decoder backed by the `image` crate; the format is sniffed from the bytes,
/// so JPEG, PNG, GIF, BMP and WebP pages all work regardless of entry name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder;

impl PageDecoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Raster, DecodeError> {
        let rgba = image::load_from_memory(bytes)?.into_rgba8();
        let (width, height) = rgba.dimensions();
        Raster::from_rgba(width, height, rgba.into_raw())
    }
}
