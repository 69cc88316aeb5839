//! Error taxonomy for archive access, decoding, scaling and the page cache.
//!
//! Archive and raster errors keep their specific cause. The page cache folds
//! all of them into [`PageUnavailable`] so a viewer can show a single
//! "page failed to load" state and still log the underlying [`PageFault`].

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while opening or reading a comic archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The file extension does not name a supported container.
    #[error("unrecognised archive format: {}", .0.display())]
    UnknownFormat(PathBuf),

    /// The container could not be read or is corrupt.
    #[error("failed to open archive {path}: {reason}")]
    Open { path: String, reason: String },

    /// The container opened but holds no qualifying image entries.
    #[error("no image pages found in {0}")]
    NoImagesFound(String),

    #[error("page index {index} out of range (archive has {page_count} pages)")]
    IndexOutOfRange { index: usize, page_count: usize },

    /// Locating, reading or verifying an entry failed.
    #[error("failed to extract {name}: {reason}")]
    Extraction { name: String, reason: String },

    #[error("archive is closed")]
    Closed,
}

/// The image bytes of a page could not be turned into a raster.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to decode page image: {0}")]
    Image(#[from] image::ImageError),

    #[error("decoded image has unusable dimensions {width}x{height}")]
    Dimensions { width: u32, height: u32 },

    /// Raised by decoders other than the bundled one.
    #[error("failed to decode page image: {0}")]
    Other(String),
}

/// Resampling a raster failed.
#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("cannot scale an empty raster")]
    EmptySource,

    #[error("target resolution {width}x{height} is empty")]
    EmptyTarget { width: u32, height: u32 },

    #[error("failed to allocate {bytes} bytes for the scaled raster")]
    Allocation { bytes: usize },
}

/// The stage at which loading a page failed.
#[derive(Debug, Error)]
pub enum PageFault {
    #[error("index out of range (archive has {page_count} pages)")]
    OutOfRange { page_count: usize },

    #[error("cache is not bound to an archive")]
    Unbound,

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Scale(#[from] ScaleError),

    /// The blocking decode task panicked or was cancelled.
    #[error("decode task failed: {0}")]
    Task(String),
}

/// A page could not be served by the cache.
#[derive(Debug, Error)]
#[error("page {index} is unavailable")]
pub struct PageUnavailable {
    pub index: usize,
    #[source]
    pub cause: PageFault,
}

impl PageUnavailable {
    pub fn new(index: usize, cause: impl Into<PageFault>) -> Self {
        Self {
            index,
            cause: cause.into(),
        }
    }
}

pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;
