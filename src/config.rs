//! Tunables for archive opening and page caching.
//!
//! Defaults reproduce the limits of a small handheld reader: at most 2000
//! pages per comic, three cached pages, and a cache resolution of 1.5x a
//! 1024x768 screen so zooming does not force a re-decode.

/// Hard cap on the number of pages kept in a page directory.
pub const DEFAULT_MAX_PAGES: usize = 2000;

/// Largest single entry the archive reader will inflate into memory.
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = 256 * 1024 * 1024;

/// Number of decoded pages held by the cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 3;

pub const DEFAULT_DISPLAY_WIDTH: u32 = 1024;
pub const DEFAULT_DISPLAY_HEIGHT: u32 = 768;

/// How much larger than the display the cached raster is kept.
pub const ZOOM_HEADROOM: f32 = 1.5;

/// Limits applied while opening an archive.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Qualifying entries beyond this count are dropped with a warning.
    pub max_pages: usize,
    /// Entries whose uncompressed size exceeds this are refused at extraction.
    pub max_entry_size: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
        }
    }
}

/// Page cache sizing.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Number of slots; values below 1 are treated as 1.
    pub capacity: usize,
    /// Bounding box cached rasters are scaled into.
    pub target_width: u32,
    pub target_height: u32,
}

impl CacheConfig {
    /// Cache sized for a display, with [`ZOOM_HEADROOM`] applied.
    pub fn for_display(width: u32, height: u32) -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            target_width: (width as f32 * ZOOM_HEADROOM) as u32,
            target_height: (height as f32 * ZOOM_HEADROOM) as u32,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::for_display(DEFAULT_DISPLAY_WIDTH, DEFAULT_DISPLAY_HEIGHT)
    }
}

/// Everything a reading session needs.
#[derive(Debug, Clone, Default)]
pub struct ReaderConfig {
    pub archive: ArchiveConfig,
    pub cache: CacheConfig,
}
