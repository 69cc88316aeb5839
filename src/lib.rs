//! # comicz
//!
//! Random access to the pages of CBZ and CBR comic archives without holding
//! the whole archive, or every decoded page, in memory.
//!
//! - [`archive`]: opens a container, builds a naturally sorted page directory
//!   and extracts single pages by index
//! - [`cache`]: a small LRU cache of decoded, pre-scaled page rasters with
//!   neighbour preloading
//! - [`raster`]: the decoded image type, the decoder seam and the scaler
//! - [`session`]: a reading position that ties the two together
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use comicz::{ComicArchive, PageCache};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let archive = Arc::new(ComicArchive::open("issue-01.cbz").await?);
//!     println!("{} pages", archive.page_count());
//!
//!     let cache = PageCache::open(archive.clone(), 1536, 1152);
//!     let page = cache.get_page(0).await?;
//!     println!("first page is {}x{}", page.width(), page.height());
//!     cache.preload_adjacent(0).await;
//!
//!     cache.clear().await;
//!     archive.close().await;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod raster;
pub mod session;

mod rar;
mod zip;

pub use archive::{ArchiveFormat, ComicArchive, PageEntry, natural_cmp};
pub use cache::PageCache;
pub use cli::Cli;
pub use config::{ArchiveConfig, CacheConfig, ReaderConfig};
pub use error::{ArchiveError, DecodeError, PageFault, PageUnavailable, ScaleError};
pub use io::{LocalFileReader, MemoryReader, ReadAt};
pub use raster::{ImageCrateDecoder, PageDecoder, Raster, scale_to_fit};
pub use session::ComicSession;
