//! Format-agnostic access to the pages of a comic archive.
//!
//! [`ComicArchive::open`] picks a backend from the file extension, enumerates
//! the container once into a [`PageDirectory`] and then serves page bytes by
//! index. Image bytes come back still encoded; decoding is the page cache's job.

mod directory;
mod natural;

pub use directory::{
    ContainerEntry, DirectoryBuilder, IMAGE_EXTENSIONS, Locator, PageDirectory, PageEntry,
    is_hidden_name, is_image_name,
};
pub use natural::{basename, natural_cmp};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::ArchiveConfig;
use crate::error::{ArchiveError, Result};
use crate::io::{LocalFileReader, SharedReader};
use crate::rar::RarBackend;
use crate::zip::ZipBackend;

/// Container family, fixed for the lifetime of an open archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Cbz,
    Cbr,
}

impl ArchiveFormat {
    /// Map a file extension (without the dot) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "cbz" | "zip" => Some(Self::Cbz),
            "cbr" | "rar" => Some(Self::Cbr),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cbz => "CBZ",
            Self::Cbr => "CBR",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The backend chosen at open time.
enum ArchiveHandle {
    Zip(ZipBackend),
    Rar(RarBackend),
}

impl ArchiveHandle {
    async fn open(
        format: ArchiveFormat,
        reader: SharedReader,
        builder: &mut DirectoryBuilder,
    ) -> anyhow::Result<Self> {
        Ok(match format {
            ArchiveFormat::Cbz => Self::Zip(ZipBackend::open(reader, builder).await?),
            ArchiveFormat::Cbr => Self::Rar(RarBackend::open(reader, builder).await?),
        })
    }

    async fn extract(&self, entry: &PageEntry, max_size: u64) -> anyhow::Result<Vec<u8>> {
        match (self, &entry.locator) {
            (Self::Zip(zip), Locator::Name(name)) => {
                zip.extract(name, entry.uncompressed_size, max_size).await
            }
            (Self::Rar(rar), Locator::Offset(offset)) => {
                rar.extract(*offset, &entry.name, entry.uncompressed_size, max_size)
                    .await
            }
            _ => anyhow::bail!("locator does not belong to this archive's backend"),
        }
    }
}

/// An open comic: backend, page directory, source and format.
///
/// Extraction is serialised through one lock around the backend, so an
/// archive may be shared between tasks. [`ComicArchive::close`] is idempotent;
/// afterwards the archive reports zero pages and refuses extraction.
pub struct ComicArchive {
    source: String,
    format: ArchiveFormat,
    directory: PageDirectory,
    max_entry_size: u64,
    handle: Mutex<Option<ArchiveHandle>>,
    closed: AtomicBool,
}

impl ComicArchive {
    /// Open a CBZ/CBR file with default limits.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &ArchiveConfig::default()).await
    }

    pub async fn open_with(path: impl AsRef<Path>, config: &ArchiveConfig) -> Result<Self> {
        let path = path.as_ref();
        let format =
            ArchiveFormat::from_path(path).ok_or_else(|| ArchiveError::UnknownFormat(path.into()))?;

        let reader = LocalFileReader::new(path).map_err(|e| ArchiveError::Open {
            path: path.display().to_string(),
            reason: format!("{e:#}"),
        })?;

        Self::from_reader(Arc::new(reader), format, path.display().to_string(), config).await
    }

    /// Open a container from any random-access source.
    ///
    /// `source` names the archive in logs and errors.
    pub async fn from_reader(
        reader: SharedReader,
        format: ArchiveFormat,
        source: impl Into<String>,
        config: &ArchiveConfig,
    ) -> Result<Self> {
        let source = source.into();
        let mut builder = DirectoryBuilder::new(config.max_pages);

        let handle = ArchiveHandle::open(format, reader, &mut builder)
            .await
            .map_err(|e| ArchiveError::Open {
                path: source.clone(),
                reason: format!("{e:#}"),
            })?;

        let directory = builder.finish();
        if directory.is_empty() {
            return Err(ArchiveError::NoImagesFound(source));
        }

        info!(source = %source, format = %format, pages = directory.len(), "opened comic");

        Ok(Self {
            source,
            format,
            directory,
            max_entry_size: config.max_entry_size,
            handle: Mutex::new(Some(handle)),
            closed: AtomicBool::new(false),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The source as a path, for archives opened from the filesystem.
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.source)
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    pub fn page_count(&self) -> usize {
        if self.is_open() {
            self.directory.len()
        } else {
            0
        }
    }

    pub fn page_name(&self, index: usize) -> Option<&str> {
        self.page(index).map(|entry| entry.name.as_str())
    }

    pub fn page(&self, index: usize) -> Option<&PageEntry> {
        if self.is_open() {
            self.directory.get(index)
        } else {
            None
        }
    }

    /// All pages in reading order, empty once closed.
    pub fn entries(&self) -> &[PageEntry] {
        if self.is_open() {
            self.directory.entries()
        } else {
            &[]
        }
    }

    /// Raw (still encoded) bytes of page `index`, exactly `uncompressed_size` long.
    pub async fn extract(&self, index: usize) -> Result<Vec<u8>> {
        let guard = self.handle.lock().await;
        let handle = guard.as_ref().ok_or(ArchiveError::Closed)?;

        let entry = self
            .directory
            .get(index)
            .ok_or(ArchiveError::IndexOutOfRange {
                index,
                page_count: self.directory.len(),
            })?;

        let data = handle
            .extract(entry, self.max_entry_size)
            .await
            .map_err(|e| ArchiveError::Extraction {
                name: entry.name.clone(),
                reason: format!("{e:#}"),
            })?;
        debug!(index, name = %entry.name, bytes = data.len(), "extracted page");
        Ok(data)
    }

    /// Release the backend. Safe to call more than once.
    pub async fn close(&self) {
        let mut guard = self.handle.lock().await;
        if guard.take().is_some() {
            self.closed.store(true, Ordering::Release);
            debug!(source = %self.source, "closed comic");
        }
    }
}

impl fmt::Debug for ComicArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComicArchive")
            .field("source", &self.source)
            .field("format", &self.format)
            .field("pages", &self.directory.len())
            .field("open", &self.is_open())
            .finish()
    }
}
