//! The sorted, filtered list of pages produced when an archive is opened.

use std::ops::ControlFlow;

use tracing::warn;

use super::natural::{basename, natural_cmp};

/// Image extensions accepted as pages (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// How a backend finds an entry again at extraction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Zip-style: look the entry up by its name in the central directory.
    Name(String),
    /// Rar-style: byte offset of the entry's file header.
    Offset(u64),
}

/// One page's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    /// Path of the entry inside the container.
    pub name: String,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub locator: Locator,
}

/// An entry as reported by a backend, before filtering.
#[derive(Debug, Clone)]
pub struct ContainerEntry {
    pub name: String,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub is_directory: bool,
    pub locator: Locator,
}

/// Whether `name` carries one of the [`IMAGE_EXTENSIONS`].
pub fn is_image_name(name: &str) -> bool {
    let base = basename(name);
    match base.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known)),
        None => false,
    }
}

/// Dot-files and macOS resource fork folders are never pages.
pub fn is_hidden_name(name: &str) -> bool {
    basename(name).starts_with('.')
        || name
            .split(['/', '\\'])
            .any(|component| component == "__MACOSX")
}

/// Immutable, naturally ordered page list.
#[derive(Debug, Clone, Default)]
pub struct PageDirectory {
    entries: Vec<PageEntry>,
}

impl PageDirectory {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PageEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[PageEntry] {
        &self.entries
    }
}

/// Collects qualifying entries while a backend enumerates its container.
///
/// The page cap is enforced as entries arrive: once it is reached
/// [`DirectoryBuilder::push`] returns `Break` and the backend stops scanning.
#[derive(Debug)]
pub struct DirectoryBuilder {
    max_pages: usize,
    entries: Vec<PageEntry>,
    truncated: bool,
}

impl DirectoryBuilder {
    pub fn new(max_pages: usize) -> Self {
        Self {
            max_pages,
            entries: Vec::new(),
            truncated: false,
        }
    }

    /// Offer one container entry. Non-pages are skipped silently.
    pub fn push(&mut self, entry: ContainerEntry) -> ControlFlow<()> {
        if entry.is_directory
            || entry.name.ends_with('/')
            || !is_image_name(&entry.name)
            || is_hidden_name(&entry.name)
        {
            return ControlFlow::Continue(());
        }

        if self.entries.len() >= self.max_pages {
            if !self.truncated {
                warn!(
                    max_pages = self.max_pages,
                    "archive has more pages than the cap, ignoring the rest"
                );
                self.truncated = true;
            }
            return ControlFlow::Break(());
        }

        self.entries.push(PageEntry {
            name: entry.name,
            compressed_size: entry.compressed_size,
            uncompressed_size: entry.uncompressed_size,
            locator: entry.locator,
        });
        ControlFlow::Continue(())
    }

    /// Whether the cap cut enumeration short.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Sort and freeze the collected pages.
    pub fn finish(mut self) -> PageDirectory {
        self.entries
            .sort_by(|a, b| natural_cmp(&a.name, &b.name).then_with(|| a.name.cmp(&b.name)));
        PageDirectory {
            entries: self.entries,
        }
    }
}
