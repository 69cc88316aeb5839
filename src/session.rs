//! A reading position over one open comic.
//!
//! [`ComicSession`] owns the archive and its cache, tracks the current page,
//! and after every move preloads the neighbours on a background task. Moving
//! again before that preload finishes aborts it; a neighbour it was already
//! loading is still cached.

use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::archive::ComicArchive;
use crate::cache::PageCache;
use crate::config::ReaderConfig;
use crate::error::{ArchiveError, PageUnavailable};
use crate::raster::Raster;

pub struct ComicSession {
    archive: Arc<ComicArchive>,
    cache: Arc<PageCache>,
    current: usize,
    preload: Option<JoinHandle<()>>,
}

impl ComicSession {
    pub async fn open(path: impl AsRef<Path>, config: &ReaderConfig) -> Result<Self, ArchiveError> {
        let archive = Arc::new(ComicArchive::open_with(path, &config.archive).await?);
        let cache = Arc::new(PageCache::new(Arc::clone(&archive), &config.cache));
        Ok(Self::from_parts(archive, cache))
    }

    /// Start at page 0 of an archive already bound to `cache`.
    pub fn from_parts(archive: Arc<ComicArchive>, cache: Arc<PageCache>) -> Self {
        Self {
            archive,
            cache,
            current: 0,
            preload: None,
        }
    }

    pub fn archive(&self) -> &Arc<ComicArchive> {
        &self.archive
    }

    pub fn cache(&self) -> &Arc<PageCache> {
        &self.cache
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn page_count(&self) -> usize {
        self.archive.page_count()
    }

    /// Show the current page again.
    pub async fn current(&mut self) -> Result<Arc<Raster>, PageUnavailable> {
        self.go_to(self.current).await
    }

    /// Jump to `index`. The position only changes if the page loads.
    pub async fn go_to(&mut self, index: usize) -> Result<Arc<Raster>, PageUnavailable> {
        self.cancel_preload();
        let raster = self.cache.get_page(index).await?;
        self.current = index;
        self.preload = Some(self.cache.spawn_preload(index));
        Ok(raster)
    }

    /// Advance one page; `None` on the last page.
    pub async fn next(&mut self) -> Option<Result<Arc<Raster>, PageUnavailable>> {
        let index = self.current + 1;
        if index >= self.page_count() {
            return None;
        }
        Some(self.go_to(index).await)
    }

    /// Go back one page; `None` on the first page.
    pub async fn previous(&mut self) -> Option<Result<Arc<Raster>, PageUnavailable>> {
        let index = self.current.checked_sub(1)?;
        Some(self.go_to(index).await)
    }

    /// Wait for the background preload, if any, to finish.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.preload.take() {
            let _ = handle.await;
        }
    }

    /// Release cached pages and close the archive.
    pub async fn close(&mut self) {
        self.cancel_preload();
        self.cache.clear().await;
        self.archive.close().await;
    }

    fn cancel_preload(&mut self) {
        if let Some(handle) = self.preload.take() {
            handle.abort();
        }
    }
}

impl Drop for ComicSession {
    fn drop(&mut self) {
        self.cancel_preload();
    }
}
