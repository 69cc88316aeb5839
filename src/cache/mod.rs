//! Bounded store of decoded, pre-scaled page rasters.
//!
//! A [`PageCache`] is bound to one [`ComicArchive`] and holds at most
//! `capacity` pages. Misses run extract, decode and scale before the raster
//! is stored, evicting the least recently used page when every slot is full.
//! With three slots, reading forwards or backwards with neighbour preloading
//! keeps the current page and both neighbours resident.
//!
//! The slot table sits behind one async mutex that is held for the whole miss
//! path. Concurrent requests are therefore served one at a time: a second
//! request for a page that is being loaded waits and then hits, and the
//! archive never sees two extractions from the same cache at once.
//!
//! Each lookup runs on its own task. A caller that stops waiting, such as an
//! aborted preload, leaves the load to finish and be cached; it is never
//! started a second time.

mod slot;

pub use slot::CacheSlot;

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::archive::ComicArchive;
use crate::config::CacheConfig;
use crate::error::{PageFault, PageUnavailable};
use crate::raster::{ImageCrateDecoder, PageDecoder, Raster, scale_to_fit};

use slot::SlotTable;

struct CacheState {
    archive: Option<Arc<ComicArchive>>,
    slots: SlotTable,
}

/// Everything a miss needs besides the cache state.
#[derive(Clone)]
struct Pipeline {
    decoder: Arc<dyn PageDecoder>,
    target_width: u32,
    target_height: u32,
}

pub struct PageCache {
    state: Arc<Mutex<CacheState>>,
    pipeline: Pipeline,
}

impl PageCache {
    /// Bind a cache with the default capacity, scaling into `target_width` x `target_height`.
    pub fn open(archive: Arc<ComicArchive>, target_width: u32, target_height: u32) -> Self {
        let config = CacheConfig {
            target_width,
            target_height,
            ..CacheConfig::default()
        };
        Self::new(archive, &config)
    }

    pub fn new(archive: Arc<ComicArchive>, config: &CacheConfig) -> Self {
        Self::with_decoder(archive, config, Arc::new(ImageCrateDecoder))
    }

    /// Bind a cache that decodes pages with `decoder`.
    pub fn with_decoder(
        archive: Arc<ComicArchive>,
        config: &CacheConfig,
        decoder: Arc<dyn PageDecoder>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                archive: Some(archive),
                slots: SlotTable::new(config.capacity),
            })),
            pipeline: Pipeline {
                decoder,
                target_width: config.target_width,
                target_height: config.target_height,
            },
        }
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.pipeline.target_width, self.pipeline.target_height)
    }

    pub async fn capacity(&self) -> usize {
        self.state.lock().await.slots.capacity()
    }

    pub async fn is_bound(&self) -> bool {
        self.state.lock().await.archive.is_some()
    }

    /// Pages currently resident, in slot order.
    pub async fn cached_pages(&self) -> Vec<usize> {
        self.state.lock().await.slots.pages()
    }

    /// Page count of the bound archive, zero when unbound.
    pub async fn page_count(&self) -> usize {
        let state = self.state.lock().await;
        state.archive.as_ref().map_or(0, |a| a.page_count())
    }

    /// Return page `index`, loading and caching it on a miss.
    ///
    /// Out-of-range requests fail without touching the cache. A failed load
    /// leaves every slot as it was.
    pub async fn get_page(&self, index: usize) -> Result<Arc<Raster>, PageUnavailable> {
        let state = Arc::clone(&self.state);
        let pipeline = self.pipeline.clone();
        tokio::spawn(async move { lookup(&state, &pipeline, index).await })
            .await
            .map_err(|e| PageUnavailable::new(index, PageFault::Task(e.to_string())))?
    }

    /// Best-effort load of the pages either side of `current`. Failures are
    /// logged and otherwise ignored.
    pub async fn preload_adjacent(&self, current: usize) {
        let page_count = self.page_count().await;
        let next = current.checked_add(1).filter(|&i| i < page_count);
        let previous = current.checked_sub(1).filter(|&i| i < page_count);

        for index in next.into_iter().chain(previous) {
            if let Err(err) = self.get_page(index).await {
                debug!(index, cause = %err.cause, "preload failed");
            }
        }
    }

    /// Run [`PageCache::preload_adjacent`] on a background task.
    ///
    /// Aborting the returned handle stops the preload from requesting any
    /// further pages. A load already under way still completes and is cached.
    pub fn spawn_preload(self: &Arc<Self>, current: usize) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move { cache.preload_adjacent(current).await })
    }

    /// Drop every cached raster and unbind from the archive.
    /// The archive itself stays open.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.slots.clear();
        state.archive = None;
    }

    /// Clear the cache and bind it to another archive.
    pub async fn bind(&self, archive: Arc<ComicArchive>) {
        let mut state = self.state.lock().await;
        state.slots.clear();
        state.archive = Some(archive);
    }
}

impl std::fmt::Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache")
            .field("target_width", &self.pipeline.target_width)
            .field("target_height", &self.pipeline.target_height)
            .finish_non_exhaustive()
    }
}

async fn lookup(
    state: &Mutex<CacheState>,
    pipeline: &Pipeline,
    index: usize,
) -> Result<Arc<Raster>, PageUnavailable> {
    let mut state = state.lock().await;
    let archive = state
        .archive
        .clone()
        .ok_or(PageUnavailable::new(index, PageFault::Unbound))?;

    let page_count = archive.page_count();
    if index >= page_count {
        return Err(PageUnavailable::new(
            index,
            PageFault::OutOfRange { page_count },
        ));
    }

    let stamp = state.slots.tick();
    if let Some(raster) = state.slots.touch(index, stamp) {
        return Ok(raster);
    }

    let raster = match load(&archive, pipeline, index).await {
        Ok(raster) => Arc::new(raster),
        Err(cause) => {
            debug!(index, error = %cause, "failed to load page");
            return Err(PageUnavailable::new(index, cause));
        }
    };

    if let Some(evicted) = state.slots.insert(index, Arc::clone(&raster), stamp) {
        debug!(evicted, index, "evicted page from cache");
    }
    Ok(raster)
}

/// Extract, decode and scale one page. Intermediate buffers are dropped as
/// soon as the next stage has consumed them.
async fn load(
    archive: &ComicArchive,
    pipeline: &Pipeline,
    index: usize,
) -> Result<Raster, PageFault> {
    let bytes = archive.extract(index).await?;
    let Pipeline {
        decoder,
        target_width,
        target_height,
    } = pipeline.clone();

    tokio::task::spawn_blocking(move || -> Result<Raster, PageFault> {
        let original = decoder.decode(&bytes)?;
        drop(bytes);
        let scaled = scale_to_fit(&original, target_width, target_height)?;
        debug!(
            index,
            from = ?original.dimensions(),
            to = ?scaled.dimensions(),
            "decoded page"
        );
        Ok(scaled)
    })
    .await
    .map_err(|e| PageFault::Task(e.to_string()))?
}
