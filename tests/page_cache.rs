mod common;

use std::sync::Arc;

use comicz::{
    ArchiveConfig, ArchiveFormat, CacheConfig, ComicArchive, MemoryReader, PageCache, PageFault,
};

use common::{CountingDecoder, png_cbz, png_page, stored_cbz};

async fn memory_archive(data: Vec<u8>) -> Arc<ComicArchive> {
    let archive = ComicArchive::from_reader(
        Arc::new(MemoryReader::new(data)),
        ArchiveFormat::Cbz,
        "memory.cbz",
        &ArchiveConfig::default(),
    )
    .await
    .unwrap();
    Arc::new(archive)
}

fn counting_cache(archive: Arc<ComicArchive>, config: &CacheConfig) -> (PageCache, Arc<CountingDecoder>) {
    let decoder = CountingDecoder::new();
    let cache = PageCache::with_decoder(archive, config, decoder.clone());
    (cache, decoder)
}

#[tokio::test]
async fn least_recently_used_page_is_evicted() {
    let archive = memory_archive(png_cbz(5, 4, 4)).await;
    let (cache, decoder) = counting_cache(archive, &CacheConfig::default());

    for index in 0..4 {
        cache.get_page(index).await.unwrap();
    }
    assert_eq!(decoder.count(), 4);
    let mut resident = cache.cached_pages().await;
    resident.sort();
    assert_eq!(resident, [1, 2, 3]);

    // Page 0 was evicted and must be decoded again, displacing page 1
    cache.get_page(0).await.unwrap();
    assert_eq!(decoder.count(), 5);

    cache.get_page(2).await.unwrap();
    cache.get_page(3).await.unwrap();
    cache.get_page(0).await.unwrap();
    assert_eq!(decoder.count(), 5);
}

#[tokio::test]
async fn repeated_request_decodes_once() {
    let archive = memory_archive(png_cbz(2, 6, 3)).await;
    let (cache, decoder) = counting_cache(archive, &CacheConfig::default());

    let first = cache.get_page(1).await.unwrap();
    let second = cache.get_page(1).await.unwrap();
    assert_eq!(decoder.count(), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.pixel(0, 0), Some([2, 2, 2, 255]));
}

#[tokio::test]
async fn out_of_range_requests_have_no_side_effects() {
    let archive = memory_archive(png_cbz(3, 2, 2)).await;
    let (cache, decoder) = counting_cache(archive.clone(), &CacheConfig::default());

    for index in [archive.page_count(), usize::MAX] {
        let err = cache.get_page(index).await.unwrap_err();
        assert_eq!(err.index, index);
        assert!(matches!(err.cause, PageFault::OutOfRange { page_count: 3 }));
    }
    assert_eq!(decoder.count(), 0);
    assert!(cache.cached_pages().await.is_empty());
}

#[tokio::test]
async fn failed_load_leaves_cache_unchanged() {
    let good = png_page(4, 4, 50);
    let data = stored_cbz(&[("1.png", &good), ("2.png", b"definitely not a png")]);
    let archive = memory_archive(data).await;
    let (cache, decoder) = counting_cache(archive, &CacheConfig::default());

    cache.get_page(0).await.unwrap();
    let err = cache.get_page(1).await.unwrap_err();
    assert_eq!(err.index, 1);
    assert!(matches!(err.cause, PageFault::Decode(_)));
    assert_eq!(cache.cached_pages().await, [0]);

    // Still a hit afterwards
    cache.get_page(0).await.unwrap();
    assert_eq!(decoder.count(), 2);
}

#[tokio::test]
async fn extraction_failures_become_page_unavailable() {
    let data = stored_cbz(&[("1.png", b""), ("2.png", &png_page(2, 2, 1))]);
    let archive = memory_archive(data).await;
    let cache = PageCache::new(archive, &CacheConfig::default());

    let err = cache.get_page(0).await.unwrap_err();
    assert!(matches!(err.cause, PageFault::Archive(_)));
    assert!(cache.cached_pages().await.is_empty());
}

#[tokio::test]
async fn pages_are_scaled_into_the_target_without_upscaling() {
    let small = png_page(30, 20, 1);
    let large = png_page(400, 100, 2);
    let data = stored_cbz(&[("1.png", &small), ("2.png", &large)]);
    let archive = memory_archive(data).await;
    let cache = PageCache::open(archive, 100, 100);

    assert_eq!(cache.target_size(), (100, 100));
    assert_eq!(cache.capacity().await, 3);
    assert_eq!(cache.get_page(0).await.unwrap().dimensions(), (30, 20));
    assert_eq!(cache.get_page(1).await.unwrap().dimensions(), (100, 25));
}

#[tokio::test]
async fn preload_fills_both_neighbours() {
    let archive = memory_archive(png_cbz(5, 2, 2)).await;
    let (cache, decoder) = counting_cache(archive, &CacheConfig::default());

    cache.get_page(2).await.unwrap();
    cache.preload_adjacent(2).await;
    let mut resident = cache.cached_pages().await;
    resident.sort();
    assert_eq!(resident, [1, 2, 3]);
    assert_eq!(decoder.count(), 3);

    // Page 2 was used least recently, so loading 4 evicts it and 2 comes
    // back in place of 1.
    cache.get_page(3).await.unwrap();
    cache.preload_adjacent(3).await;
    let mut resident = cache.cached_pages().await;
    resident.sort();
    assert_eq!(resident, [2, 3, 4]);
    assert_eq!(decoder.count(), 5);
}

#[tokio::test]
async fn preload_at_the_edges_is_silent() {
    let archive = memory_archive(png_cbz(1, 2, 2)).await;
    let (cache, decoder) = counting_cache(archive, &CacheConfig::default());

    cache.preload_adjacent(0).await;
    cache.preload_adjacent(usize::MAX).await;
    assert_eq!(decoder.count(), 0);
}

#[tokio::test]
async fn clear_releases_pages_and_unbinds() {
    let archive = memory_archive(png_cbz(2, 2, 2)).await;
    let (cache, decoder) = counting_cache(archive.clone(), &CacheConfig::default());

    let page = cache.get_page(0).await.unwrap();
    cache.clear().await;
    assert!(cache.cached_pages().await.is_empty());
    assert!(!cache.is_bound().await);
    assert!(archive.is_open());
    // Callers may keep rasters they were handed
    assert_eq!(page.dimensions(), (2, 2));

    let err = cache.get_page(0).await.unwrap_err();
    assert!(matches!(err.cause, PageFault::Unbound));

    cache.bind(archive).await;
    cache.get_page(0).await.unwrap();
    assert_eq!(decoder.count(), 2);
}

#[tokio::test]
async fn rebinding_switches_documents() {
    let first = memory_archive(png_cbz(2, 2, 2)).await;
    let second = memory_archive(png_cbz(4, 3, 3)).await;
    let cache = PageCache::new(first, &CacheConfig::default());

    cache.get_page(1).await.unwrap();
    cache.bind(second).await;
    assert_eq!(cache.page_count().await, 4);
    assert!(cache.cached_pages().await.is_empty());
    assert_eq!(cache.get_page(3).await.unwrap().dimensions(), (3, 3));
}

#[tokio::test]
async fn concurrent_requests_share_one_decode() {
    let archive = memory_archive(png_cbz(2, 8, 8)).await;
    let (cache, decoder) = counting_cache(archive, &CacheConfig::default());

    let (a, b) = tokio::join!(cache.get_page(1), cache.get_page(1));
    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(decoder.count(), 1);
}

#[tokio::test]
async fn closed_archive_pages_are_unavailable() {
    let archive = memory_archive(png_cbz(2, 2, 2)).await;
    let cache = PageCache::new(archive.clone(), &CacheConfig::default());

    archive.close().await;
    let err = cache.get_page(0).await.unwrap_err();
    assert!(matches!(err.cause, PageFault::OutOfRange { page_count: 0 }));
}
