//! Cache behaviour tests.
//!
//! Tests verify:
//! - LRU ordering with recency refresh on `get`
//! - Capacity boundaries, including values larger than the whole cache
//! - The eviction hook sees each evicted entry exactly once
//! - The image store decodes once per key and serves hits from memory

use std::sync::{Arc, Mutex};

use raster_cache::{
    kibibytes, BoundedCache, Dimensions, ImageSource, ImageStore, PixelFormat, SourceReader,
    StoreConfig,
};

use super::test_utils::{blank_buffer, create_png, MemoryStorage};

fn unit_cache(capacity: u32) -> BoundedCache<u32> {
    BoundedCache::new(capacity, |v: &u32| *v)
}

fn recording_cache(capacity: u32) -> (BoundedCache<u32>, Arc<Mutex<Vec<String>>>) {
    let evicted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&evicted);
    let cache = unit_cache(capacity).with_eviction_hook(move |key, _| {
        sink.lock().unwrap().push(key);
    });
    (cache, evicted)
}

// =============================================================================
// LRU Ordering
// =============================================================================

#[test]
fn test_evicts_in_insertion_order_without_access() {
    let (mut cache, evicted) = recording_cache(3);

    for key in ["a", "b", "c", "d", "e"] {
        cache.put(key, 1);
    }

    assert_eq!(*evicted.lock().unwrap(), vec!["a", "b"]);
    assert_eq!(cache.keys().collect::<Vec<_>>(), vec!["e", "d", "c"]);
}

#[test]
fn test_get_refreshes_recency() {
    let (mut cache, evicted) = recording_cache(3);

    cache.put("a", 1);
    cache.put("b", 1);
    cache.put("c", 1);
    assert_eq!(cache.get("a"), Some(&1));
    cache.put("d", 1);

    assert_eq!(*evicted.lock().unwrap(), vec!["b"]);
    assert!(cache.contains("a"));
}

#[test]
fn test_repeated_get_is_idempotent() {
    let mut cache = unit_cache(10);
    cache.put("a", 2);
    cache.put("b", 3);

    for _ in 0..5 {
        assert_eq!(cache.get("a"), Some(&2));
    }

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.size(), 5);
    assert_eq!(cache.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(cache.stats().hits, 5);
}

#[test]
fn test_peek_does_not_refresh() {
    let mut cache = unit_cache(2);
    cache.put("a", 1);
    cache.put("b", 1);

    assert_eq!(cache.peek("a"), Some(&1));
    cache.put("c", 1);

    assert!(!cache.contains("a"));
    assert_eq!(cache.stats().hits, 0);
}

// =============================================================================
// Capacity Boundaries
// =============================================================================

#[test]
fn test_value_equal_to_capacity_is_kept() {
    let (mut cache, evicted) = recording_cache(10);
    cache.put("small", 4);
    cache.put("full", 10);

    assert_eq!(cache.get("full"), Some(&10));
    assert_eq!(cache.size(), 10);
    assert_eq!(*evicted.lock().unwrap(), vec!["small"]);
}

#[test]
fn test_oversized_value_leaves_others_alone() {
    let (mut cache, evicted) = recording_cache(10);
    cache.put("a", 3);
    cache.put("b", 3);

    assert_eq!(cache.put("huge", 11), None);

    assert!(!cache.contains("huge"));
    assert!(cache.contains("a"));
    assert!(cache.contains("b"));
    assert_eq!(cache.size(), 6);
    assert_eq!(*evicted.lock().unwrap(), vec!["huge"]);
}

#[test]
fn test_oversized_replacement_returns_previous() {
    let (mut cache, evicted) = recording_cache(10);
    cache.put("a", 3);

    assert_eq!(cache.put("a", 50), Some(3));
    assert!(!cache.contains("a"));
    assert_eq!(cache.size(), 0);
    assert_eq!(*evicted.lock().unwrap(), vec!["a"]);
}

#[test]
fn test_replacing_key_updates_size() {
    let mut cache = unit_cache(10);
    cache.put("a", 4);
    cache.put("b", 4);

    assert_eq!(cache.put("a", 6), Some(4));
    assert_eq!(cache.size(), 10);
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_resize_shrinks_immediately() {
    let (mut cache, evicted) = recording_cache(10);
    for key in ["a", "b", "c", "d", "e"] {
        cache.put(key, 2);
    }

    cache.resize(4);

    assert_eq!(cache.capacity(), 4);
    assert_eq!(cache.size(), 4);
    assert_eq!(*evicted.lock().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(cache.keys().collect::<Vec<_>>(), vec!["e", "d"]);
}

#[test]
fn test_remove_bypasses_hook() {
    let (mut cache, evicted) = recording_cache(10);
    cache.put("a", 5);

    assert_eq!(cache.remove("a"), Some(5));
    assert_eq!(cache.remove("a"), None);
    assert_eq!(cache.size(), 0);
    assert!(evicted.lock().unwrap().is_empty());
}

#[test]
fn test_evict_all_calls_hook_once_per_entry() {
    let (mut cache, evicted) = recording_cache(10);
    cache.put("a", 1);
    cache.put("b", 1);
    cache.put("c", 1);

    cache.evict_all();
    cache.evict_all();

    assert!(cache.is_empty());
    assert_eq!(*evicted.lock().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(cache.stats().evictions, 3);
}

#[test]
fn test_shared_behind_mutex() {
    let cache = Arc::new(Mutex::new(unit_cache(64)));

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let cache = Arc::clone(&cache);
            scope.spawn(move || {
                for i in 0..50 {
                    let mut cache = cache.lock().unwrap();
                    cache.put(format!("{}-{}", worker, i), 1);
                    cache.get(&format!("{}-{}", worker, i / 2));
                }
            });
        }
    });

    let cache = cache.lock().unwrap();
    assert_eq!(cache.len(), 64);
    assert_eq!(cache.size(), 64);
    assert_eq!(cache.stats().puts, 200);
}

// =============================================================================
// Pixel Cache
// =============================================================================

#[test]
fn test_pixel_cache_measures_kibibytes() {
    let mut cache = BoundedCache::with_capacity_kib(64);

    // 64 * 64 * 4 = 16 KiB each
    for key in ["a", "b", "c", "d", "e"] {
        let buffer = blank_buffer(64, 64, PixelFormat::FullColorWithAlpha);
        assert_eq!(kibibytes(&buffer), 16);
        cache.put(key, buffer);
    }

    assert_eq!(cache.size(), 64);
    assert!(!cache.contains("a"));

    // Half the bytes per pixel, half the cost
    let low = blank_buffer(64, 64, PixelFormat::LowColorNoAlpha);
    assert_eq!(kibibytes(&low), 8);
}

// =============================================================================
// Image Store
// =============================================================================

fn store_over(storage: &MemoryStorage, capacity_kib: u32) -> ImageStore {
    let config = StoreConfig {
        cache_capacity_kib: capacity_kib,
        ..StoreConfig::default()
    };
    ImageStore::with_reader(&config, SourceReader::new(Arc::new(storage.clone())))
}

#[test]
fn test_store_decodes_once_per_key() {
    let storage = MemoryStorage::new().with_file("a.png", create_png(200, 100));
    let mut store = store_over(&storage, 1024);
    let source = ImageSource::path("a.png");

    for _ in 0..3 {
        let thumb = store.load("a", &source, 100, 100).unwrap().unwrap();
        assert_eq!(thumb.dimensions(), Dimensions::new(100, 50));
    }

    assert_eq!(storage.read_count(), 1);

    let stats = store.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.entries, 1);
}

#[test]
fn test_store_reloads_after_eviction() {
    let storage = MemoryStorage::new()
        .with_file("a.png", create_png(64, 64))
        .with_file("b.png", create_png(64, 64));
    // Room for one 16 KiB thumbnail
    let mut store = store_over(&storage, 20);

    store.load("a", &ImageSource::path("a.png"), 64, 64).unwrap();
    store.load("b", &ImageSource::path("b.png"), 64, 64).unwrap();
    assert!(store.get("a").is_none());

    store.load("a", &ImageSource::path("a.png"), 64, 64).unwrap();
    assert_eq!(storage.read_count(), 3);
    assert!(store.cache().contains("a"));
    assert!(!store.cache().contains("b"));
}

#[test]
fn test_store_missing_source() {
    let storage = MemoryStorage::new();
    let mut store = store_over(&storage, 1024);

    let result = store.load("ghost", &ImageSource::path("ghost.png"), 10, 10);
    assert!(matches!(result, Err(raster_cache::DecodeError::NotFound(_))));
    assert!(store.cache().is_empty());
}
