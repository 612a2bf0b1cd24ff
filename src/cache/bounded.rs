//! Size-bounded LRU cache.
//!
//! Capacity is measured by a caller-supplied size function rather than by
//! entry count. After every public call the sum of measured sizes is at most
//! the configured capacity.
//!
//! # Eviction Order
//!
//! Entries are evicted strictly least-recently-used first. Entries that were
//! inserted and never accessed since are evicted in insertion order. A `put`
//! never evicts the entry it just stored unless that entry alone exceeds the
//! capacity.
//!
//! # Oversized Values
//!
//! A value whose measured size exceeds the whole capacity is accepted and
//! immediately evicted: it goes straight to the eviction hook, any previous
//! value under the same key is removed and returned, and every other entry
//! stays where it is.
//!
//! # Borrowing
//!
//! [`get`](BoundedCache::get) returns a borrow tied to `&mut self`, so a view
//! into the cache can never outlive the next mutating call.

use std::fmt;

use lru::LruCache;
use serde::Serialize;
use tracing::{trace, warn};

use crate::decode::PixelBuffer;

/// Default capacity in kibibytes: 32MB.
pub const DEFAULT_CACHE_CAPACITY_KIB: u32 = 32 * 1024;

/// Measures a value in cache-accounting units.
pub type SizeFn<V> = Box<dyn Fn(&V) -> u32 + Send + Sync>;

/// Receives each evicted entry exactly once, after it has been unlinked.
pub type EvictionHook<V> = Box<dyn FnMut(String, V) + Send>;

/// Default size function: byte size in kibibytes, rounded down.
pub fn kibibytes(buffer: &PixelBuffer) -> u32 {
    (buffer.byte_size() / 1024).min(u64::from(u32::MAX)) as u32
}

struct Entry<V> {
    value: V,
    size: u32,
}

// =============================================================================
// Statistics
// =============================================================================

/// Snapshot of cache usage counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    /// Sum of measured sizes of resident entries
    pub size: u64,

    /// Configured capacity in accounting units
    pub capacity: u32,

    /// Number of resident entries
    pub entries: usize,

    /// Lookups that found an entry
    pub hits: u64,

    /// Lookups that found nothing
    pub misses: u64,

    /// Values stored via `put`
    pub puts: u64,

    /// Entries handed to the eviction path
    pub evictions: u64,
}

// =============================================================================
// Bounded Cache
// =============================================================================

/// LRU cache keyed by string, bounded by the measured size of its values.
///
/// The cache is a single unit of mutation: every operation takes `&mut self`
/// and runs its eviction cascade to completion before returning. Share it
/// across threads by wrapping it in a mutex.
///
/// # Example
///
/// ```
/// use raster_cache::cache::BoundedCache;
///
/// // Capacity of 10 units, each value measured by its length
/// let mut cache = BoundedCache::new(10, |v: &Vec<u8>| v.len() as u32);
///
/// cache.put("a", vec![0; 4]);
/// cache.put("b", vec![0; 4]);
/// cache.get("a");
/// cache.put("c", vec![0; 4]);
///
/// // "b" was least recently used
/// assert!(cache.contains("a"));
/// assert!(!cache.contains("b"));
/// assert!(cache.contains("c"));
/// ```
pub struct BoundedCache<V> {
    entries: LruCache<String, Entry<V>>,
    capacity: u32,
    size: u64,
    size_fn: SizeFn<V>,
    on_evict: Option<EvictionHook<V>>,
    hits: u64,
    misses: u64,
    puts: u64,
    evictions: u64,
}

impl<V> BoundedCache<V> {
    /// Create a cache holding at most `capacity` units as measured by `size_fn`.
    pub fn new(capacity: u32, size_fn: impl Fn(&V) -> u32 + Send + Sync + 'static) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity,
            size: 0,
            size_fn: Box::new(size_fn),
            on_evict: None,
            hits: 0,
            misses: 0,
            puts: 0,
            evictions: 0,
        }
    }

    /// Install a hook called with each evicted key and value.
    ///
    /// Values returned from [`put`](Self::put) or [`remove`](Self::remove) go
    /// back to the caller and do not pass through the hook.
    pub fn with_eviction_hook(mut self, hook: impl FnMut(String, V) + Send + 'static) -> Self {
        self.on_evict = Some(Box::new(hook));
        self
    }

    /// Look up `key`, marking it most recently used on a hit.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits += 1;
                Some(&entry.value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Look up `key` without touching recency or statistics.
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.entries.peek(key).map(|entry| &entry.value)
    }

    /// Check whether `key` is resident without touching recency.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Store `value` under `key` as the most recently used entry.
    ///
    /// Returns the value previously stored under `key`, if any. Least recently
    /// used entries are then evicted until the cache is within capacity.
    pub fn put(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        let size = (self.size_fn)(&value);
        self.puts += 1;

        let previous = self.entries.pop(key.as_str()).map(|old| {
            self.size -= u64::from(old.size);
            old.value
        });

        if size > self.capacity {
            warn!(
                key = %key,
                size,
                capacity = self.capacity,
                "value exceeds cache capacity, evicting immediately"
            );
            self.evict(key, size, value);
            return previous;
        }

        self.entries.put(key, Entry { value, size });
        self.size += u64::from(size);
        self.trim_to(self.capacity);

        previous
    }

    /// Store `value` only if `key` is not already resident.
    ///
    /// Hands the value back as `Err` when the key is present; the resident
    /// entry keeps its recency.
    pub fn put_if_absent(&mut self, key: impl Into<String>, value: V) -> Result<(), V> {
        let key = key.into();
        if self.entries.contains(key.as_str()) {
            return Err(value);
        }
        self.put(key, value);
        Ok(())
    }

    /// Return the entry for `key`, loading and storing it on a miss.
    ///
    /// Returns `Ok(None)` if the loaded value was too large to keep.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: &str,
        load: impl FnOnce() -> Result<V, E>,
    ) -> Result<Option<&V>, E> {
        if self.entries.contains(key) {
            return Ok(self.get(key));
        }

        self.misses += 1;
        let value = load()?;
        self.put(key, value);

        Ok(self.entries.peek(key).map(|entry| &entry.value))
    }

    /// Remove `key` unconditionally, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.pop(key).map(|entry| {
            self.size -= u64::from(entry.size);
            entry.value
        })
    }

    /// Change the capacity, evicting down to the new bound immediately.
    pub fn resize(&mut self, capacity: u32) {
        self.capacity = capacity;
        self.trim_to(capacity);
    }

    /// Evict every entry through the eviction hook.
    pub fn evict_all(&mut self) {
        while let Some((key, entry)) = self.entries.pop_lru() {
            self.size -= u64::from(entry.size);
            self.evict(key, entry.size, entry.value);
        }
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of measured sizes of resident entries.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Capacity in accounting units.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.size,
            capacity: self.capacity,
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            puts: self.puts,
            evictions: self.evictions,
        }
    }

    fn trim_to(&mut self, limit: u32) {
        while self.size > u64::from(limit) {
            let Some((key, entry)) = self.entries.pop_lru() else {
                break;
            };
            self.size -= u64::from(entry.size);
            self.evict(key, entry.size, entry.value);
        }
    }

    /// The entry must already be unlinked and its size subtracted.
    fn evict(&mut self, key: String, size: u32, value: V) {
        self.evictions += 1;
        trace!(key = %key, size, "evicted cache entry");

        if let Some(hook) = self.on_evict.as_mut() {
            hook(key, value);
        }
    }
}

impl BoundedCache<PixelBuffer> {
    /// Create a pixel cache measured in kibibytes.
    pub fn with_capacity_kib(capacity: u32) -> Self {
        Self::new(capacity, kibibytes)
    }
}

impl Default for BoundedCache<PixelBuffer> {
    fn default() -> Self {
        Self::with_capacity_kib(DEFAULT_CACHE_CAPACITY_KIB)
    }
}

impl<V> fmt::Debug for BoundedCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("entries", &self.entries.len())
            .field("size", &self.size)
            .field("capacity", &self.capacity)
            .field("has_eviction_hook", &self.on_evict.is_some())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
