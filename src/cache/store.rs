//! Keyed image store.
//!
//! Ties the decoder to the pixel cache: a request for a key is served from
//! the cache when possible, otherwise the source is probed, a sample factor
//! is planned, the image is decoded and the result is cached.

use tracing::debug;

use crate::config::StoreConfig;
use crate::decode::{ImageDecoder, PixelBuffer, PixelFormat};
use crate::error::DecodeError;
use crate::io::{ImageSource, SourceReader};

use super::bounded::{BoundedCache, CacheStats};

/// A decoder paired with a kibibyte-bounded pixel cache.
///
/// The store is an explicitly owned object; create one per consumer and pass
/// it by reference rather than sharing a process-wide instance.
///
/// # Example
///
/// ```no_run
/// use raster_cache::cache::ImageStore;
/// use raster_cache::config::StoreConfig;
/// use raster_cache::io::ImageSource;
///
/// let mut store = ImageStore::from_config(&StoreConfig::default());
/// let source = ImageSource::path("photos/beach.jpg");
///
/// if let Some(thumb) = store.load("beach", &source, 320, 240)? {
///     println!("{}", thumb.dimensions());
/// }
/// # Ok::<(), raster_cache::DecodeError>(())
/// ```
#[derive(Debug)]
pub struct ImageStore {
    decoder: ImageDecoder,
    cache: BoundedCache<PixelBuffer>,
    default_format: PixelFormat,
}

impl ImageStore {
    /// Create a store from an existing decoder and cache.
    pub fn new(decoder: ImageDecoder, cache: BoundedCache<PixelBuffer>) -> Self {
        Self {
            decoder,
            cache,
            default_format: PixelFormat::default(),
        }
    }

    /// Create a filesystem-backed store from configuration.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::with_reader(config, SourceReader::default())
    }

    /// Create a store over a host-supplied source reader.
    pub fn with_reader(config: &StoreConfig, reader: SourceReader) -> Self {
        let decoder = ImageDecoder::with_reader(reader).with_max_decode_bytes(config.max_decode_bytes);
        let cache = BoundedCache::with_capacity_kib(config.cache_capacity_kib);

        Self {
            decoder,
            cache,
            default_format: config.default_format,
        }
    }

    /// Fetch `key`, decoding `source` to fit `max_width` x `max_height` on a
    /// miss, in the configured default pixel format.
    pub fn load(
        &mut self,
        key: &str,
        source: &ImageSource,
        max_width: u32,
        max_height: u32,
    ) -> Result<Option<&PixelBuffer>, DecodeError> {
        let format = self.default_format;
        self.load_as(key, source, max_width, max_height, format)
    }

    /// Fetch `key`, decoding `source` in `format` on a miss.
    ///
    /// Returns `Ok(None)` if the decoded image is larger than the whole cache
    /// and was therefore evicted as soon as it was stored. The key is only
    /// used for lookup; a hit is returned as-is even if it was decoded with
    /// different bounds or format.
    pub fn load_as(
        &mut self,
        key: &str,
        source: &ImageSource,
        max_width: u32,
        max_height: u32,
        format: PixelFormat,
    ) -> Result<Option<&PixelBuffer>, DecodeError> {
        let decoder = &self.decoder;

        self.cache.get_or_try_insert_with(key, || {
            debug!(key, source = %source, "cache miss, decoding");
            decoder.thumbnail(source, max_width, max_height, format)
        })
    }

    /// Store an already decoded buffer, returning the one it replaced.
    pub fn insert(&mut self, key: impl Into<String>, buffer: PixelBuffer) -> Option<PixelBuffer> {
        self.cache.put(key, buffer)
    }

    /// Look up `key` without decoding.
    pub fn get(&mut self, key: &str) -> Option<&PixelBuffer> {
        self.cache.get(key)
    }

    /// Drop `key` from the cache, returning its buffer.
    pub fn remove(&mut self, key: &str) -> Option<PixelBuffer> {
        self.cache.remove(key)
    }

    pub fn cache(&self) -> &BoundedCache<PixelBuffer> {
        &self.cache
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

// =============================================================================
// Tests
// =============================================================================
