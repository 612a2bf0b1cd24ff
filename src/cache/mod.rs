//! Caching layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               ImageStore                │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ BoundedCache │  │  ImageDecoder   │  │
//! │  │ (PixelBuffer │  │  (probe → plan  │  │
//! │  │  by key, KiB)│  │   → decode)     │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`BoundedCache`]: generic LRU cache bounded by a pluggable size function
//! - [`ImageStore`]: cache lookup with decode-on-miss for pixel buffers
//! - [`CacheStats`]: hit/miss/put/eviction counters
//! - [`kibibytes`]: default size function for pixel buffers

mod bounded;
mod store;

pub use bounded::{
    kibibytes, BoundedCache, CacheStats, EvictionHook, SizeFn, DEFAULT_CACHE_CAPACITY_KIB,
};
pub use store::ImageStore;
