//! # raster-cache
//!
//! In-process management of decoded raster images with a bounded memory
//! footprint.
//!
//! ## Features
//!
//! - **Bounds-only probing**: Reads image dimensions from the header without decoding pixels
//! - **Sample-size planning**: Picks an integral downsample factor for a target box
//! - **Format-aware decoding**: Decodes into 32, 16 or 8 bit-per-pixel layouts
//! - **Re-encoding**: JPEG/PNG output at a chosen quality, written to any sink
//! - **Size-bounded LRU cache**: Capacity measured by a pluggable size function
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`io`] - Image sources, host storage and resource resolution
//! - [`decode`] - Probe, sample-size planner, decoder and pixel buffers
//! - [`encode`] - Re-encoder and output formats
//! - [`cache`] - Bounded LRU cache and the keyed image store
//! - [`config`] - Library configuration and CLI types
//!
//! ## Example
//!
//! ```rust,no_run
//! use raster_cache::{ImageEncoder, ImageSource, ImageStore, OutputFormat, StoreConfig};
//!
//! let config = StoreConfig::default();
//! let mut store = ImageStore::from_config(&config);
//!
//! let source = ImageSource::path("photos/beach.jpg");
//! if let Some(thumb) = store.load("beach", &source, 320, 240)? {
//!     let mut out = Vec::new();
//!     ImageEncoder::new().save_to_sink(thumb, OutputFormat::Jpeg, 80, &mut out)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod io;

// Re-export commonly used types
pub use cache::{kibibytes, BoundedCache, CacheStats, ImageStore, DEFAULT_CACHE_CAPACITY_KIB};
pub use config::{Cli, Command, StoreConfig};
pub use decode::{
    plan, probe_bytes, Dimensions, ImageDecoder, PixelBuffer, PixelFormat, SampleFactor,
    DEFAULT_MAX_DECODE_BYTES,
};
pub use encode::{
    clamp_quality, is_valid_quality, Compressed, ImageEncoder, OutputFormat, DEFAULT_QUALITY,
    MAX_QUALITY, MIN_QUALITY,
};
pub use error::{DecodeError, EncodeError};
pub use io::{FsStorage, ImageSource, ResourceMap, ResourceResolver, SourceReader, Storage};
