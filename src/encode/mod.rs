//! Re-encoding layer.
//!
//! Serializes decoded [`PixelBuffer`](crate::decode::PixelBuffer)s back into a
//! compressed format for storage or transfer.
//!
//! # Ownership
//!
//! Every encoder entry point borrows the buffer. Saving a buffer never
//! destroys it; dropping the buffer afterwards is the caller's decision, so
//! a buffer that is still displayed or cached can be saved safely.

mod encoder;

pub use encoder::{
    clamp_quality, is_valid_quality, Compressed, ImageEncoder, OutputFormat, DEFAULT_QUALITY,
    MAX_QUALITY, MIN_QUALITY,
};
