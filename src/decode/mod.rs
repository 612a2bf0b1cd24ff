//! Decoding layer.
//!
//! Turns encoded image sources into owned pixel buffers while keeping the
//! memory footprint bounded:
//!
//! ```text
//! ImageSource ──► probe (header only) ──► plan (sample factor) ──► decode ──► PixelBuffer
//! ```
//!
//! # Components
//!
//! - [`ImageDecoder`]: probes, decodes and builds thumbnails
//! - [`plan`] / [`SampleFactor`]: choose an integral downsample factor
//! - [`PixelBuffer`] / [`PixelFormat`] / [`Dimensions`]: decoded pixel storage

mod buffer;
mod decoder;
mod planner;

pub use buffer::{Dimensions, PixelBuffer, PixelFormat};
pub use decoder::{probe_bytes, ImageDecoder, DEFAULT_MAX_DECODE_BYTES};
pub use planner::{plan, SampleFactor};
