//! Configuration management for raster-cache.
//!
//! This module provides:
//! - [`StoreConfig`], the library-level settings for an [`ImageStore`](crate::cache::ImageStore)
//! - [`Cli`], the command-line front end, parsed with clap
//!
//! # Environment Variables
//!
//! CLI options can also be set via environment variables with the `RASTER_` prefix:
//!
//! - `RASTER_MAX_WIDTH` / `RASTER_MAX_HEIGHT` - Thumbnail bounding box (default: 256x256)
//! - `RASTER_PIXEL_FORMAT` - In-memory pixel format (default: argb8888)
//! - `RASTER_QUALITY` - Encode quality 0-100 (default: 80)
//! - `RASTER_CACHE_KIB` - Cache capacity in KiB (default: 32768)
//! - `RASTER_MAX_DECODE_BYTES` - Per-decode allocation cap (default: 256MB)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::cache::DEFAULT_CACHE_CAPACITY_KIB;
use crate::decode::{PixelFormat, DEFAULT_MAX_DECODE_BYTES};
use crate::encode::{OutputFormat, DEFAULT_QUALITY, MAX_QUALITY};

// =============================================================================
// Default Values
// =============================================================================

/// Default thumbnail bounding box edge.
pub const DEFAULT_MAX_DIMENSION: u32 = 256;

/// Default number of passes for the batch command.
pub const DEFAULT_BATCH_PASSES: u32 = 2;

// =============================================================================
// Library Configuration
// =============================================================================

/// Settings for an image store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Cache capacity in KiB of decoded pixels
    pub cache_capacity_kib: u32,

    /// Maximum allocation for a single decode, in bytes
    pub max_decode_bytes: u64,

    /// Default encode quality (0-100)
    pub default_quality: u8,

    /// Pixel format used when the caller does not pick one
    pub default_format: PixelFormat,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_capacity_kib: DEFAULT_CACHE_CAPACITY_KIB,
            max_decode_bytes: DEFAULT_MAX_DECODE_BYTES,
            default_quality: DEFAULT_QUALITY,
            default_format: PixelFormat::default(),
        }
    }
}

impl StoreConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_capacity_kib == 0 {
            return Err("cache_capacity_kib must be greater than 0".to_string());
        }
        if self.max_decode_bytes == 0 {
            return Err("max_decode_bytes must be greater than 0".to_string());
        }
        if self.default_quality > MAX_QUALITY {
            return Err("default_quality must be between 0 and 100".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// raster-cache - decode, downsample, re-encode and cache raster images.
#[derive(Parser, Debug, Clone)]
#[command(name = "raster-cache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print image dimensions without decoding pixels.
    Probe(ProbeConfig),

    /// Decode a downsampled thumbnail and save it.
    Thumbnail(ThumbnailConfig),

    /// Re-encode an image at full size and report the result.
    Compress(CompressConfig),

    /// Load many images through the cache and print cache statistics.
    Batch(BatchConfig),
}

/// Options shared by commands that decode.
#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
    /// Maximum thumbnail width in pixels.
    #[arg(long, default_value_t = DEFAULT_MAX_DIMENSION, env = "RASTER_MAX_WIDTH")]
    pub max_width: u32,

    /// Maximum thumbnail height in pixels.
    #[arg(long, default_value_t = DEFAULT_MAX_DIMENSION, env = "RASTER_MAX_HEIGHT")]
    pub max_height: u32,

    /// In-memory pixel format (argb8888, rgbx8888, rgb565, argb4444, alpha8).
    #[arg(long, default_value = "argb8888", env = "RASTER_PIXEL_FORMAT")]
    pub pixel_format: PixelFormat,

    /// Maximum allocation for a single decode, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_DECODE_BYTES, env = "RASTER_MAX_DECODE_BYTES")]
    pub max_decode_bytes: u64,
}

impl DecodeArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err("max_width and max_height must be greater than 0".to_string());
        }
        if self.max_decode_bytes == 0 {
            return Err("max_decode_bytes must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Arguments for `probe`.
#[derive(Args, Debug, Clone)]
pub struct ProbeConfig {
    /// Image file to inspect.
    pub input: PathBuf,

    /// Print the result as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// Arguments for `thumbnail`.
#[derive(Args, Debug, Clone)]
pub struct ThumbnailConfig {
    /// Image file to decode.
    pub input: PathBuf,

    /// Where to write the encoded thumbnail.
    #[arg(short, long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub decode: DecodeArgs,

    /// Output format (jpeg or png). Defaults to the output file extension.
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Encode quality (0-100).
    #[arg(short, long, default_value_t = DEFAULT_QUALITY, env = "RASTER_QUALITY")]
    pub quality: u8,
}

impl ThumbnailConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.decode.validate()?;
        validate_quality(self.quality)
    }
}

/// Arguments for `compress`.
#[derive(Args, Debug, Clone)]
pub struct CompressConfig {
    /// Image file to re-encode.
    pub input: PathBuf,

    /// Where to write the re-encoded image. Omit to only report the size.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (jpeg or png).
    #[arg(long, default_value = "jpeg")]
    pub format: OutputFormat,

    /// Encode quality (0-100).
    #[arg(short, long, default_value_t = DEFAULT_QUALITY, env = "RASTER_QUALITY")]
    pub quality: u8,
}

impl CompressConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_quality(self.quality)
    }
}

/// Arguments for `batch`.
#[derive(Args, Debug, Clone)]
pub struct BatchConfig {
    /// Image files to load; each file path is its cache key.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    #[command(flatten)]
    pub decode: DecodeArgs,

    /// Cache capacity in KiB.
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY_KIB, env = "RASTER_CACHE_KIB")]
    pub cache_kib: u32,

    /// How many times to walk the input list.
    #[arg(long, default_value_t = DEFAULT_BATCH_PASSES)]
    pub passes: u32,
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.decode.validate()?;
        self.store_config().validate()?;
        if self.passes == 0 {
            return Err("passes must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Build the store configuration for this run.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            cache_capacity_kib: self.cache_kib,
            max_decode_bytes: self.decode.max_decode_bytes,
            default_format: self.decode.pixel_format,
            ..StoreConfig::default()
        }
    }
}

fn validate_quality(quality: u8) -> Result<(), String> {
    if quality > MAX_QUALITY {
        return Err("quality must be between 0 and 100".to_string());
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
