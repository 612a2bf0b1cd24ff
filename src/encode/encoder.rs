//! JPEG/PNG encoder for pixel buffers.
//!
//! # Design Decisions
//!
//! - **Quality is clamped, never rejected**: values above 100 become 100. JPEG
//!   treats 0 as 1 since the codec has no zero-quality table.
//!
//! - **Alpha handling**: JPEG has no alpha channel, so colour formats are
//!   flattened to RGB and `AlphaOnly` buffers are written as grayscale coverage.
//!   PNG keeps alpha for formats that carry it.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, GrayImage, ImageEncoder as _};
use tracing::{debug, trace};

use crate::decode::{probe_bytes, Dimensions, PixelBuffer, PixelFormat};
use crate::error::EncodeError;
use crate::io::Storage;

/// Default encode quality (0-100).
pub const DEFAULT_QUALITY: u8 = 80;

/// Minimum encode quality.
pub const MIN_QUALITY: u8 = 0;

/// Maximum encode quality.
pub const MAX_QUALITY: u8 = 100;

// =============================================================================
// Output Format
// =============================================================================

/// Compressed output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// Lossy JPEG, honours quality
    #[default]
    Jpeg,

    /// Lossless PNG, quality is ignored
    Png,
}

impl OutputFormat {
    pub const fn name(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
        }
    }

    /// Pick a format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnsupportedFormat`] for anything other than
    /// jpg/jpeg/png.
    pub fn from_extension(ext: &str) -> Result<Self, EncodeError> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            other => Err(EncodeError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Pick a format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self, EncodeError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| EncodeError::UnsupportedFormat(format!("{}", path.display())))?;
        Self::from_extension(ext)
    }

    fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            image::ImageFormat::Png => Some(OutputFormat::Png),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s)
    }
}

// =============================================================================
// Encoder
// =============================================================================

/// Result of [`ImageEncoder::compress`]: the encoded bytes plus what a decoder
/// reports for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    /// Encoded image data
    pub data: Bytes,

    /// Dimensions read back from the encoded header
    pub dimensions: Dimensions,

    /// Format detected from the encoded bytes
    pub format: OutputFormat,
}

/// Encoder for pixel buffers.
///
/// # Example
///
/// ```ignore
/// use raster_cache::encode::{ImageEncoder, OutputFormat};
///
/// let encoder = ImageEncoder::new();
///
/// // Encode at quality 85; `buffer` is only borrowed
/// let jpeg = encoder.encode(&buffer, OutputFormat::Jpeg, 85)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ImageEncoder {}

impl ImageEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self {}
    }

    /// Encode `buffer` in `format` at `quality`.
    ///
    /// # Arguments
    ///
    /// * `buffer` - Decoded pixels to serialize
    /// * `format` - Output container
    /// * `quality` - 0-100, clamped; ignored for PNG
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnsupportedFormat`] if the codec rejects the
    /// buffer (for example dimensions beyond the JPEG limit).
    pub fn encode(
        &self,
        buffer: &PixelBuffer,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Bytes, EncodeError> {
        let quality = clamp_quality(quality);
        let Dimensions { width, height } = buffer.dimensions();
        let mut output = Vec::new();

        match format {
            OutputFormat::Jpeg => {
                let mut encoder = JpegEncoder::new_with_quality(&mut output, quality.max(1));
                if buffer.format() == PixelFormat::AlphaOnly {
                    encoder.encode(buffer.as_bytes(), width, height, ExtendedColorType::L8)?;
                } else {
                    let rgb = DynamicImage::ImageRgba8(buffer.to_rgba()).into_rgb8();
                    encoder.encode_image(&rgb)?;
                }
            }
            OutputFormat::Png => {
                let encoder = PngEncoder::new(&mut output);
                match buffer.format() {
                    PixelFormat::AlphaOnly => {
                        let coverage = GrayImage::from_raw(width, height, buffer.as_bytes().to_vec())
                            .ok_or_else(|| {
                                EncodeError::UnsupportedFormat("malformed alpha buffer".to_string())
                            })?;
                        encoder.write_image(coverage.as_raw(), width, height, ExtendedColorType::L8)?;
                    }
                    pixel_format if pixel_format.has_alpha() => {
                        let rgba = buffer.to_rgba();
                        encoder.write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)?;
                    }
                    _ => {
                        let rgb = DynamicImage::ImageRgba8(buffer.to_rgba()).into_rgb8();
                        encoder.write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)?;
                    }
                }
                trace!(quality, "quality ignored for lossless output");
            }
        }

        debug!(
            dimensions = %buffer.dimensions(),
            pixel_format = %buffer.format(),
            %format,
            quality,
            encoded_bytes = output.len(),
            "encoded pixel buffer"
        );

        Ok(Bytes::from(output))
    }

    /// Encode at [`DEFAULT_QUALITY`].
    pub fn encode_default(
        &self,
        buffer: &PixelBuffer,
        format: OutputFormat,
    ) -> Result<Bytes, EncodeError> {
        self.encode(buffer, format, DEFAULT_QUALITY)
    }

    /// Encode, then read the result back to report its final dimensions and
    /// format.
    pub fn compress(
        &self,
        buffer: &PixelBuffer,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Compressed, EncodeError> {
        let data = self.encode(buffer, format, quality)?;

        let dimensions = probe_bytes(&data).map_err(|e| {
            EncodeError::UnsupportedFormat(format!("encoded output is not decodable: {}", e))
        })?;
        let detected = image::guess_format(&data)
            .ok()
            .and_then(OutputFormat::from_image_format)
            .unwrap_or(format);

        Ok(Compressed {
            data,
            dimensions,
            format: detected,
        })
    }

    /// Encode and write to `sink`, returning the number of bytes written.
    ///
    /// The buffer is borrowed and stays valid after this call.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::IoFailure`] if writing or flushing fails.
    pub fn save_to_sink<W: Write + ?Sized>(
        &self,
        buffer: &PixelBuffer,
        format: OutputFormat,
        quality: u8,
        sink: &mut W,
    ) -> Result<u64, EncodeError> {
        let data = self.encode(buffer, format, quality)?;
        sink.write_all(&data)?;
        sink.flush()?;
        Ok(data.len() as u64)
    }

    /// Encode and write to `path` through the host storage.
    pub fn save_to_path(
        &self,
        buffer: &PixelBuffer,
        format: OutputFormat,
        quality: u8,
        storage: &dyn Storage,
        path: &Path,
    ) -> Result<u64, EncodeError> {
        let mut sink = storage.open_for_write(path)?;
        let written = self.save_to_sink(buffer, format, quality, &mut sink)?;

        debug!(path = %path.display(), bytes = written, "saved encoded image");
        Ok(written)
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Validate quality parameter.
///
/// Returns `true` if quality is in the valid range (0-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    quality <= MAX_QUALITY
}

/// Clamp quality to valid range.
///
/// Values above 100 become 100.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_QUALITY, MAX_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
