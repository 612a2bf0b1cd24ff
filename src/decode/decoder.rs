use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, Limits, Rgba, RgbaImage};
use tracing::debug;

use crate::error::DecodeError;
use crate::io::{ImageSource, SourceReader};

use super::buffer::{Dimensions, PixelBuffer, PixelFormat};
use super::planner::{plan, SampleFactor};

/// Default cap on a single decode allocation: 256MB.
pub const DEFAULT_MAX_DECODE_BYTES: u64 = 256 * 1024 * 1024;

// =============================================================================
// Image Decoder
// =============================================================================

/// Probes and decodes encoded images into [`PixelBuffer`]s.
///
/// The decoder holds no mutable state; decodes of different sources can run
/// concurrently on clones of the same decoder.
///
/// # Reduced-size decoding
///
/// JPEG sources are decoded directly at a reduced size: the DCT is scaled to
/// 1/2, 1/4 or 1/8 as far as the sample factor allows, and nearest-neighbour
/// sampling covers the remainder. The allocation limit applies to that
/// reduced decode, so a small thumbnail of a very large photo stays cheap.
///
/// PNG has no reduced-size decode mode. PNG sources are decoded at full
/// resolution under the allocation limit and sampled afterwards.
///
/// # Example
///
/// ```no_run
/// use raster_cache::decode::{ImageDecoder, PixelFormat};
/// use raster_cache::io::ImageSource;
///
/// let decoder = ImageDecoder::new();
/// let source = ImageSource::path("photos/beach.jpg");
///
/// let thumb = decoder.thumbnail(&source, 320, 240, PixelFormat::LowColorNoAlpha)?;
/// println!("{} ({} bytes)", thumb.dimensions(), thumb.byte_size());
/// # Ok::<(), raster_cache::DecodeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    reader: SourceReader,
    max_decode_bytes: u64,
}

impl ImageDecoder {
    /// Create a decoder reading from the local filesystem.
    pub fn new() -> Self {
        Self::with_reader(SourceReader::default())
    }

    /// Create a decoder over a host-supplied source reader.
    pub fn with_reader(reader: SourceReader) -> Self {
        Self {
            reader,
            max_decode_bytes: DEFAULT_MAX_DECODE_BYTES,
        }
    }

    /// Set the maximum allocation a single decode may make.
    pub fn with_max_decode_bytes(mut self, max_decode_bytes: u64) -> Self {
        self.max_decode_bytes = max_decode_bytes;
        self
    }

    /// Read the dimensions of `source` without decoding its pixels.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::NotFound`] if the source cannot be read
    /// - [`DecodeError::Unreadable`] if the bytes are not a supported image
    pub fn probe(&self, source: &ImageSource) -> Result<Dimensions, DecodeError> {
        let data = self.reader.read(source)?;
        let dimensions = probe_bytes(&data)?;

        debug!(source = %source, %dimensions, "probed image");
        Ok(dimensions)
    }

    /// Decode `source`, keeping one of every `factor` pixels per axis.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::NotFound`] if the source cannot be read
    /// - [`DecodeError::Unreadable`] if the bytes cannot be decoded
    /// - [`DecodeError::EmptyResult`] if decoding yields a 0x0 image
    /// - [`DecodeError::LimitExceeded`] if the decode would exceed the allocation cap
    pub fn decode(
        &self,
        source: &ImageSource,
        factor: SampleFactor,
        format: PixelFormat,
    ) -> Result<PixelBuffer, DecodeError> {
        let data = self.reader.read(source)?;
        self.decode_bytes(&data, factor, format)
    }

    /// Decode `source` downsampled to roughly fit `max_width` x `max_height`.
    ///
    /// The source bytes are read once and shared between the bounds probe and
    /// the pixel decode.
    pub fn thumbnail(
        &self,
        source: &ImageSource,
        max_width: u32,
        max_height: u32,
        format: PixelFormat,
    ) -> Result<PixelBuffer, DecodeError> {
        let data = self.reader.read(source)?;

        let dimensions = probe_bytes(&data)?;
        let factor = plan(dimensions, max_width, max_height);

        debug!(
            source = %source,
            %dimensions,
            %factor,
            max_width,
            max_height,
            "planned thumbnail decode"
        );

        self.decode_bytes(&data, factor, format)
    }

    /// Decode in-memory encoded bytes.
    pub fn decode_bytes(
        &self,
        data: &[u8],
        factor: SampleFactor,
        format: PixelFormat,
    ) -> Result<PixelBuffer, DecodeError> {
        let reader = guess_format(data)?;

        let rgba = if reader.format() == Some(ImageFormat::Jpeg) {
            self.decode_jpeg_scaled(data, factor)?
        } else {
            self.decode_full(reader, factor)?
        };

        Ok(PixelBuffer::from_rgba(rgba, format))
    }

    /// Decode at full resolution, then sample down.
    fn decode_full(
        &self,
        mut reader: ImageReader<Cursor<&[u8]>>,
        factor: SampleFactor,
    ) -> Result<RgbaImage, DecodeError> {
        let mut limits = Limits::default();
        limits.max_alloc = Some(self.max_decode_bytes);
        reader.limits(limits);

        let decoded = reader.decode()?;
        let (width, height) = decoded.dimensions();
        let source = Dimensions::new(width, height);
        ensure_not_empty(source)?;

        if factor == SampleFactor::ONE {
            return Ok(decoded.into_rgba8());
        }

        // Full-resolution intermediate is dropped on return.
        Ok(resample(&decoded, factor.apply(source)))
    }

    /// Decode a JPEG with DCT scaling, then sample the remainder.
    fn decode_jpeg_scaled(&self, data: &[u8], factor: SampleFactor) -> Result<RgbaImage, DecodeError> {
        let mut decoder = jpeg_decoder::Decoder::new(data);
        decoder.read_info()?;
        let info = decoder
            .info()
            .ok_or_else(|| DecodeError::Unreadable("missing JPEG frame header".to_string()))?;

        let source = Dimensions::new(u32::from(info.width), u32::from(info.height));
        ensure_not_empty(source)?;
        let target = factor.apply(source);

        // Smallest DCT scale whose output still covers the target.
        let (scaled_width, scaled_height) = decoder.scale(to_u16(target.width), to_u16(target.height))?;
        let scaled = Dimensions::new(u32::from(scaled_width), u32::from(scaled_height));
        let bpp = info.pixel_format.pixel_bytes();

        let needed = scaled.pixel_count() * bpp as u64 + target.pixel_count() * 4;
        if needed > self.max_decode_bytes {
            return Err(DecodeError::LimitExceeded(format!(
                "decoding {} at {} needs {} bytes, limit is {}",
                source, scaled, needed, self.max_decode_bytes
            )));
        }

        let pixels = decoder.decode()?;
        if pixels.len() as u64 != scaled.pixel_count() * bpp as u64 {
            return Err(DecodeError::Unreadable(format!(
                "JPEG decoder returned {} bytes for {}",
                pixels.len(),
                scaled
            )));
        }

        debug!(%source, %scaled, %target, "scaled JPEG decode");

        Ok(RgbaImage::from_fn(target.width, target.height, |x, y| {
            let sx = nearest(x, target.width, scaled.width) as usize;
            let sy = nearest(y, target.height, scaled.height) as usize;
            let offset = (sy * scaled.width as usize + sx) * bpp;
            jpeg_pixel(&pixels[offset..offset + bpp])
        }))
    }
}

impl Default for ImageDecoder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Read image dimensions from encoded bytes using a header-only parse.
pub fn probe_bytes(data: &[u8]) -> Result<Dimensions, DecodeError> {
    let reader = guess_format(data)?;
    let (width, height) = reader.into_dimensions()?;

    let dimensions = Dimensions::new(width, height);
    if dimensions.is_empty() {
        return Err(DecodeError::Unreadable(format!(
            "image header reports {} dimensions",
            dimensions
        )));
    }
    Ok(dimensions)
}

fn guess_format(data: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::Unreadable("source is empty".to_string()));
    }

    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| DecodeError::Unreadable(e.to_string()))?;

    if reader.format().is_none() {
        return Err(DecodeError::Unreadable(
            "unrecognized image format".to_string(),
        ));
    }
    Ok(reader)
}

/// Both codecs reject zero-sized headers themselves; this catches any
/// decoder that lets one through.
fn ensure_not_empty(dimensions: Dimensions) -> Result<(), DecodeError> {
    if dimensions.is_empty() {
        return Err(DecodeError::EmptyResult);
    }
    Ok(())
}

/// Nearest-neighbour resample of `image` to `target`.
fn resample(image: &DynamicImage, target: Dimensions) -> RgbaImage {
    let (width, height) = image.dimensions();

    RgbaImage::from_fn(target.width, target.height, |x, y| {
        image.get_pixel(nearest(x, target.width, width), nearest(y, target.height, height))
    })
}

/// Map output coordinate `x` of `out_len` onto an axis of `src_len` pixels.
fn nearest(x: u32, out_len: u32, src_len: u32) -> u32 {
    let mapped = u64::from(x) * u64::from(src_len) / u64::from(out_len.max(1));
    (mapped as u32).min(src_len.saturating_sub(1))
}

/// JPEG frame sizes are u16; targets never exceed the source.
fn to_u16(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

/// Expand one decoded JPEG pixel (gray, 16-bit gray, RGB or CMYK) to RGBA.
fn jpeg_pixel(px: &[u8]) -> Rgba<u8> {
    match px.len() {
        1 | 2 => Rgba([px[0], px[0], px[0], 0xFF]),
        3 => Rgba([px[0], px[1], px[2], 0xFF]),
        _ => {
            let k = u16::from(255 - px[3]);
            let channel = |c: u8| (u16::from(255 - c) * k / 255) as u8;
            Rgba([channel(px[0]), channel(px[1]), channel(px[2]), 0xFF])
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
