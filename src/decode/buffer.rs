//! Decoded pixel storage.
//!
//! A [`PixelBuffer`] is always exclusively owned: the decoder hands it to the
//! caller, the caller moves it into the cache, and the cache hands it to the
//! eviction hook. Nothing in this crate keeps a second handle to it.

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

// =============================================================================
// Dimensions
// =============================================================================

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count, computed without overflow.
    pub const fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether either axis is zero.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether both axes fit inside `max_width` x `max_height`.
    pub const fn fits_within(&self, max_width: u32, max_height: u32) -> bool {
        self.width <= max_width && self.height <= max_height
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// =============================================================================
// Pixel Format
// =============================================================================

/// In-memory pixel layout.
///
/// The format only changes memory footprint and colour depth, never the
/// visible area of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8 bits per channel RGBA (4 bytes/pixel)
    #[default]
    FullColorWithAlpha,

    /// 8 bits per channel RGB with the alpha byte forced opaque (4 bytes/pixel)
    FullColorNoAlpha,

    /// 5-6-5 packed RGB (2 bytes/pixel)
    LowColorNoAlpha,

    /// 4-4-4-4 packed ARGB (2 bytes/pixel)
    LowColorWithAlpha,

    /// Alpha channel only (1 byte/pixel)
    AlphaOnly,
}

impl PixelFormat {
    /// All supported formats.
    pub const ALL: [PixelFormat; 5] = [
        PixelFormat::FullColorWithAlpha,
        PixelFormat::FullColorNoAlpha,
        PixelFormat::LowColorNoAlpha,
        PixelFormat::LowColorWithAlpha,
        PixelFormat::AlphaOnly,
    ];

    /// Bytes used to store one pixel.
    pub const fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::FullColorWithAlpha | PixelFormat::FullColorNoAlpha => 4,
            PixelFormat::LowColorNoAlpha | PixelFormat::LowColorWithAlpha => 2,
            PixelFormat::AlphaOnly => 1,
        }
    }

    /// Whether the format keeps a meaningful alpha channel.
    pub const fn has_alpha(&self) -> bool {
        matches!(
            self,
            PixelFormat::FullColorWithAlpha | PixelFormat::LowColorWithAlpha | PixelFormat::AlphaOnly
        )
    }

    /// Short name used on the command line and in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            PixelFormat::FullColorWithAlpha => "argb8888",
            PixelFormat::FullColorNoAlpha => "rgbx8888",
            PixelFormat::LowColorNoAlpha => "rgb565",
            PixelFormat::LowColorWithAlpha => "argb4444",
            PixelFormat::AlphaOnly => "alpha8",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PixelFormat::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown pixel format '{}' (expected argb8888, rgbx8888, rgb565, argb4444 or alpha8)",
                    s
                )
            })
    }
}

// =============================================================================
// Pixel Buffer
// =============================================================================

/// Owned decoded pixels plus their dimensions and layout.
///
/// Rows are tightly packed (`width * bytes_per_pixel` bytes per row, no
/// padding). Multi-byte packed formats are stored little-endian.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    dimensions: Dimensions,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw pixel data.
    ///
    /// Returns `None` if `data` does not hold exactly
    /// `width * height * bytes_per_pixel` bytes.
    pub fn new(dimensions: Dimensions, format: PixelFormat, data: Vec<u8>) -> Option<Self> {
        let expected = byte_size_of(dimensions, format);
        if data.len() as u64 != expected {
            return None;
        }
        Some(Self {
            dimensions,
            format,
            data,
        })
    }

    /// Pack an RGBA image into the requested format.
    ///
    /// Packing happens in place inside the image's own allocation, so only
    /// one full-size copy of the pixels exists at any time.
    pub fn from_rgba(image: RgbaImage, format: PixelFormat) -> Self {
        let dimensions = Dimensions::new(image.width(), image.height());
        let bpp = format.bytes_per_pixel() as usize;
        let mut data = image.into_raw();
        let pixels = data.len() / 4;

        if format != PixelFormat::FullColorWithAlpha {
            // Pixel i is written at i * bpp <= i * 4, after it has been read.
            for i in 0..pixels {
                let src = i * 4;
                let [r, g, b, a] = [data[src], data[src + 1], data[src + 2], data[src + 3]];
                let dst = i * bpp;

                match format {
                    PixelFormat::FullColorWithAlpha => {}
                    PixelFormat::FullColorNoAlpha => data[dst + 3] = 0xFF,
                    PixelFormat::LowColorNoAlpha => {
                        let packed = (u16::from(r >> 3) << 11) | (u16::from(g >> 2) << 5) | u16::from(b >> 3);
                        data[dst..dst + 2].copy_from_slice(&packed.to_le_bytes());
                    }
                    PixelFormat::LowColorWithAlpha => {
                        let packed = (u16::from(a >> 4) << 12)
                            | (u16::from(r >> 4) << 8)
                            | (u16::from(g >> 4) << 4)
                            | u16::from(b >> 4);
                        data[dst..dst + 2].copy_from_slice(&packed.to_le_bytes());
                    }
                    PixelFormat::AlphaOnly => data[dst] = a,
                }
            }

            data.truncate(pixels * bpp);
            data.shrink_to_fit();
        }

        Self {
            dimensions,
            format,
            data,
        }
    }

    /// Expand the buffer back to 8-bit RGBA.
    ///
    /// `AlphaOnly` expands to black with the stored alpha.
    pub fn to_rgba(&self) -> RgbaImage {
        let Dimensions { width, height } = self.dimensions;
        let mut out = Vec::with_capacity(self.dimensions.pixel_count() as usize * 4);

        match self.format {
            PixelFormat::FullColorWithAlpha => out.extend_from_slice(&self.data),
            PixelFormat::FullColorNoAlpha => {
                for px in self.data.chunks_exact(4) {
                    out.extend_from_slice(&[px[0], px[1], px[2], 0xFF]);
                }
            }
            PixelFormat::LowColorNoAlpha => {
                for px in self.data.chunks_exact(2) {
                    let v = u16::from_le_bytes([px[0], px[1]]);
                    let r5 = (v >> 11) as u8 & 0x1F;
                    let g6 = (v >> 5) as u8 & 0x3F;
                    let b5 = v as u8 & 0x1F;
                    out.extend_from_slice(&[
                        (r5 << 3) | (r5 >> 2),
                        (g6 << 2) | (g6 >> 4),
                        (b5 << 3) | (b5 >> 2),
                        0xFF,
                    ]);
                }
            }
            PixelFormat::LowColorWithAlpha => {
                for px in self.data.chunks_exact(2) {
                    let v = u16::from_le_bytes([px[0], px[1]]);
                    let nibble = |shift: u16| ((v >> shift) & 0x0F) as u8 * 17;
                    out.extend_from_slice(&[nibble(8), nibble(4), nibble(0), nibble(12)]);
                }
            }
            PixelFormat::AlphaOnly => {
                for &a in &self.data {
                    out.extend_from_slice(&[0, 0, 0, a]);
                }
            }
        }

        // Length always matches width * height * 4 by construction.
        RgbaImage::from_raw(width, height, out).unwrap_or_else(|| RgbaImage::new(width, height))
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw pixel bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Memory footprint: `width * height * bytes_per_pixel`.
    pub fn byte_size(&self) -> u64 {
        byte_size_of(self.dimensions, self.format)
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("dimensions", &self.dimensions)
            .field("format", &self.format)
            .field("byte_size", &self.byte_size())
            .finish()
    }
}

fn byte_size_of(dimensions: Dimensions, format: PixelFormat) -> u64 {
    dimensions.pixel_count() * u64::from(format.bytes_per_pixel())
}

// =============================================================================
// Tests
// =============================================================================
