//! Sample-size planning.
//!
//! Chooses an integral downsample factor so a decode stays close to the
//! requested bounding box without ever upsampling.

use std::fmt;

use super::buffer::Dimensions;

/// Integral per-axis downsample factor, always at least 1.
///
/// A factor of `N` keeps one of every `N` pixels on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleFactor(u32);

impl SampleFactor {
    /// No downsampling.
    pub const ONE: SampleFactor = SampleFactor(1);

    /// Create a factor, returning `None` for zero.
    pub const fn new(factor: u32) -> Option<Self> {
        if factor == 0 {
            None
        } else {
            Some(SampleFactor(factor))
        }
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Dimensions produced by decoding `source` at this factor.
    ///
    /// Each axis is `floor(dim / factor)`, but never less than one pixel for a
    /// non-empty source.
    pub fn apply(self, source: Dimensions) -> Dimensions {
        let scale = |dim: u32| {
            if dim == 0 {
                0
            } else {
                (dim / self.0).max(1)
            }
        };
        Dimensions::new(scale(source.width), scale(source.height))
    }
}

impl Default for SampleFactor {
    fn default() -> Self {
        SampleFactor::ONE
    }
}

impl fmt::Display for SampleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "1/{}", self.0)
    }
}

/// Compute the downsample factor for decoding `source` into a
/// `req_width` x `req_height` box.
///
/// Returns 1 when the source already fits. Otherwise the axis with the larger
/// source-to-request ratio decides, with ties going to the width, and the
/// factor is that ratio rounded to the nearest integer (halves round up).
///
/// A zero request on either axis is treated as 1.
pub fn plan(source: Dimensions, req_width: u32, req_height: u32) -> SampleFactor {
    let req_width = req_width.max(1);
    let req_height = req_height.max(1);

    if source.fits_within(req_width, req_height) {
        return SampleFactor::ONE;
    }

    let (width, height) = (u64::from(source.width), u64::from(source.height));
    let (req_width, req_height) = (u64::from(req_width), u64::from(req_height));

    // width / req_width >= height / req_height, cross-multiplied.
    let (src, req) = if width * req_height >= height * req_width {
        (width, req_width)
    } else {
        (height, req_height)
    };

    let rounded = (src + req / 2) / req;
    let factor = rounded.clamp(1, u64::from(u32::MAX)) as u32;
    SampleFactor(factor)
}

// =============================================================================
// Tests
// =============================================================================
