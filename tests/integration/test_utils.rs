//! Test utilities for integration tests.
//!
//! Fixture images are generated in memory with the `image` encoders, and a
//! tracking storage records how often sources are opened.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};

use raster_cache::{Dimensions, PixelBuffer, PixelFormat, Storage};

// =============================================================================
// Fixture Images
// =============================================================================

/// Create a PNG with a horizontal gradient and varying alpha.
pub fn create_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 0x55, (255 - (x % 128)) as u8])
    });

    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
    buf
}

/// Create a baseline JPEG with a checkerboard pattern.
pub fn create_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgb([220, 40, 40])
        } else {
            Rgb([40, 40, 220])
        }
    });

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90)
        .encode_image(&img)
        .unwrap();
    buf
}

/// A pixel buffer of `width` x `height` in `format`, zero-filled.
pub fn blank_buffer(width: u32, height: u32, format: PixelFormat) -> PixelBuffer {
    let len = (width * height * format.bytes_per_pixel()) as usize;
    PixelBuffer::new(Dimensions::new(width, height), format, vec![0; len]).unwrap()
}

/// Check JPEG SOI/EOI markers.
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 4
        && data[0] == 0xFF
        && data[1] == 0xD8
        && data[data.len() - 2] == 0xFF
        && data[data.len() - 1] == 0xD9
}

// =============================================================================
// Tracking Storage
// =============================================================================

/// In-memory storage that counts reads and keeps written files.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    reads: Arc<AtomicUsize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        self.files.lock().unwrap().insert(path.into(), data);
        self
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl Storage for MemoryStorage {
    fn open_for_read(&self, path: &Path) -> std::io::Result<Box<dyn Read + Send>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let files = self.files.lock().unwrap();
        let data = files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, path.display().to_string())
        })?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn open_for_write(&self, path: &Path) -> std::io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(MemoryFile {
            path: path.to_path_buf(),
            data: Vec::new(),
            files: Arc::clone(&self.files),
        }))
    }
}

struct MemoryFile {
    path: PathBuf,
    data: Vec<u8>,
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(self.path.clone(), self.data.clone());
        Ok(())
    }
}
