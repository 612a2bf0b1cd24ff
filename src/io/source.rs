use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tracing::trace;

use crate::error::DecodeError;

// =============================================================================
// Image Source
// =============================================================================

/// Opaque handle to encoded image bytes.
///
/// A source is immutable once created and is expected to outlive any single
/// decode call made against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A path readable through the host [`Storage`]
    Path(PathBuf),

    /// Encoded bytes already held in memory
    Bytes(Bytes),

    /// A host-specific resource identifier, resolved by a [`ResourceResolver`]
    Resource(String),
}

impl ImageSource {
    /// Create a source from a storage path.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        ImageSource::Path(path.into())
    }

    /// Create a source from in-memory encoded bytes.
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        ImageSource::Bytes(data.into())
    }

    /// Create a source from a resource identifier.
    pub fn resource(id: impl Into<String>) -> Self {
        ImageSource::Resource(id.into())
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Path(path) => write!(f, "file://{}", path.display()),
            ImageSource::Bytes(data) => write!(f, "memory://{} bytes", data.len()),
            ImageSource::Resource(id) => write!(f, "resource://{}", id),
        }
    }
}

// =============================================================================
// Storage Capability
// =============================================================================

/// Storage access supplied by the host environment.
///
/// Implementations must be thread-safe; decode calls on different sources may
/// run concurrently and share the same storage.
pub trait Storage: Send + Sync {
    /// Open a byte stream for reading.
    fn open_for_read(&self, path: &Path) -> std::io::Result<Box<dyn Read + Send>>;

    /// Open a byte sink for writing, replacing any existing content.
    fn open_for_write(&self, path: &Path) -> std::io::Result<Box<dyn Write + Send>>;

    /// Write `data` to `path` and flush it.
    fn write_bytes(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut sink = self.open_for_write(path)?;
        sink.write_all(data)?;
        sink.flush()
    }
}

/// [`Storage`] backed by the local filesystem.
///
/// Parent directories are created on write.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl Storage for FsStorage {
    fn open_for_read(&self, path: &Path) -> std::io::Result<Box<dyn Read + Send>> {
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn open_for_write(&self, path: &Path) -> std::io::Result<Box<dyn Write + Send>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

// =============================================================================
// Resource Resolution
// =============================================================================

/// Maps host-specific resource identifiers to image sources.
pub trait ResourceResolver: Send + Sync {
    /// Resolve `id`, returning `None` if the identifier is unknown.
    fn resolve(&self, id: &str) -> Option<ImageSource>;
}

/// A fixed table of resource identifiers.
#[derive(Debug, Clone, Default)]
pub struct ResourceMap {
    entries: HashMap<String, ImageSource>,
}

impl ResourceMap {
    /// Create an empty resource table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource, builder style.
    pub fn with(mut self, id: impl Into<String>, source: ImageSource) -> Self {
        self.insert(id, source);
        self
    }

    /// Register a resource, replacing any previous mapping.
    pub fn insert(&mut self, id: impl Into<String>, source: ImageSource) {
        self.entries.insert(id.into(), source);
    }
}

impl ResourceResolver for ResourceMap {
    fn resolve(&self, id: &str) -> Option<ImageSource> {
        self.entries.get(id).cloned()
    }
}

// =============================================================================
// Source Reader
// =============================================================================

/// Turns an [`ImageSource`] into encoded bytes.
#[derive(Clone)]
pub struct SourceReader {
    storage: Arc<dyn Storage>,
    resolver: Option<Arc<dyn ResourceResolver>>,
}

impl SourceReader {
    /// Create a reader over the given storage, without resource resolution.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            resolver: None,
        }
    }

    /// Attach a resource resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn ResourceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Read all encoded bytes behind `source`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::NotFound`] if the path cannot be opened or read,
    /// or if a resource identifier is unknown. A resource resolving to another
    /// resource identifier is also treated as not found.
    pub fn read(&self, source: &ImageSource) -> Result<Bytes, DecodeError> {
        match source {
            ImageSource::Bytes(data) => Ok(data.clone()),
            ImageSource::Path(path) => self.read_path(path),
            ImageSource::Resource(id) => {
                let resolved = self
                    .resolver
                    .as_ref()
                    .and_then(|resolver| resolver.resolve(id))
                    .ok_or_else(|| DecodeError::NotFound(format!("resource://{}", id)))?;

                match resolved {
                    ImageSource::Resource(_) => {
                        Err(DecodeError::NotFound(format!("resource://{}", id)))
                    }
                    other => self.read(&other),
                }
            }
        }
    }

    fn read_path(&self, path: &Path) -> Result<Bytes, DecodeError> {
        let not_found =
            |e: std::io::Error| DecodeError::NotFound(format!("{}: {}", path.display(), e));

        let mut stream = self.storage.open_for_read(path).map_err(not_found)?;
        let mut data = Vec::new();
        stream.read_to_end(&mut data).map_err(not_found)?;

        trace!(path = %path.display(), bytes = data.len(), "read image source");
        Ok(Bytes::from(data))
    }
}

impl fmt::Debug for SourceReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceReader")
            .field("resolver", &self.resolver.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for SourceReader {
    fn default() -> Self {
        Self::new(Arc::new(FsStorage))
    }
}

// =============================================================================
// Tests
// =============================================================================
