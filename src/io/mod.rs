//! Source access layer.
//!
//! The decoder never opens files itself. It goes through a [`Storage`]
//! capability supplied by the host, and resource identifiers are mapped to
//! concrete sources through a [`ResourceResolver`]:
//!
//! ```text
//! ImageSource ──► SourceReader ──► Storage::open_for_read ──► Bytes
//!      │                ▲
//!      └─ Resource(id) ─┘ (via ResourceResolver)
//! ```

mod source;

pub use source::{FsStorage, ImageSource, ResourceMap, ResourceResolver, SourceReader, Storage};
