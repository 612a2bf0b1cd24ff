use thiserror::Error;

/// Errors that can occur when probing or decoding an encoded image
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The source handle does not resolve to readable bytes
    #[error("Image source not found: {0}")]
    NotFound(String),

    /// The bytes could not be parsed as a supported encoded format
    #[error("Unreadable image: {0}")]
    Unreadable(String),

    /// Decoding succeeded but produced a 0x0 image
    #[error("Decoded image is empty")]
    EmptyResult,

    /// The source would exceed the configured decode allocation limit
    #[error("Decode limit exceeded: {0}")]
    LimitExceeded(String),
}

/// Errors that can occur when re-encoding a pixel buffer
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The requested output format cannot represent this buffer, or is unknown
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// Writing the encoded bytes to the sink failed
    #[error("I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),
}

impl From<image::ImageError> for DecodeError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Limits(e) => DecodeError::LimitExceeded(e.to_string()),
            image::ImageError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                DecodeError::NotFound(e.to_string())
            }
            other => DecodeError::Unreadable(other.to_string()),
        }
    }
}

impl From<jpeg_decoder::Error> for DecodeError {
    fn from(err: jpeg_decoder::Error) -> Self {
        DecodeError::Unreadable(err.to_string())
    }
}

impl From<image::ImageError> for EncodeError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => EncodeError::IoFailure(e),
            image::ImageError::Unsupported(e) => EncodeError::UnsupportedFormat(e.to_string()),
            other => EncodeError::UnsupportedFormat(other.to_string()),
        }
    }
}
