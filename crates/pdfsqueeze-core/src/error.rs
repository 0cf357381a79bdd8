//! Error types for the pdfsqueeze-core library.

use thiserror::Error;

/// Main error type for the pdfsqueeze library.
///
/// Only document-level failures reach this type: image-level failures are
/// represented by [`ExtractError`] and are consumed where they occur.
#[derive(Error, Debug)]
pub enum SqueezeError {
    /// Document-level PDF error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that are fatal for a single document.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to open PDF: {0}")]
    Open(String),

    /// Failed to serialize the rewritten document.
    #[error("failed to serialize PDF: {0}")]
    Serialize(String),
}

/// Errors scoped to a single embedded image.
///
/// These form a closed set: each variant has its own recovery path in the
/// rewriter and none of them escalates past the current image.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The payload is not a raster format the decoder supports.
    #[error("payload is not a supported raster format: {0}")]
    Decode(String),

    /// The stream's filter chain cannot be decoded into raw bytes.
    #[error("unfilterable stream encoding: {0}")]
    Unfilterable(String),

    /// The image uses parameters outside the supported range.
    #[error("unsupported image parameters: {0}")]
    Unsupported(String),
}

/// Result type for the pdfsqueeze library.
pub type Result<T> = std::result::Result<T, SqueezeError>;
