//! Core library for batch PDF compression.
//!
//! This crate provides:
//! - per-image recompression (decode, downsample, JPEG re-encode)
//! - in-place document rewriting with object-stream compaction
//! - a ghostscript whole-document strategy run as an external process
//! - orchestration that commits the smallest valid candidate
//! - batch processing with per-file failure bookkeeping

pub mod batch;
pub mod error;
pub mod ghostscript;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod recompress;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::BatchRunner;
pub use error::{ExtractError, PdfError, Result, SqueezeError};
pub use ghostscript::GhostscriptCompressor;
pub use models::config::{CompressionOptions, GsPreset};
pub use models::report::{BatchOutcome, ErrorLog, FileResult, ERROR_LOG_NAME};
pub use pdf::{ImageRewriter, RewriteStats};
pub use pipeline::{CompressionOrchestrator, CompressionOutcome, Strategy};
pub use recompress::{ImageRecompressor, RecompressedImage};
