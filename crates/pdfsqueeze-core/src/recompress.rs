//! Raster image recompression.

use image::DynamicImage;
use jpeg_encoder::{ColorType, Encoder, SamplingFactor};
use tracing::debug;

use crate::error::ExtractError;

/// Recompresses a raster payload into a bounded-size JPEG.
pub struct ImageRecompressor {
    /// Maximum pixel dimension (longer side) of the output.
    max_dimension: u32,
    /// JPEG quality (1-100).
    quality: u8,
}

/// A re-encoded image payload with its pixel dimensions.
#[derive(Debug, Clone)]
pub struct RecompressedImage {
    /// JPEG bytes.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageRecompressor {
    pub fn new(max_dimension: u32, quality: u8) -> Self {
        Self {
            max_dimension,
            quality,
        }
    }

    /// Decode a raster payload, downsample it if oversized, and re-encode it
    /// as JPEG.
    ///
    /// The payload is returned unconditionally; callers decide whether the
    /// result is worth keeping by comparing sizes against the stored bytes.
    pub fn recompress(&self, payload: &[u8]) -> Result<RecompressedImage, ExtractError> {
        let img = image::load_from_memory(payload)
            .map_err(|e| ExtractError::Decode(e.to_string()))?;
        self.recompress_decoded(img)
    }

    /// Re-encode an already decoded pixel buffer.
    ///
    /// Used directly by the rewriter for streams that carry raw samples
    /// rather than an encoded raster payload.
    pub fn recompress_decoded(
        &self,
        img: DynamicImage,
    ) -> Result<RecompressedImage, ExtractError> {
        let (orig_width, orig_height) = (img.width(), img.height());
        let (new_width, new_height) =
            resize_dimensions(orig_width, orig_height, self.max_dimension);

        let img = if (new_width, new_height) != (orig_width, orig_height) {
            debug!(
                "resizing image {}x{} -> {}x{}",
                orig_width, orig_height, new_width, new_height
            );
            img.resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3)
        } else {
            img
        };

        // Alpha is discarded here, not composited against a background.
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width > u16::MAX as u32 || height > u16::MAX as u32 {
            return Err(ExtractError::Unsupported(format!(
                "image too large for JPEG: {}x{}",
                width, height
            )));
        }

        let mut data = Vec::new();
        let mut encoder = Encoder::new(&mut data, self.quality);
        encoder.set_sampling_factor(SamplingFactor::R_4_2_0);
        encoder
            .encode(rgb.as_raw(), width as u16, height as u16, ColorType::Rgb)
            .map_err(|e| ExtractError::Unsupported(e.to_string()))?;

        Ok(RecompressedImage {
            data,
            width,
            height,
        })
    }
}

/// Target dimensions so the longer side equals `max_dimension`, aspect ratio
/// preserved, rounded to the nearest pixel and clamped to at least 1.
fn resize_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dim = width.max(height);
    if max_dim <= max_dimension {
        return (width, height);
    }

    let scale = max_dimension as f32 / max_dim as f32;
    let new_width = ((width as f32 * scale).round() as u32).max(1);
    let new_height = ((height as f32 * scale).round() as u32).max(1);

    (new_width, new_height)
}
