//! In-place image rewriting over the lopdf object model.

use std::collections::HashSet;
use std::path::Path;

use image::DynamicImage;
use lopdf::{Dictionary, Document, Object, ObjectId, SaveOptions, Stream};
use tracing::{debug, trace, warn};

use crate::error::{ExtractError, PdfError};
use crate::models::config::CompressionOptions;
use crate::recompress::{ImageRecompressor, RecompressedImage};

/// What an image stream's filter chain says about its payload.
///
/// Decided before any bytes are touched; each kind has its own handling
/// path in the rewriter.
enum PayloadKind {
    /// The raw stream bytes are a JPEG payload.
    Dct,
    /// Raw pixel samples, stored plain or Flate-compressed.
    RawPixels,
    /// A filter chain the extraction layer cannot decode.
    Unfilterable(String),
}

/// What happened to a single image.
enum ImageAction {
    Replaced { from: usize, to: usize },
    QualityHint,
    Unchanged,
}

/// Rewrites every compressible image in a document, then serializes it with
/// object-stream compaction.
pub struct ImageRewriter {
    options: CompressionOptions,
}

/// Counters describing what a rewrite pass did.
#[derive(Debug, Default, Clone, Copy)]
pub struct RewriteStats {
    /// Distinct image references visited across all pages.
    pub images_seen: usize,
    /// Images whose payload was replaced with a smaller JPEG.
    pub images_replaced: usize,
    /// Streams that received the quality-hint fallback.
    pub quality_hints: usize,
}

impl ImageRewriter {
    pub fn new(options: CompressionOptions) -> Self {
        Self { options }
    }

    /// Rewrite `input` into `output`.
    ///
    /// Per-image failures are logged and skipped; the document is always
    /// serialized with compaction, whether or not any image changed. Only an
    /// unopenable input or a failed serialize is fatal.
    pub fn rewrite(&self, input: &Path, output: &Path) -> Result<RewriteStats, PdfError> {
        let mut doc = Document::load(input).map_err(|e| PdfError::Open(e.to_string()))?;

        let recompressor =
            ImageRecompressor::new(self.options.max_dimension, self.options.jpeg_quality);
        let mut stats = RewriteStats::default();

        for (page_num, page_id) in doc.get_pages() {
            for (name, image_id) in page_images(&doc, page_id) {
                stats.images_seen += 1;
                match self.process_image(&mut doc, image_id, &recompressor) {
                    Ok(ImageAction::Replaced { from, to }) => {
                        stats.images_replaced += 1;
                        debug!(
                            "compressed image {} on page {}: {:.2}KB -> {:.2}KB",
                            name,
                            page_num,
                            from as f64 / 1024.0,
                            to as f64 / 1024.0
                        );
                    }
                    Ok(ImageAction::QualityHint) => {
                        stats.quality_hints += 1;
                        debug!("applied quality hint to image {} on page {}", name, page_num);
                    }
                    Ok(ImageAction::Unchanged) => {}
                    Err(ExtractError::Decode(reason)) => {
                        debug!("skipping image {} on page {}: {}", name, page_num, reason);
                    }
                    Err(ExtractError::Unfilterable(reason)) => {
                        debug!(
                            "no fallback for image {} on page {}: {}",
                            name, page_num, reason
                        );
                    }
                    Err(ExtractError::Unsupported(reason)) => {
                        warn!(
                            "failed to compress image {} on page {}: {}",
                            name, page_num, reason
                        );
                    }
                }
            }
        }

        // Container-level savings are attempted even when no image changed.
        doc.compress();
        let save_options = SaveOptions::builder()
            .use_object_streams(true)
            .use_xref_streams(true)
            .build();
        let mut file =
            std::fs::File::create(output).map_err(|e| PdfError::Serialize(e.to_string()))?;
        doc.save_with_options(&mut file, save_options)
            .map_err(|e| PdfError::Serialize(e.to_string()))?;

        Ok(stats)
    }

    fn process_image(
        &self,
        doc: &mut Document,
        id: ObjectId,
        recompressor: &ImageRecompressor,
    ) -> Result<ImageAction, ExtractError> {
        let stream = match doc.get_object(id) {
            Ok(Object::Stream(s)) => s.clone(),
            _ => return Ok(ImageAction::Unchanged),
        };
        let stored_len = stream.content.len();

        match classify_payload(&stream) {
            PayloadKind::Dct => {
                let new = recompressor.recompress(&stream.content)?;
                self.commit_if_smaller(doc, id, stored_len, new)
            }
            PayloadKind::RawPixels => {
                let img = decode_raw_pixels(doc, &stream)?;
                let new = recompressor.recompress_decoded(img)?;
                self.commit_if_smaller(doc, id, stored_len, new)
            }
            PayloadKind::Unfilterable(chain) => self.apply_quality_hint(doc, id, &chain),
        }
    }

    fn commit_if_smaller(
        &self,
        doc: &mut Document,
        id: ObjectId,
        stored_len: usize,
        new: RecompressedImage,
    ) -> Result<ImageAction, ExtractError> {
        if new.data.len() >= stored_len {
            trace!(
                "recompressed payload is {} bytes vs {} stored, keeping original",
                new.data.len(),
                stored_len
            );
            return Ok(ImageAction::Unchanged);
        }

        let to = new.data.len();
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(new.width as i64));
        dict.set("Height", Object::Integer(new.height as i64));
        dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        dict.set("BitsPerComponent", Object::Integer(8));
        dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
        dict.set("Length", Object::Integer(new.data.len() as i64));
        doc.objects.insert(id, Object::Stream(Stream::new(dict, new.data)));

        Ok(ImageAction::Replaced {
            from: stored_len,
            to,
        })
    }

    /// Narrow fallback for streams we cannot decode: if the chain already
    /// names DCTDecode and no decode parameters are set, attach a quality
    /// hint without touching the payload bytes.
    fn apply_quality_hint(
        &self,
        doc: &mut Document,
        id: ObjectId,
        chain: &str,
    ) -> Result<ImageAction, ExtractError> {
        let stream = match doc.objects.get_mut(&id) {
            Some(Object::Stream(s)) => s,
            _ => return Err(ExtractError::Unfilterable(chain.to_string())),
        };

        let names_dct = filter_names(&stream.dict).iter().any(|f| f == "DCTDecode");
        if names_dct && stream.dict.get(b"DecodeParms").is_err() {
            let mut parms = Dictionary::new();
            parms.set("Quality", Object::Integer(self.options.jpeg_quality as i64));
            stream.dict.set("DecodeParms", Object::Dictionary(parms));
            Ok(ImageAction::QualityHint)
        } else {
            Err(ExtractError::Unfilterable(chain.to_string()))
        }
    }
}

/// Distinct image XObjects referenced by a page's resources, with the names
/// they are registered under.
fn page_images(doc: &Document, page_id: ObjectId) -> Vec<(String, ObjectId)> {
    let mut images = Vec::new();
    let mut seen: HashSet<ObjectId> = HashSet::new();

    let resources = match page_resources(doc, page_id) {
        Some(r) => r,
        None => return images,
    };

    if let Ok(xobjects) = resources.get(b"XObject") {
        if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
            for (name, obj_ref) in xobj_dict.iter() {
                let id = match obj_ref {
                    Object::Reference(id) => *id,
                    _ => continue,
                };
                if !seen.insert(id) {
                    continue;
                }
                if let Ok(Object::Stream(stream)) = doc.get_object(id) {
                    let is_image = stream
                        .dict
                        .get(b"Subtype")
                        .ok()
                        .and_then(|s| s.as_name().ok())
                        .map(|n| n == b"Image")
                        .unwrap_or(false);
                    if is_image {
                        images.push((String::from_utf8_lossy(name).to_string(), id));
                    }
                }
            }
        }
    }

    images
}

/// Resources dictionary for a page, handling inheritance via Parent links.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let page = doc.get_object(page_id).ok()?;
    if let Object::Dictionary(dict) = page {
        if let Ok(resources) = dict.get(b"Resources") {
            if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
                return Some(res_dict.clone());
            }
        }

        if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent") {
            return inherited_resources(doc, *parent_id);
        }
    }
    None
}

fn inherited_resources(doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
    let node = doc.get_object(node_id).ok()?;
    if let Object::Dictionary(dict) = node {
        if let Ok(resources) = dict.get(b"Resources") {
            if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
                return Some(res_dict.clone());
            }
        }

        if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent") {
            return inherited_resources(doc, *parent_id);
        }
    }
    None
}

/// Filter names of a stream, in chain order.
fn filter_names(dict: &Dictionary) -> Vec<String> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![String::from_utf8_lossy(name).to_string()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .collect(),
        _ => Vec::new(),
    }
}

fn classify_payload(stream: &Stream) -> PayloadKind {
    let filters = filter_names(&stream.dict);
    match filters.as_slice() {
        [] => PayloadKind::RawPixels,
        [single] if single == "DCTDecode" => PayloadKind::Dct,
        [single] if single == "FlateDecode" => PayloadKind::RawPixels,
        other => PayloadKind::Unfilterable(other.join("+")),
    }
}

/// Reconstruct a pixel buffer from a raw-sample image stream.
///
/// Only 8-bit DeviceRGB and DeviceGray samples are supported; everything
/// else is reported as unsupported and skipped by the caller.
fn decode_raw_pixels(doc: &Document, stream: &Stream) -> Result<DynamicImage, ExtractError> {
    let dict = &stream.dict;

    let width = dict
        .get(b"Width")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0) as u32;
    let height = dict
        .get(b"Height")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0) as u32;
    if width == 0 || height == 0 {
        return Err(ExtractError::Unsupported("missing image dimensions".to_string()));
    }

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        return Err(ExtractError::Unsupported(format!(
            "{} bits per component",
            bits
        )));
    }

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.clone()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok().map(<[u8]>::to_vec)),
            Object::Reference(r) => doc
                .get_object(*r)
                .ok()
                .and_then(|o| o.as_name().ok().map(<[u8]>::to_vec)),
            _ => None,
        })
        .unwrap_or_else(|| b"DeviceRGB".to_vec());

    let data = if filter_names(dict).is_empty() {
        stream.content.clone()
    } else {
        stream
            .decompressed_content()
            .map_err(|e| ExtractError::Unfilterable(e.to_string()))?
    };

    let pixels = width as usize * height as usize;
    match color_space.as_slice() {
        b"DeviceRGB" | b"CalRGB" => {
            let expected = pixels * 3;
            if data.len() < expected {
                return Err(ExtractError::Unsupported("RGB sample data too short".to_string()));
            }
            image::RgbImage::from_raw(width, height, data[..expected].to_vec())
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| {
                    ExtractError::Unsupported("RGB buffer construction failed".to_string())
                })
        }
        b"DeviceGray" | b"CalGray" => {
            if data.len() < pixels {
                return Err(ExtractError::Unsupported(
                    "grayscale sample data too short".to_string(),
                ));
            }
            image::GrayImage::from_raw(width, height, data[..pixels].to_vec())
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| {
                    ExtractError::Unsupported("grayscale buffer construction failed".to_string())
                })
        }
        other => Err(ExtractError::Unsupported(format!(
            "color space {}",
            String::from_utf8_lossy(other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{document_with_image, image_stream, jpeg_bytes};
    use pretty_assertions::assert_eq;

    fn find_image<'a>(doc: &'a Document) -> &'a Stream {
        doc.objects
            .values()
            .find_map(|o| match o {
                Object::Stream(s)
                    if s.dict
                        .get(b"Subtype")
                        .ok()
                        .and_then(|n| n.as_name().ok())
                        .map(|n| n == b"Image")
                        .unwrap_or(false) =>
                {
                    Some(s)
                }
                _ => None,
            })
            .expect("no image stream in document")
    }

    fn rewriter(max_dimension: u32) -> ImageRewriter {
        ImageRewriter::new(CompressionOptions {
            max_dimension,
            use_ghostscript: false,
            ..CompressionOptions::default()
        })
    }

    #[test]
    fn oversized_jpeg_is_downsampled_and_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.pdf");
        let output = dir.path().join("output.pdf");

        let mut doc =
            document_with_image(image_stream(jpeg_bytes(1600, 1200), 1600, 1200, "DCTDecode"));
        doc.save(&input).unwrap();

        let stats = rewriter(640).rewrite(&input, &output).unwrap();
        assert_eq!(stats.images_seen, 1);
        assert_eq!(stats.images_replaced, 1);
        assert_eq!(stats.quality_hints, 0);

        let rewritten = Document::load(&output).unwrap();
        let stream = find_image(&rewritten);
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 640);
        assert_eq!(stream.dict.get(b"Height").unwrap().as_i64().unwrap(), 480);
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"DCTDecode"
        );
    }

    #[test]
    fn undecodable_image_is_left_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.pdf");
        let output = dir.path().join("output.pdf");

        let payload = b"not really a jpeg".to_vec();
        let mut doc = document_with_image(image_stream(payload.clone(), 8, 8, "DCTDecode"));
        doc.save(&input).unwrap();

        let stats = rewriter(1024).rewrite(&input, &output).unwrap();
        assert_eq!(stats.images_seen, 1);
        assert_eq!(stats.images_replaced, 0);

        let rewritten = Document::load(&output).unwrap();
        assert_eq!(find_image(&rewritten).content, payload);
    }

    #[test]
    fn raw_rgb_samples_are_reencoded_as_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.pdf");
        let output = dir.path().join("output.pdf");

        let img = image::RgbImage::from_fn(400, 300, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 7])
        });
        let mut stream = image_stream(img.into_raw(), 400, 300, "DCTDecode");
        stream.dict.remove(b"Filter");
        let mut doc = document_with_image(stream);
        doc.save(&input).unwrap();

        let stats = rewriter(1024).rewrite(&input, &output).unwrap();
        assert_eq!(stats.images_replaced, 1);

        let rewritten = Document::load(&output).unwrap();
        let stream = find_image(&rewritten);
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"DCTDecode"
        );
        assert_eq!(&stream.content[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn unfilterable_dct_chain_gets_a_quality_hint() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.pdf");
        let output = dir.path().join("output.pdf");

        let payload = b"opaque dct-ish bytes".to_vec();
        let mut stream = image_stream(payload.clone(), 8, 8, "DCTDecode");
        stream.dict.set(
            "Filter",
            Object::Array(vec![
                Object::Name(b"FlateDecode".to_vec()),
                Object::Name(b"DCTDecode".to_vec()),
            ]),
        );
        let mut doc = document_with_image(stream);
        doc.save(&input).unwrap();

        let stats = rewriter(1024).rewrite(&input, &output).unwrap();
        assert_eq!(stats.images_replaced, 0);
        assert_eq!(stats.quality_hints, 1);

        let rewritten = Document::load(&output).unwrap();
        let stream = find_image(&rewritten);
        assert_eq!(stream.content, payload);
        let parms = match stream.dict.get(b"DecodeParms").unwrap() {
            Object::Dictionary(d) => d,
            other => panic!("expected DecodeParms dictionary, got {:?}", other),
        };
        assert_eq!(parms.get(b"Quality").unwrap().as_i64().unwrap(), 85);
    }

    #[test]
    fn unfilterable_chain_without_dct_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.pdf");
        let output = dir.path().join("output.pdf");

        let payload = vec![0u8; 64];
        let mut doc = document_with_image(image_stream(payload.clone(), 8, 8, "JPXDecode"));
        doc.save(&input).unwrap();

        let stats = rewriter(1024).rewrite(&input, &output).unwrap();
        assert_eq!(stats.images_replaced, 0);
        assert_eq!(stats.quality_hints, 0);

        let rewritten = Document::load(&output).unwrap();
        let stream = find_image(&rewritten);
        assert_eq!(stream.content, payload);
        assert!(stream.dict.get(b"DecodeParms").is_err());
    }

    #[test]
    fn unopenable_document_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.pdf");
        let output = dir.path().join("output.pdf");
        std::fs::write(&input, b"not a pdf at all").unwrap();

        let err = rewriter(1024).rewrite(&input, &output).unwrap_err();
        assert!(matches!(err, PdfError::Open(_)));
        assert!(!output.exists());
    }
}
