//! Helpers for building synthetic PDF fixtures in tests.

use lopdf::{dictionary, Dictionary, Document, Object, Stream};

/// Encode a gradient RGB image as a JPEG payload.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut data = Vec::new();
    let encoder = jpeg_encoder::Encoder::new(&mut data, 95);
    encoder
        .encode(
            img.as_raw(),
            width as u16,
            height as u16,
            jpeg_encoder::ColorType::Rgb,
        )
        .unwrap();
    data
}

/// Build an image XObject stream with the usual entries.
pub fn image_stream(data: Vec<u8>, width: u32, height: u32, filter: &str) -> Stream {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
    dict.set("Length", Object::Integer(data.len() as i64));
    Stream::new(dict, data)
}

/// Build a one-page document whose page references the given image stream
/// as `Im0`.
pub fn document_with_image(stream: Stream) -> Document {
    let mut doc = Document::with_version("1.5");
    let image_id = doc.add_object(Object::Stream(stream));

    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => Object::Reference(image_id) },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", catalog_id);

    doc
}
