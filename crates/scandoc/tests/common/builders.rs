//! Builder patterns for creating test PDFs programmatically.
//!
//! Images are uniform gray squares. The shade identifies the image so a
//! fake recognizer can map it back to text.

#![allow(dead_code)]

use std::io::Cursor;

use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// Side length of every fixture image, in pixels.
pub const IMAGE_SIZE: u32 = 16;

/// One image to embed on a page.
#[derive(Debug, Clone, Copy)]
pub enum ImageFixture {
    /// Raw 8-bit DeviceGray samples, no filter.
    RawGray(u8),
    /// Baseline JPEG, stored with DCTDecode.
    Jpeg(u8),
    /// DeviceCMYK samples, which no recognizer can decode.
    Cmyk,
}

/// Builder for multi-page PDFs whose pages carry only images.
pub struct PdfBuilder {
    pages: Vec<Vec<ImageFixture>>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self { pages: Vec::new() }
    }

    /// Append a page holding the given images, in order.
    pub fn page(mut self, images: &[ImageFixture]) -> Self {
        self.pages.push(images.to_vec());
        self
    }

    /// Append a page without images.
    pub fn blank_page(self) -> Self {
        self.page(&[])
    }

    pub fn build(self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids: Vec<Object> = Vec::new();
        for images in &self.pages {
            let mut xobjects = lopdf::Dictionary::new();
            let mut content = String::new();
            for (i, fixture) in images.iter().enumerate() {
                let id = add_image(&mut doc, *fixture);
                xobjects.set(format!("Im{}", i), Object::Reference(id));
                content.push_str(&format!("q 200 0 0 200 0 {} cm /Im{} Do Q\n", i * 210, i));
            }

            let content_id =
                doc.add_object(Stream::new(lopdf::Dictionary::new(), content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                "Contents" => content_id,
                "Resources" => dictionary! { "XObject" => xobjects },
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("Failed to serialize PDF");
        bytes
    }
}

fn add_image(doc: &mut Document, fixture: ImageFixture) -> ObjectId {
    let size = IMAGE_SIZE as i64;
    let stream = match fixture {
        ImageFixture::RawGray(shade) => Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => size,
                "Height" => size,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![shade; (IMAGE_SIZE * IMAGE_SIZE) as usize],
        ),
        ImageFixture::Jpeg(shade) => Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => size,
                "Height" => size,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg_bytes(shade),
        ),
        ImageFixture::Cmyk => Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => size,
                "Height" => size,
                "ColorSpace" => "DeviceCMYK",
                "BitsPerComponent" => 8,
            },
            vec![0; (IMAGE_SIZE * IMAGE_SIZE * 4) as usize],
        ),
    };
    doc.add_object(stream)
}

/// Encodes a uniform gray square as JPEG.
pub fn jpeg_bytes(shade: u8) -> Vec<u8> {
    let img = image::DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
        IMAGE_SIZE,
        IMAGE_SIZE,
        image::Luma([shade]),
    ));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .expect("Failed to encode JPEG");
    bytes
}

/// Config JSON for a filesystem-backed setup.
pub fn filesystem_config_json(root: &str, upload_order: &str) -> String {
    serde_json::json!({
        "version": "1.0",
        "ocr": { "language": "spa", "recognition_workers": 2 },
        "pipeline": { "upload_order": upload_order },
        "storage": {
            "type": "filesystem",
            "root": root,
            "public_base_url": "http://files.test/uploads",
            "on_conflict": "fail"
        }
    })
    .to_string()
}
