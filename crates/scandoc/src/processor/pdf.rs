use std::io::Cursor;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::ProcessError;
use crate::processor::{ImageExtractor, PageImage, PageImages};

/// Guards against cyclic `Parent` chains in damaged page trees.
const MAX_TREE_DEPTH: usize = 64;

/// Nesting limit for Form XObjects that wrap other XObjects.
const MAX_FORM_DEPTH: usize = 16;

/// Filters whose payload is already a standalone image file.
const PASSTHROUGH_FILTERS: [&[u8]; 2] = [b"DCTDecode", b"JPXDecode"];

/// Extracts embedded image XObjects with lopdf.
///
/// The document is parsed and every image reference is resolved before the
/// first image is returned. Image payloads are produced on demand.
#[derive(Debug, Clone, Default)]
pub struct PdfImageExtractor;

impl PdfImageExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn open(&self, pdf_bytes: &[u8]) -> Result<PdfImages, ProcessError> {
        let _span = tracing::info_span!("processor.pdf", size = pdf_bytes.len()).entered();

        let doc = Document::load_mem(pdf_bytes)
            .map_err(|e| ProcessError::MalformedInput(format!("Failed to load PDF: {}", e)))?;

        let mut refs = Vec::new();
        for (page_index, (_, page_id)) in doc.get_pages().into_iter().enumerate() {
            let image_ids = page_image_ids(&doc, page_id)?;
            tracing::debug!(page = page_index, images = image_ids.len(), "resolved page");
            refs.extend(
                image_ids
                    .into_iter()
                    .enumerate()
                    .map(|(image_index, object_id)| ImageRef {
                        page_index,
                        image_index,
                        object_id,
                    }),
            );
        }

        Ok(PdfImages {
            doc,
            refs: refs.into_iter(),
        })
    }
}

impl ImageExtractor for PdfImageExtractor {
    fn extract(&self, pdf_bytes: &[u8]) -> Result<PageImages, ProcessError> {
        Ok(Box::new(self.open(pdf_bytes)?))
    }
}

#[derive(Debug, Clone, Copy)]
struct ImageRef {
    page_index: usize,
    image_index: usize,
    object_id: ObjectId,
}

/// Lazily materialized images of one parsed document.
pub struct PdfImages {
    doc: Document,
    refs: std::vec::IntoIter<ImageRef>,
}

impl Iterator for PdfImages {
    type Item = PageImage;

    fn next(&mut self) -> Option<PageImage> {
        let image_ref = self.refs.next()?;
        // Resolved as streams in `open`; the document is not mutated since.
        let bytes = match self.doc.get_object(image_ref.object_id).and_then(Object::as_stream) {
            Ok(stream) => image_payload(stream),
            Err(_) => Vec::new(),
        };

        Some(PageImage {
            page_index: image_ref.page_index,
            image_index: image_ref.image_index,
            bytes,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.refs.size_hint()
    }
}

impl ExactSizeIterator for PdfImages {}

fn malformed(context: &str, e: lopdf::Error) -> ProcessError {
    ProcessError::MalformedInput(format!("{}: {}", context, e))
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Dictionary, ProcessError> {
    match obj {
        Object::Dictionary(dict) => Ok(dict),
        Object::Reference(id) => doc
            .get_dictionary(*id)
            .map_err(|e| malformed("Broken dictionary reference", e)),
        _ => Err(ProcessError::MalformedInput(
            "Expected a dictionary or a reference to one".to_string(),
        )),
    }
}

/// Finds the XObject dictionary that applies to a page, following the
/// `Parent` chain when the page inherits its resources.
fn page_xobjects(doc: &Document, page_id: ObjectId) -> Result<Option<&Dictionary>, ProcessError> {
    let mut node_id = page_id;

    for _ in 0..MAX_TREE_DEPTH {
        let node = doc
            .get_dictionary(node_id)
            .map_err(|e| malformed("Broken page tree", e))?;

        if node.has(b"Resources") {
            return resource_xobjects(doc, node);
        }

        match node.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => node_id = *parent_id,
            _ => return Ok(None),
        }
    }

    Err(ProcessError::MalformedInput(
        "Page tree nesting exceeds limit".to_string(),
    ))
}

/// The `/Resources /XObject` dictionary of a page node or Form XObject.
fn resource_xobjects<'a>(
    doc: &'a Document,
    owner: &'a Dictionary,
) -> Result<Option<&'a Dictionary>, ProcessError> {
    let Ok(resources) = owner.get(b"Resources") else {
        return Ok(None);
    };
    let resources = resolve_dict(doc, resources)?;
    match resources.get(b"XObject") {
        Ok(xobjects) => resolve_dict(doc, xobjects).map(Some),
        Err(_) => Ok(None),
    }
}

/// Image XObject ids of a page, in the order its resource dictionary lists
/// them. Images drawn through a Form XObject are listed where the form
/// appears.
fn page_image_ids(doc: &Document, page_id: ObjectId) -> Result<Vec<ObjectId>, ProcessError> {
    let Some(xobjects) = page_xobjects(doc, page_id)? else {
        return Ok(Vec::new());
    };

    let mut ids = Vec::new();
    collect_image_ids(doc, xobjects, &mut Vec::new(), &mut ids)?;
    Ok(ids)
}

/// `open_forms` holds the forms currently being walked; a form that refers
/// back to one of them is not entered again.
fn collect_image_ids(
    doc: &Document,
    xobjects: &Dictionary,
    open_forms: &mut Vec<ObjectId>,
    ids: &mut Vec<ObjectId>,
) -> Result<(), ProcessError> {
    for (_, entry) in xobjects.iter() {
        let Object::Reference(id) = entry else {
            continue;
        };
        let stream = doc
            .get_object(*id)
            .and_then(Object::as_stream)
            .map_err(|e| malformed("Broken XObject reference", e))?;

        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => ids.push(*id),
            Ok(b"Form") => {
                if open_forms.contains(id) || open_forms.len() >= MAX_FORM_DEPTH {
                    tracing::debug!(form = ?id, "Not descending into form XObject");
                    continue;
                }
                let Some(nested) = resource_xobjects(doc, &stream.dict)? else {
                    continue;
                };
                open_forms.push(*id);
                collect_image_ids(doc, nested, open_forms, ids)?;
                open_forms.pop();
            }
            _ => {}
        }
    }

    Ok(())
}

fn stream_filters(dict: &Dictionary) -> Vec<&[u8]> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.as_slice()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// Bytes handed to the recognizer for one image stream.
///
/// JPEG and JPEG 2000 payloads are complete files and pass through as is.
/// Raw 8-bit gray or RGB samples are wrapped in a PNG. Anything else is
/// returned undecoded and will be rejected by the recognizer.
fn image_payload(stream: &Stream) -> Vec<u8> {
    let filters = stream_filters(&stream.dict);

    if let [only] = filters.as_slice() {
        if PASSTHROUGH_FILTERS.contains(only) {
            return stream.content.clone();
        }
    }

    let samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        match stream.decompressed_content() {
            Ok(samples) => samples,
            Err(e) => {
                tracing::debug!("Could not decode image stream: {}", e);
                return stream.content.clone();
            }
        }
    };

    match encode_raw_samples(&stream.dict, &samples) {
        Some(png) => png,
        None => samples,
    }
}

fn encode_raw_samples(dict: &Dictionary, samples: &[u8]) -> Option<Vec<u8>> {
    let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
    let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;
    let bits = dict.get(b"BitsPerComponent").ok()?.as_i64().ok()?;
    if bits != 8 {
        return None;
    }

    let channels: usize = match dict.get(b"ColorSpace").ok()?.as_name().ok()? {
        b"DeviceGray" => 1,
        b"DeviceRGB" => 3,
        _ => return None,
    };

    let expected = (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(channels)?;
    let samples = samples.get(..expected)?.to_vec();

    let img = if channels == 1 {
        image::DynamicImage::ImageLuma8(image::GrayImage::from_raw(width, height, samples)?)
    } else {
        image::DynamicImage::ImageRgb8(image::RgbImage::from_raw(width, height, samples)?)
    };

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .ok()?;
    Some(png)
}
