use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::content::interpret_page;
use super::{check_page, PageObjects, PdfBackend, PdfDocument, PdfSource};
use crate::error::PdfRowsError;
use crate::parsing::{self, DEFAULT_Y_TOLERANCE};

/// US Letter, used when a page tree carries no MediaBox at all.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// In-process backend built on the `lopdf` object model.
///
/// Reports text fragments and rectangle/line graphics, so it supports every
/// extraction algorithm.
pub struct LopdfBackend;

impl LopdfBackend {
    pub fn new() -> Self {
        LopdfBackend
    }
}

impl Default for LopdfBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBackend for LopdfBackend {
    fn open(&self, source: PdfSource<'_>) -> Result<Box<dyn PdfDocument>, PdfRowsError> {
        let described = source.describe();
        let bytes = source.read_bytes()?;
        let doc = LopdfDocument::load(&bytes)?;
        tracing::debug!(
            source = %described,
            pages = doc.page_ids.len(),
            "opened document with lopdf"
        );
        Ok(Box::new(doc))
    }

    fn supports_rects(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &str {
        "lopdf"
    }
}

/// A document parsed by lopdf, with page ids cached in page order.
pub struct LopdfDocument {
    inner: Document,
    page_ids: Vec<ObjectId>,
}

impl LopdfDocument {
    pub fn load(bytes: &[u8]) -> Result<Self, PdfRowsError> {
        let inner = Document::load_mem(bytes)
            .map_err(|e| PdfRowsError::document("lopdf failed to parse the document", e))?;
        // get_pages returns a BTreeMap keyed by 1-based page number.
        let page_ids = inner.get_pages().values().copied().collect();
        Ok(LopdfDocument { inner, page_ids })
    }

    fn page_id(&self, page_number: usize) -> Result<ObjectId, PdfRowsError> {
        check_page(page_number, self.page_ids.len())?;
        Ok(self.page_ids[page_number - 1])
    }

    fn media_box(&self, page_id: ObjectId) -> [f64; 4] {
        let values = resolve_inherited(&self.inner, page_id, b"MediaBox").and_then(|obj| {
            match resolve(&self.inner, obj) {
                Object::Array(arr) if arr.len() == 4 => {
                    let nums: Vec<f64> = arr
                        .iter()
                        .filter_map(|o| number(resolve(&self.inner, o)))
                        .collect();
                    <[f64; 4]>::try_from(nums).ok()
                }
                _ => None,
            }
        });
        values.unwrap_or(DEFAULT_MEDIA_BOX)
    }

    fn resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        let obj = resolve_inherited(&self.inner, page_id, b"Resources")?;
        match resolve(&self.inner, obj) {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }
}

impl PdfDocument for LopdfDocument {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_text(&self, page_number: usize) -> Result<String, PdfRowsError> {
        let objects = self.page_objects(page_number)?;
        Ok(parsing::render_text(&objects.fragments, DEFAULT_Y_TOLERANCE))
    }

    fn page_objects(&self, page_number: usize) -> Result<PageObjects, PdfRowsError> {
        let page_id = self.page_id(page_number)?;
        let content = self.inner.get_page_content(page_id).map_err(|e| {
            PdfRowsError::document(format!("failed to read content of page {page_number}"), e)
        })?;
        let media_box = self.media_box(page_id);
        let graphics = interpret_page(&self.inner, &content, self.resources(page_id), media_box)?;

        tracing::trace!(
            page = page_number,
            fragments = graphics.fragments.len(),
            rects = graphics.rects.len(),
            "interpreted page content"
        );

        Ok(PageObjects {
            page_number,
            width: (media_box[2] - media_box[0]).abs(),
            height: (media_box[3] - media_box[1]).abs(),
            fragments: graphics.fragments,
            rects: graphics.rects,
        })
    }
}

/// Convert a lopdf numeric object (Integer or Real) to f64.
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

/// Resolve an indirect reference, returning the referenced object.
///
/// Dangling references resolve to the reference itself.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Try to get decompressed content from a stream, falling back to raw content.
pub(crate) fn stream_bytes(stream: &Stream) -> Option<Vec<u8>> {
    stream
        .decompressed_content()
        .ok()
        .or_else(|| Some(stream.content.clone()))
        .filter(|b| !b.is_empty())
}

/// Look up a key in the page dictionary, walking up the page tree
/// (via /Parent) if the key is not found on the page itself.
fn resolve_inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current_id = page_id;
    // Bounded walk: malformed files can contain /Parent cycles.
    for _ in 0..64 {
        let dict = doc.get_object(current_id).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_accepts_integers_and_reals() {
        assert_eq!(number(&Object::Integer(12)), Some(12.0));
        assert_eq!(number(&Object::Real(1.5)), Some(1.5));
        assert_eq!(number(&Object::Boolean(true)), None);
    }

    #[test]
    fn garbage_bytes_are_a_document_error() {
        let err = LopdfBackend::new()
            .open(PdfSource::Bytes(b"this is not a pdf"))
            .err()
            .unwrap();
        assert!(matches!(err, PdfRowsError::Document { source: Some(_), .. }));
    }

    #[test]
    fn missing_file_is_a_document_error() {
        let path = std::path::Path::new("/nonexistent/dir/missing.pdf");
        let err = LopdfBackend::new().open(PdfSource::Path(path)).err().unwrap();
        assert!(matches!(err, PdfRowsError::Document { .. }));
    }
}
