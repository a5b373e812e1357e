use std::iter::FusedIterator;

use super::PdfDocument;
use crate::error::PdfRowsError;

/// Lazy sequence of page texts for one opened document.
///
/// Owns the document handle; resources are released when the iterator is
/// dropped, whether or not it was run to the end.
pub struct PageTexts {
    document: Box<dyn PdfDocument>,
    pages: Vec<usize>,
    next: usize,
}

impl PageTexts {
    /// Iterate over every page of `document` in order.
    pub fn new(document: Box<dyn PdfDocument>) -> Self {
        let pages = (1..=document.page_count()).collect();
        PageTexts {
            document,
            pages,
            next: 0,
        }
    }

    /// Iterate over the given pages, which must already be validated.
    pub fn with_pages(document: Box<dyn PdfDocument>, pages: Vec<usize>) -> Self {
        PageTexts {
            document,
            pages,
            next: 0,
        }
    }

    /// Number of pages in the whole document.
    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }
}

impl Iterator for PageTexts {
    type Item = Result<String, PdfRowsError>;

    fn next(&mut self) -> Option<Self::Item> {
        let page = *self.pages.get(self.next)?;
        self.next += 1;
        tracing::trace!(page, "extracting page text");
        Some(self.document.page_text(page))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.pages.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PageTexts {}

impl FusedIterator for PageTexts {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{check_page, PageObjects};

    struct FakeDocument(Vec<&'static str>);

    impl PdfDocument for FakeDocument {
        fn page_count(&self) -> usize {
            self.0.len()
        }

        fn page_text(&self, page_number: usize) -> Result<String, PdfRowsError> {
            check_page(page_number, self.0.len())?;
            Ok(self.0[page_number - 1].to_string())
        }

        fn page_objects(&self, page_number: usize) -> Result<PageObjects, PdfRowsError> {
            check_page(page_number, self.0.len())?;
            Ok(PageObjects::default())
        }
    }

    #[test]
    fn test_yields_pages_in_order() {
        let texts = PageTexts::new(Box::new(FakeDocument(vec!["one", "two"])));
        assert_eq!(texts.page_count(), 2);
        assert_eq!(texts.len(), 2);
        let pages: Vec<String> = texts.collect::<Result<_, _>>().unwrap();
        assert_eq!(pages, vec!["one", "two"]);
    }

    #[test]
    fn test_selected_pages_and_exact_size() {
        let mut texts =
            PageTexts::with_pages(Box::new(FakeDocument(vec!["one", "two", "three"])), vec![3, 1]);
        assert_eq!(texts.len(), 2);
        assert_eq!(texts.next().unwrap().unwrap(), "three");
        assert_eq!(texts.len(), 1);
        assert_eq!(texts.next().unwrap().unwrap(), "one");
        assert!(texts.next().is_none());
        assert!(texts.next().is_none());
    }

    #[test]
    fn test_empty_document() {
        let mut texts = PageTexts::new(Box::new(FakeDocument(Vec::new())));
        assert_eq!(texts.page_count(), 0);
        assert!(texts.next().is_none());
    }
}
