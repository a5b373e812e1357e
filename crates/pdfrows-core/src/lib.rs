pub mod algorithms;
pub mod error;
pub mod extraction;
pub mod model;
pub mod options;
pub mod parsing;

pub use algorithms::Algorithm;
pub use error::PdfRowsError;
pub use extraction::pages::PageTexts;
pub use extraction::{BackendKind, PdfBackend, PdfSource};
pub use model::Table;
pub use options::schema::ImportOptions;
pub use parsing::boundary::Marker;

use parsing::boundary::{self, Region};
use parsing::PageLayout;

/// Main API entry point: extract the table delimited by the configured
/// markers from a PDF, using the backend named in `options`.
///
/// The first row of the region becomes the (slugified) header.
pub fn import_from_pdf<'a>(
    source: impl Into<PdfSource<'a>>,
    options: &ImportOptions,
) -> Result<Table, PdfRowsError> {
    let backend = options.backend.backend();
    import_with_backend(backend.as_ref(), source, options)
}

/// Same as [`import_from_pdf`] with a caller-supplied backend.
/// `options.backend` is ignored.
pub fn import_with_backend<'a>(
    backend: &dyn PdfBackend,
    source: impl Into<PdfSource<'a>>,
    options: &ImportOptions,
) -> Result<Table, PdfRowsError> {
    let lines = table_lines_with_backend(backend, source, options)?;
    let table = Table::from_lines(lines)?;
    tracing::debug!(
        fields = table.fields.len(),
        rows = table.rows.len(),
        "imported table"
    );
    Ok(table)
}

/// Raw rows produced by the selected algorithm, header included, before any
/// padding or header normalization.
pub fn pdf_table_lines<'a>(
    source: impl Into<PdfSource<'a>>,
    options: &ImportOptions,
) -> Result<Vec<Vec<String>>, PdfRowsError> {
    let backend = options.backend.backend();
    table_lines_with_backend(backend.as_ref(), source, options)
}

/// Same as [`pdf_table_lines`] with a caller-supplied backend.
pub fn table_lines_with_backend<'a>(
    backend: &dyn PdfBackend,
    source: impl Into<PdfSource<'a>>,
    options: &ImportOptions,
) -> Result<Vec<Vec<String>>, PdfRowsError> {
    options::validate_selection(options)?;
    options.algorithm.check_backend(backend)?;
    let algorithm = options.algorithm.build(options.tolerances());
    tracing::debug!(
        backend = backend.backend_name(),
        algorithm = algorithm.name(),
        "importing table"
    );

    let region = locate_region(backend, source.into(), options)?;
    if region.is_empty() {
        return Err(PdfRowsError::EmptyRegion);
    }

    let lines = algorithm.lines(&region)?;
    if lines.is_empty() {
        return Err(PdfRowsError::EmptyRegion);
    }
    Ok(lines)
}

fn locate_region(
    backend: &dyn PdfBackend,
    source: PdfSource<'_>,
    options: &ImportOptions,
) -> Result<Region, PdfRowsError> {
    let document = backend.open(source)?;
    let pages = selected_pages(options.page_numbers.as_deref(), document.page_count())?;

    let mut layouts = Vec::with_capacity(pages.len());
    for page in pages {
        let objects = document.page_objects(page)?;
        layouts.push(PageLayout::from_objects(objects, options.y_tolerance));
    }

    boundary::locate(
        layouts,
        options.starts_after.as_ref(),
        options.ends_before.as_ref(),
    )
}

/// Number of pages in the document.
pub fn number_of_pages<'a>(
    source: impl Into<PdfSource<'a>>,
    backend: BackendKind,
) -> Result<usize, PdfRowsError> {
    let document = backend.backend().open(source.into())?;
    Ok(document.page_count())
}

/// Lazy per-page text of the whole document, in page order.
///
/// Each call opens its own handle, so calling it twice yields the same
/// sequence.
pub fn pdf_to_text<'a>(
    source: impl Into<PdfSource<'a>>,
    backend: BackendKind,
) -> Result<PageTexts, PdfRowsError> {
    let document = backend.backend().open(source.into())?;
    Ok(PageTexts::new(document))
}

/// [`pdf_to_text`] with the default backend.
pub fn pdf_to_text_default<'a>(
    source: impl Into<PdfSource<'a>>,
) -> Result<PageTexts, PdfRowsError> {
    pdf_to_text(source, BackendKind::default())
}

/// Lazy text of the given pages, in the given order.
pub fn pdf_to_text_pages<'a>(
    source: impl Into<PdfSource<'a>>,
    backend: BackendKind,
    pages: &[usize],
) -> Result<PageTexts, PdfRowsError> {
    options::validate_selection(&ImportOptions::new().pages(pages.iter().copied()))?;
    let document = backend.backend().open(source.into())?;
    let pages = selected_pages(Some(pages), document.page_count())?;
    Ok(PageTexts::with_pages(document, pages))
}

/// Resolve the page selection against the document, checking every page
/// before any of them is parsed.
fn selected_pages(
    requested: Option<&[usize]>,
    page_count: usize,
) -> Result<Vec<usize>, PdfRowsError> {
    match requested {
        None => Ok((1..=page_count).collect()),
        Some(pages) => {
            for &page in pages {
                extraction::check_page(page, page_count)?;
            }
            Ok(pages.to_vec())
        }
    }
}
