//! Integration tests for the import_from_pdf() pipeline.
//!
//! Uses a MockBackend that returns pre-built PageObjects without parsing
//! any PDF, so these tests exercise boundary location, the algorithms and
//! table assembly in isolation from the real backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pdfrows_core::extraction::{
    check_page, BBox, PageObjects, PdfBackend, PdfDocument, PdfSource, RectObject, TextFragment,
};
use pdfrows_core::parsing::{render_text, DEFAULT_Y_TOLERANCE};
use pdfrows_core::{
    import_with_backend, table_lines_with_backend, Algorithm, ImportOptions, Marker, PageTexts,
    PdfRowsError,
};

#[derive(Default)]
struct Calls {
    opened: AtomicUsize,
    pages_parsed: AtomicUsize,
}

struct MockBackend {
    pages: Vec<PageObjects>,
    rects: bool,
    calls: Arc<Calls>,
}

impl MockBackend {
    fn new(pages: Vec<PageObjects>) -> Self {
        MockBackend {
            pages,
            rects: true,
            calls: Arc::new(Calls::default()),
        }
    }

    fn without_rects(mut self) -> Self {
        self.rects = false;
        self
    }
}

impl PdfBackend for MockBackend {
    fn open(&self, _source: PdfSource<'_>) -> Result<Box<dyn PdfDocument>, PdfRowsError> {
        self.calls.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockDocument {
            pages: self.pages.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }

    fn supports_rects(&self) -> bool {
        self.rects
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

struct MockDocument {
    pages: Vec<PageObjects>,
    calls: Arc<Calls>,
}

impl PdfDocument for MockDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page_number: usize) -> Result<String, PdfRowsError> {
        check_page(page_number, self.pages.len())?;
        Ok(render_text(
            &self.pages[page_number - 1].fragments,
            DEFAULT_Y_TOLERANCE,
        ))
    }

    fn page_objects(&self, page_number: usize) -> Result<PageObjects, PdfRowsError> {
        check_page(page_number, self.pages.len())?;
        self.calls.pages_parsed.fetch_add(1, Ordering::SeqCst);
        Ok(self.pages[page_number - 1].clone())
    }
}

/// Lay out rows of cells at fixed column positions, 20pt apart.
fn page(number: usize, rows: &[&[&str]]) -> PageObjects {
    const COLUMNS: [f64; 4] = [50.0, 200.0, 320.0, 460.0];
    let mut fragments = Vec::new();
    for (r, cells) in rows.iter().enumerate() {
        let y = 100.0 + 20.0 * r as f64;
        for (c, text) in cells.iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            let x = COLUMNS[c];
            let width = 4.0 * text.chars().count() as f64;
            fragments.push(TextFragment::new(*text, BBox::new(x, y, x + width, y + 8.0)));
        }
    }
    PageObjects {
        page_number: number,
        width: 612.0,
        height: 792.0,
        fragments,
        rects: Vec::new(),
    }
}

const TITLE: &str = "MILHO SAFRA 16/17: ACOMPANHAMENTO DE ÁREA, PRODUTIVIDADE E PRODUÇÃO";
const FOOTNOTE: &str = "*Variação em pontos percentuais.";

fn milho_page(number: usize, body: &[&[&str]]) -> PageObjects {
    let mut rows: Vec<&[&str]> = vec![
        &["Companhia Nacional de Abastecimento"],
        &[TITLE],
        &["REGIÃO/UF", "ÁREA (Em mil ha)", "PRODUTIVIDADE (Em kg/ha)", "PRODUÇÃO (Em mil t)"],
    ];
    rows.extend_from_slice(body);
    rows.push(&[FOOTNOTE]);
    rows.push(&["Fonte: Conab."]);
    page(number, &rows)
}

fn milho_options() -> ImportOptions {
    ImportOptions::new()
        .starts_after(Marker::pattern("MILHO SAFRA 16/17: ACOMPANHAMENTO DE .*").unwrap())
        .ends_before(FOOTNOTE)
        .algorithm(Algorithm::HeaderPosition)
}

fn two_page_backend() -> MockBackend {
    MockBackend::new(vec![
        milho_page(
            1,
            &[
                &["NORTE", "2.013,1", "4.378", "8.813,7"],
                &["RO", "221,2", "4.512", "998,1"],
            ],
        ),
        milho_page(
            2,
            &[
                &["CENTRO-OESTE", "8.957,4", "6.241", "55.905,6"],
                &["MT", "4.660,8", "6.410", "29.876,3"],
            ],
        ),
    ])
}

// ---------------------------------------------------------------------------
// Test 1: header-position with regex start and literal end marker
// ---------------------------------------------------------------------------
#[test]
fn header_position_between_markers() {
    let backend = two_page_backend();
    let options = milho_options().pages([1]);
    let table = import_with_backend(&backend, PdfSource::Bytes(&[]), &options).unwrap();

    assert_eq!(
        table.fields,
        vec![
            "regiao_uf",
            "area_em_mil_ha",
            "produtividade_em_kg_ha",
            "producao_em_mil_t"
        ]
    );
    assert_eq!(
        table.rows,
        vec![
            vec!["NORTE", "2.013,1", "4.378", "8.813,7"],
            vec!["RO", "221,2", "4.512", "998,1"],
        ]
    );
}

// ---------------------------------------------------------------------------
// Test 2: page selections give disjoint, individually correct tables
// ---------------------------------------------------------------------------
#[test]
fn page_selections_are_disjoint() {
    let backend = two_page_backend();
    let first = import_with_backend(&backend, PdfSource::Bytes(&[]), &milho_options().pages([1]))
        .unwrap();
    let second = import_with_backend(&backend, PdfSource::Bytes(&[]), &milho_options().pages([2]))
        .unwrap();

    assert_eq!(first.fields, second.fields);
    assert_eq!(first.rows[0][0], "NORTE");
    assert_eq!(second.rows[0][0], "CENTRO-OESTE");
    for row in &first.rows {
        assert!(!second.rows.contains(row));
    }
}

// ---------------------------------------------------------------------------
// Test 3: without a page selection the first markers win across pages
// ---------------------------------------------------------------------------
#[test]
fn all_pages_stop_at_first_end_marker() {
    let backend = two_page_backend();
    let table = import_with_backend(&backend, PdfSource::Bytes(&[]), &milho_options()).unwrap();
    // The first footnote (page 1) ends the region.
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[1][0], "RO");
}

#[test]
fn missing_end_marker_reads_to_the_end() {
    let backend = two_page_backend();
    let options = ImportOptions::new()
        .starts_after(Marker::pattern("MILHO SAFRA .*").unwrap())
        .ends_before("never printed")
        .algorithm(Algorithm::HeaderPosition);
    let table = import_with_backend(&backend, PdfSource::Bytes(&[]), &options).unwrap();
    let first_cells: Vec<&str> = table.rows.iter().map(|r| r[0].as_str()).collect();
    // Page 2 repeats its own title and header lines as data.
    assert!(first_cells.contains(&"MT"));
    assert!(first_cells.contains(&"Fonte: Conab."));
}

// ---------------------------------------------------------------------------
// Test 4: the default algorithm splits rows into fragments
// ---------------------------------------------------------------------------
#[test]
fn default_algorithm_matches_header_position_on_full_rows() {
    let backend = two_page_backend();
    let plain = milho_options().algorithm(Algorithm::default()).pages([2]);
    let lines = table_lines_with_backend(&backend, PdfSource::Bytes(&[]), &plain).unwrap();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], vec!["MT", "4.660,8", "6.410", "29.876,3"]);

    let by_header =
        import_with_backend(&backend, PdfSource::Bytes(&[]), &milho_options().pages([2]))
            .unwrap();
    let by_lines = import_with_backend(&backend, PdfSource::Bytes(&[]), &plain).unwrap();
    assert_eq!(by_header, by_lines);
}

// ---------------------------------------------------------------------------
// Test 5: marker and validation failures
// ---------------------------------------------------------------------------
#[test]
fn start_marker_that_never_matches() {
    let backend = two_page_backend();
    let options = ImportOptions::new().starts_after(Marker::pattern("SOJA SAFRA .*").unwrap());
    let err = import_with_backend(&backend, PdfSource::Bytes(&[]), &options).unwrap_err();
    match err {
        PdfRowsError::MarkerNotFound { marker } => assert!(marker.contains("SOJA")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn rects_algorithm_needs_rect_backend() {
    let backend = two_page_backend().without_rects();
    let options = ImportOptions::new().algorithm(Algorithm::RectsBoundaries);
    let err = import_with_backend(&backend, PdfSource::Bytes(&[]), &options).unwrap_err();
    assert!(matches!(err, PdfRowsError::UnsupportedAlgorithm { .. }));
    assert_eq!(backend.calls.opened.load(Ordering::SeqCst), 0);
}

#[test]
fn bad_page_numbers_fail_before_opening() {
    let backend = two_page_backend();

    let err = import_with_backend(&backend, PdfSource::Bytes(&[]), &milho_options().pages([0]))
        .unwrap_err();
    assert!(matches!(err, PdfRowsError::OutOfRange { page: 0, .. }));

    let err = import_with_backend(&backend, PdfSource::Bytes(&[]), &milho_options().pages([1, 1]))
        .unwrap_err();
    assert!(matches!(err, PdfRowsError::Configuration(_)));

    assert_eq!(backend.calls.opened.load(Ordering::SeqCst), 0);
}

#[test]
fn page_beyond_count_fails_before_parsing() {
    let backend = two_page_backend();
    let err = import_with_backend(&backend, PdfSource::Bytes(&[]), &milho_options().pages([1, 3]))
        .unwrap_err();
    assert!(matches!(
        err,
        PdfRowsError::OutOfRange {
            page: 3,
            page_count: Some(2)
        }
    ));
    assert_eq!(backend.calls.opened.load(Ordering::SeqCst), 1);
    assert_eq!(backend.calls.pages_parsed.load(Ordering::SeqCst), 0);
}

#[test]
fn nothing_after_start_marker_is_empty_region() {
    let backend = MockBackend::new(vec![page(1, &[&["intro"], &["LAST LINE"]])]);
    let options = ImportOptions::new().starts_after("LAST LINE");
    let err = import_with_backend(&backend, PdfSource::Bytes(&[]), &options).unwrap_err();
    assert!(matches!(err, PdfRowsError::EmptyRegion));
}

// ---------------------------------------------------------------------------
// Test 6: rects-boundaries with reported rectangles
// ---------------------------------------------------------------------------
#[test]
fn rects_boundaries_uses_cell_rectangles() {
    let mut objects = page(
        1,
        &[
            &["Estado", "Total"],
            &["MT", "10"],
            &["GO", ""],
        ],
    );
    // Cells are 150pt wide and 20pt high; text sits 4pt below each top edge.
    for row in 0..3 {
        for col in 0..2 {
            let x = 45.0 + 150.0 * col as f64;
            let y = 96.0 + 20.0 * row as f64;
            objects.rects.push(RectObject {
                bbox: BBox::new(x, y, x + 150.0, y + 20.0),
                fill: false,
                stroke: true,
            });
        }
    }
    let backend = MockBackend::new(vec![objects]);
    let options = ImportOptions::new().algorithm(Algorithm::RectsBoundaries);
    let table = import_with_backend(&backend, PdfSource::Bytes(&[]), &options).unwrap();
    assert_eq!(table.fields, vec!["estado", "total"]);
    assert_eq!(table.rows, vec![vec!["MT", "10"], vec!["GO", ""]]);
}

// ---------------------------------------------------------------------------
// Test 7: determinism and lazy page text
// ---------------------------------------------------------------------------
#[test]
fn repeated_imports_are_identical() {
    let backend = two_page_backend();
    let options = milho_options();
    let a = import_with_backend(&backend, PdfSource::Bytes(&[]), &options).unwrap();
    let b = import_with_backend(&backend, PdfSource::Bytes(&[]), &options).unwrap();
    assert_eq!(a, b);
}

#[test]
fn page_texts_from_mock_document() {
    let backend = two_page_backend();
    let texts = PageTexts::new(backend.open(PdfSource::Bytes(&[])).unwrap());
    assert_eq!(texts.page_count(), 2);
    let pages: Vec<String> = texts.collect::<Result<_, _>>().unwrap();
    assert_eq!(pages.len(), 2);
    assert!(pages[0].lines().any(|l| l == TITLE));
    assert!(pages[1].contains("CENTRO-OESTE 8.957,4 6.241 55.905,6"));
}
