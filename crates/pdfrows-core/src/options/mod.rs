pub mod schema;

use std::collections::HashSet;
use std::path::Path;

use crate::error::PdfRowsError;
use crate::parsing::boundary::Marker;
use schema::ImportOptions;

/// Load import options from a JSON file.
pub fn load_options(path: &Path) -> Result<ImportOptions, PdfRowsError> {
    let content = std::fs::read_to_string(path).map_err(|e| PdfRowsError::OptionsLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_options(&content, path)
}

/// Parse import options from a JSON string.
pub fn parse_options(json: &str, source: &Path) -> Result<ImportOptions, PdfRowsError> {
    let options: ImportOptions =
        serde_json::from_str(json).map_err(|e| PdfRowsError::OptionsLoad {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_options(&options)?;
    Ok(options)
}

/// Parse import options from a JSON string (no file path context).
pub fn parse_options_str(json: &str) -> Result<ImportOptions, PdfRowsError> {
    let options: ImportOptions = serde_json::from_str(json).map_err(PdfRowsError::Json)?;
    validate_options(&options)?;
    Ok(options)
}

/// Validate options that can be checked without opening the document,
/// including whether the configured backend supports the algorithm.
pub fn validate_options(options: &ImportOptions) -> Result<(), PdfRowsError> {
    validate_selection(options)?;
    options.algorithm.check_backend(options.backend.backend().as_ref())
}

/// Validate page selection, tolerances and markers.
pub fn validate_selection(options: &ImportOptions) -> Result<(), PdfRowsError> {
    if let Some(ref pages) = options.page_numbers {
        if pages.is_empty() {
            return Err(PdfRowsError::Configuration(
                "page_numbers must not be empty".into(),
            ));
        }
        let mut seen = HashSet::new();
        for &page in pages {
            if page == 0 {
                return Err(PdfRowsError::OutOfRange {
                    page,
                    page_count: None,
                });
            }
            if !seen.insert(page) {
                return Err(PdfRowsError::Configuration(format!(
                    "page {page} is listed more than once"
                )));
            }
        }
    }

    for (name, value) in [
        ("x_tolerance", options.x_tolerance),
        ("y_tolerance", options.y_tolerance),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(PdfRowsError::Configuration(format!(
                "{name} must be a non-negative number, got {value}"
            )));
        }
    }

    for (name, marker) in [
        ("starts_after", &options.starts_after),
        ("ends_before", &options.ends_before),
    ] {
        if let Some(Marker::Literal(text)) = marker {
            if text.is_empty() {
                return Err(PdfRowsError::Configuration(format!(
                    "{name} must not be an empty string"
                )));
            }
        }
    }

    Ok(())
}
