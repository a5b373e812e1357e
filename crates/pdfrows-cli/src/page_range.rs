use pdfrows_core::error::PdfRowsError;

/// Most pages a single list may select.
const MAX_SELECTED_PAGES: usize = 100_000;

/// Parse a page list like "1,3-5" into 1-indexed page numbers, in the order
/// given. Ranges may run backwards ("4-2" is 4, 3, 2).
///
/// Range checks against the document, and duplicate detection, are left to
/// the library so the CLI reports the same errors as the API.
pub fn parse_page_list(input: &str) -> Result<Vec<usize>, PdfRowsError> {
    let mut pages = Vec::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start_str, end_str)) = part.split_once('-') {
            let start = parse_page(start_str)?;
            let end = parse_page(end_str)?;
            let span = start.abs_diff(end) + 1;
            if span > MAX_SELECTED_PAGES - pages.len() {
                return Err(too_many_pages(input));
            }
            if start <= end {
                pages.extend(start..=end);
            } else {
                pages.extend((end..=start).rev());
            }
        } else {
            if pages.len() == MAX_SELECTED_PAGES {
                return Err(too_many_pages(input));
            }
            pages.push(parse_page(part)?);
        }
    }

    if pages.is_empty() {
        return Err(PdfRowsError::Configuration(format!(
            "no pages in '{input}'"
        )));
    }
    Ok(pages)
}

fn too_many_pages(input: &str) -> PdfRowsError {
    PdfRowsError::Configuration(format!(
        "page list '{input}' selects more than {MAX_SELECTED_PAGES} pages"
    ))
}

fn parse_page(s: &str) -> Result<usize, PdfRowsError> {
    s.trim()
        .parse()
        .map_err(|_| PdfRowsError::Configuration(format!("invalid page number: '{}'", s.trim())))
}
