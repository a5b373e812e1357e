use std::io::Write;
use std::path::Path;

use pdfrows_core::error::PdfRowsError;

use super::{backend_kind, Input};
use crate::page_range::parse_page_list;

pub fn run(
    input_file: &Path,
    backend: Option<&str>,
    pages: Option<&str>,
) -> Result<(), PdfRowsError> {
    let backend = backend_kind(backend)?;
    let input = Input::open(input_file)?;
    let texts = match pages {
        Some(list) => {
            let pages = parse_page_list(list)?;
            pdfrows_core::pdf_to_text_pages(input.source(), backend, &pages)?
        }
        None => pdfrows_core::pdf_to_text(input.source(), backend)?,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (i, text) in texts.enumerate() {
        if i > 0 {
            out.write_all(b"\x0c")?;
        }
        writeln!(out, "{}", text?)?;
    }
    out.flush()?;
    Ok(())
}
