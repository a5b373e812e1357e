use std::path::Path;

use pdfrows_core::error::PdfRowsError;

use super::{backend_kind, Input};

pub fn run(input_file: &Path, backend: Option<&str>) -> Result<(), PdfRowsError> {
    let backend = backend_kind(backend)?;
    let input = Input::open(input_file)?;
    let count = pdfrows_core::number_of_pages(input.source(), backend)?;
    println!("{count}");
    Ok(())
}
