pub mod backends;
pub mod import;
pub mod pages;
pub mod text;

use std::io::Read;
use std::path::{Path, PathBuf};

use pdfrows_core::{BackendKind, PdfRowsError, PdfSource};

/// A PDF named on the command line; `-` reads it from stdin up front.
pub enum Input {
    File(PathBuf),
    Stdin(Vec<u8>),
}

impl Input {
    pub fn open(path: &Path) -> Result<Self, PdfRowsError> {
        if path.as_os_str() == "-" {
            let mut bytes = Vec::new();
            std::io::stdin().read_to_end(&mut bytes)?;
            return Ok(Input::Stdin(bytes));
        }
        Ok(Input::File(path.to_path_buf()))
    }

    pub fn source(&self) -> PdfSource<'_> {
        match self {
            Input::File(path) => PdfSource::Path(path),
            Input::Stdin(bytes) => PdfSource::Bytes(bytes),
        }
    }
}

pub fn backend_kind(name: Option<&str>) -> Result<BackendKind, PdfRowsError> {
    name.map_or(Ok(BackendKind::default()), |n| n.parse())
}
