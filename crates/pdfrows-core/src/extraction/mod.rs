pub mod content;
pub mod fonts;
pub mod lopdf_backend;
pub mod pages;
pub mod pdftotext;

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PdfRowsError;

/// Axis-aligned box in PDF points, top-left origin (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BBox {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        BBox {
            x_min: x_min.min(x_max),
            y_min: y_min.min(y_max),
            x_max: x_min.max(x_max),
            y_max: y_min.max(y_max),
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn center_x(&self) -> f64 {
        (self.x_min + self.x_max) / 2.0
    }

    pub fn center_y(&self) -> f64 {
        (self.y_min + self.y_max) / 2.0
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }
}

/// A positioned piece of text on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    pub bbox: BBox,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        TextFragment {
            text: text.into(),
            bbox,
        }
    }
}

/// A rectangle or axis-aligned line painted on a page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectObject {
    pub bbox: BBox,
    pub fill: bool,
    pub stroke: bool,
}

/// Everything a backend reports about a single page.
#[derive(Debug, Clone, Default)]
pub struct PageObjects {
    pub page_number: usize,
    pub width: f64,
    pub height: f64,
    pub fragments: Vec<TextFragment>,
    /// Always empty for backends without rectangle support.
    pub rects: Vec<RectObject>,
}

/// Where the PDF bytes come from.
///
/// A caller-supplied reader is borrowed, read to the end and left open.
pub enum PdfSource<'a> {
    Path(&'a Path),
    Bytes(&'a [u8]),
    Reader(&'a mut dyn Read),
}

impl<'a> PdfSource<'a> {
    pub fn path(path: &'a (impl AsRef<Path> + ?Sized)) -> Self {
        PdfSource::Path(path.as_ref())
    }

    pub fn reader(reader: &'a mut dyn Read) -> Self {
        PdfSource::Reader(reader)
    }

    /// Load the full document into memory.
    pub fn read_bytes(self) -> Result<Vec<u8>, PdfRowsError> {
        match self {
            PdfSource::Path(path) => std::fs::read(path).map_err(|e| {
                PdfRowsError::document(format!("failed to read {}", path.display()), e)
            }),
            PdfSource::Bytes(bytes) => Ok(bytes.to_vec()),
            PdfSource::Reader(reader) => {
                let mut buf = Vec::new();
                reader
                    .read_to_end(&mut buf)
                    .map_err(|e| PdfRowsError::document("failed to read PDF stream", e))?;
                Ok(buf)
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            PdfSource::Path(path) => path.display().to_string(),
            PdfSource::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            PdfSource::Reader(_) => "<stream>".to_string(),
        }
    }
}

impl<'a> From<&'a Path> for PdfSource<'a> {
    fn from(path: &'a Path) -> Self {
        PdfSource::Path(path)
    }
}

impl<'a> From<&'a str> for PdfSource<'a> {
    fn from(path: &'a str) -> Self {
        PdfSource::Path(Path::new(path))
    }
}

impl<'a> From<&'a std::path::PathBuf> for PdfSource<'a> {
    fn from(path: &'a std::path::PathBuf) -> Self {
        PdfSource::Path(path.as_path())
    }
}

impl<'a> From<&'a [u8]> for PdfSource<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        PdfSource::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for PdfSource<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        PdfSource::Bytes(bytes.as_slice())
    }
}

impl<'a> From<&'a mut std::fs::File> for PdfSource<'a> {
    fn from(file: &'a mut std::fs::File) -> Self {
        PdfSource::Reader(file)
    }
}

/// An opened PDF. Dropping it releases everything the backend acquired.
pub trait PdfDocument {
    fn page_count(&self) -> usize;

    /// Plain text of a 1-indexed page.
    fn page_text(&self, page_number: usize) -> Result<String, PdfRowsError>;

    /// Positioned text (and rects, when supported) of a 1-indexed page.
    fn page_objects(&self, page_number: usize) -> Result<PageObjects, PdfRowsError>;
}

/// Trait for PDF parsing backends.
pub trait PdfBackend: Send + Sync {
    fn open(&self, source: PdfSource<'_>) -> Result<Box<dyn PdfDocument>, PdfRowsError>;

    /// Whether `page_objects` reports rectangle/line graphics.
    fn supports_rects(&self) -> bool;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Fail with `OutOfRange` unless `page_number` lies in `[1, page_count]`.
pub fn check_page(page_number: usize, page_count: usize) -> Result<(), PdfRowsError> {
    if page_number == 0 || page_number > page_count {
        return Err(PdfRowsError::OutOfRange {
            page: page_number,
            page_count: Some(page_count),
        });
    }
    Ok(())
}

/// Built-in backends, selectable by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    #[default]
    #[serde(rename = "lopdf")]
    Lopdf,
    #[serde(rename = "pdftotext", alias = "poppler")]
    Pdftotext,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Lopdf, BackendKind::Pdftotext];

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Lopdf => "lopdf",
            BackendKind::Pdftotext => "pdftotext",
        }
    }

    pub fn backend(&self) -> Box<dyn PdfBackend> {
        match self {
            BackendKind::Lopdf => Box::new(lopdf_backend::LopdfBackend::new()),
            BackendKind::Pdftotext => Box::new(pdftotext::PdftotextBackend::new()),
        }
    }

    pub fn supports_rects(&self) -> bool {
        match self {
            BackendKind::Lopdf => true,
            BackendKind::Pdftotext => false,
        }
    }

    /// Whether the backend can run on this machine.
    pub fn is_available(&self) -> bool {
        match self {
            BackendKind::Lopdf => true,
            BackendKind::Pdftotext => pdftotext::PdftotextBackend::is_available(),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = PdfRowsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lopdf" => Ok(BackendKind::Lopdf),
            "pdftotext" | "poppler" => Ok(BackendKind::Pdftotext),
            other => Err(PdfRowsError::Configuration(format!(
                "unknown backend '{other}' (expected one of: lopdf, pdftotext)"
            ))),
        }
    }
}
