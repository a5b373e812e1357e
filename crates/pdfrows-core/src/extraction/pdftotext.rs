use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{check_page, BBox, PageObjects, PdfBackend, PdfDocument, PdfSource, TextFragment};
use crate::error::PdfRowsError;

/// PDF backend driving pdftotext and pdfinfo (from poppler-utils).
///
/// Words come from `pdftotext -bbox`, which already uses a top-left origin.
/// Poppler reports no graphics, so rect-based algorithms are unavailable.
pub struct PdftotextBackend;

impl PdftotextBackend {
    pub fn new() -> Self {
        PdftotextBackend
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftotextBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBackend for PdftotextBackend {
    fn open(&self, source: PdfSource<'_>) -> Result<Box<dyn PdfDocument>, PdfRowsError> {
        if !Self::is_available() {
            return Err(PdfRowsError::Configuration(
                "the pdftotext backend needs poppler-utils (pdftotext, pdfinfo) on PATH".into(),
            ));
        }

        let file = match source {
            PdfSource::Path(path) => PdfFile::Path(path.to_path_buf()),
            other => PdfFile::spool(&other.read_bytes()?)?,
        };
        let page_count = read_page_count(file.path())?;
        tracing::debug!(
            path = %file.path().display(),
            pages = page_count,
            "opened document with pdftotext"
        );

        Ok(Box::new(PdftotextDocument { file, page_count }))
    }

    fn supports_rects(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

/// The file poppler reads. A spooled temp file is removed when dropped.
enum PdfFile {
    Path(PathBuf),
    Temp(tempfile::NamedTempFile),
}

impl PdfFile {
    fn spool(bytes: &[u8]) -> Result<Self, PdfRowsError> {
        let mut tmpfile = tempfile::Builder::new().suffix(".pdf").tempfile()?;
        tmpfile.write_all(bytes)?;
        tmpfile.flush()?;
        Ok(PdfFile::Temp(tmpfile))
    }

    fn path(&self) -> &Path {
        match self {
            PdfFile::Path(path) => path,
            PdfFile::Temp(tmp) => tmp.path(),
        }
    }
}

pub struct PdftotextDocument {
    file: PdfFile,
    page_count: usize,
}

impl PdfDocument for PdftotextDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_text(&self, page_number: usize) -> Result<String, PdfRowsError> {
        check_page(page_number, self.page_count)?;
        let page = page_number.to_string();
        let stdout = run_tool(
            "pdftotext",
            &["-f", &page, "-l", &page, "-enc", "UTF-8"],
            self.file.path(),
        )?;
        let text = String::from_utf8_lossy(&stdout);
        Ok(text.trim_end_matches(['\x0c', '\n']).to_string())
    }

    fn page_objects(&self, page_number: usize) -> Result<PageObjects, PdfRowsError> {
        check_page(page_number, self.page_count)?;
        let page = page_number.to_string();
        let stdout = run_tool(
            "pdftotext",
            &["-f", &page, "-l", &page, "-bbox", "-enc", "UTF-8"],
            self.file.path(),
        )?;
        let xml = String::from_utf8_lossy(&stdout);
        let mut pages = parse_bbox_xml(&xml)?;

        // Only one page was requested; an empty page may still be missing.
        let mut objects = if pages.is_empty() {
            PageObjects::default()
        } else {
            pages.swap_remove(0)
        };
        objects.page_number = page_number;
        tracing::trace!(
            page = page_number,
            words = objects.fragments.len(),
            "parsed pdftotext bbox output"
        );
        Ok(objects)
    }
}

/// Run a poppler tool as `<program> <args> <pdf> -` and return its stdout.
fn run_tool(program: &str, args: &[&str], pdf: &Path) -> Result<Vec<u8>, PdfRowsError> {
    tracing::trace!(program, ?args, pdf = %pdf.display(), "running poppler tool");
    let mut command = Command::new(program);
    command.args(args).arg(pdf);
    if program == "pdftotext" {
        command.arg("-"); // output to stdout
    }

    let output = command.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PdfRowsError::Configuration(format!("{program} was not found on PATH"))
        } else {
            PdfRowsError::document(format!("failed to run {program}"), e)
        }
    })?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PdfRowsError::document_msg(format!(
            "{program} exited with status {code}: {}",
            stderr.trim()
        )));
    }
    Ok(output.stdout)
}

fn read_page_count(pdf: &Path) -> Result<usize, PdfRowsError> {
    let stdout = run_tool("pdfinfo", &[], pdf)?;
    parse_pdfinfo_pages(&String::from_utf8_lossy(&stdout))
        .ok_or_else(|| PdfRowsError::document_msg("pdfinfo did not report a page count"))
}

fn parse_pdfinfo_pages(info: &str) -> Option<usize> {
    info.lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|rest| rest.trim().parse().ok())
}

/// Parse the XHTML written by `pdftotext -bbox` into one `PageObjects` per
/// `<page>` element. Page numbers are left at zero for the caller to set.
fn parse_bbox_xml(xml: &str) -> Result<Vec<PageObjects>, PdfRowsError> {
    let mut reader = Reader::from_str(xml);
    let mut pages: Vec<PageObjects> = Vec::new();
    let mut word: Option<(BBox, String)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| PdfRowsError::document("malformed pdftotext -bbox output", e))?;
        match event {
            Event::Start(e) if e.name().as_ref() == b"page" => {
                pages.push(page_from_tag(&e)?);
            }
            Event::Empty(e) if e.name().as_ref() == b"page" => {
                pages.push(page_from_tag(&e)?);
            }
            Event::Start(e) if e.name().as_ref() == b"word" => {
                word = Some((word_bbox(&e)?, String::new()));
            }
            Event::Text(t) => {
                if let Some((_, text)) = word.as_mut() {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| PdfRowsError::document("bad text in pdftotext output", e))?;
                    text.push_str(&unescaped);
                }
            }
            Event::End(e) if e.name().as_ref() == b"word" => {
                if let Some((bbox, text)) = word.take() {
                    let text = text.trim();
                    match pages.last_mut() {
                        Some(page) if !text.is_empty() => {
                            page.fragments.push(TextFragment::new(text, bbox));
                        }
                        _ => {}
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(pages)
}

fn page_from_tag(tag: &BytesStart<'_>) -> Result<PageObjects, PdfRowsError> {
    Ok(PageObjects {
        width: attr_f64(tag, b"width")?.unwrap_or(0.0),
        height: attr_f64(tag, b"height")?.unwrap_or(0.0),
        ..PageObjects::default()
    })
}

fn word_bbox(tag: &BytesStart<'_>) -> Result<BBox, PdfRowsError> {
    let coord = |name: &[u8]| -> Result<f64, PdfRowsError> {
        attr_f64(tag, name)?.ok_or_else(|| {
            PdfRowsError::document_msg(format!(
                "word without {} in pdftotext output",
                String::from_utf8_lossy(name)
            ))
        })
    };
    Ok(BBox::new(
        coord(b"xMin")?,
        coord(b"yMin")?,
        coord(b"xMax")?,
        coord(b"yMax")?,
    ))
}

fn attr_f64(tag: &BytesStart<'_>, name: &[u8]) -> Result<Option<f64>, PdfRowsError> {
    for attr in tag.attributes() {
        let attr =
            attr.map_err(|e| PdfRowsError::document("bad attribute in pdftotext output", e))?;
        if attr.key.as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|e| PdfRowsError::document("bad attribute in pdftotext output", e))?;
            return Ok(value.trim().parse().ok());
        }
    }
    Ok(None)
}
