use std::path::PathBuf;

/// Boxed cause carried by errors that wrap a backend failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum PdfRowsError {
    #[error("could not read PDF document: {message}")]
    Document {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("page {page} is out of range {}", range_hint(.page_count))]
    OutOfRange {
        page: usize,
        /// Unknown when the page was rejected before opening the document.
        page_count: Option<usize>,
    },

    #[error("start marker {marker} was not found in the selected pages")]
    MarkerNotFound { marker: String },

    #[error("algorithm '{algorithm}' is not supported by backend '{backend}'")]
    UnsupportedAlgorithm { algorithm: String, backend: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no table content found between the markers")]
    EmptyRegion,

    #[error("failed to load options from {path}: {reason}")]
    OptionsLoad { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn range_hint(page_count: &Option<usize>) -> String {
    match page_count {
        Some(count) => format!("(document has {count} pages)"),
        None => "(pages are numbered from 1)".to_string(),
    }
}

impl PdfRowsError {
    /// Wrap a backend failure, keeping it as the error source.
    pub fn document(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        PdfRowsError::Document {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// A document failure without an underlying error value.
    pub fn document_msg(message: impl Into<String>) -> Self {
        PdfRowsError::Document {
            message: message.into(),
            source: None,
        }
    }
}
