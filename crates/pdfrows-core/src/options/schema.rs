use serde::{Deserialize, Serialize};

use crate::algorithms::{Algorithm, Tolerances};
use crate::extraction::BackendKind;
use crate::parsing::boundary::Marker;
use crate::parsing::{DEFAULT_X_TOLERANCE, DEFAULT_Y_TOLERANCE};

/// Options for `import_from_pdf`.
///
/// Every field is optional in JSON:
///
/// ```json
/// {
///   "backend": "lopdf",
///   "page_numbers": [1, 2],
///   "starts_after": { "regex": "MILHO SAFRA 16/17: ACOMPANHAMENTO DE .*" },
///   "ends_before": "*Variação em pontos percentuais.",
///   "algorithm": "header-position",
///   "x_tolerance": 3.0,
///   "y_tolerance": 3.0
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportOptions {
    #[serde(default)]
    pub backend: BackendKind,

    /// 1-indexed pages in processing order; all pages when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_numbers: Option<Vec<usize>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_after: Option<Marker>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_before: Option<Marker>,

    #[serde(default)]
    pub algorithm: Algorithm,

    #[serde(default = "default_x_tolerance")]
    pub x_tolerance: f64,

    #[serde(default = "default_y_tolerance")]
    pub y_tolerance: f64,
}

fn default_x_tolerance() -> f64 {
    DEFAULT_X_TOLERANCE
}

fn default_y_tolerance() -> f64 {
    DEFAULT_Y_TOLERANCE
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            backend: BackendKind::default(),
            page_numbers: None,
            starts_after: None,
            ends_before: None,
            algorithm: Algorithm::default(),
            x_tolerance: DEFAULT_X_TOLERANCE,
            y_tolerance: DEFAULT_Y_TOLERANCE,
        }
    }
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn pages(mut self, pages: impl IntoIterator<Item = usize>) -> Self {
        self.page_numbers = Some(pages.into_iter().collect());
        self
    }

    pub fn starts_after(mut self, marker: impl Into<Marker>) -> Self {
        self.starts_after = Some(marker.into());
        self
    }

    pub fn ends_before(mut self, marker: impl Into<Marker>) -> Self {
        self.ends_before = Some(marker.into());
        self
    }

    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn tolerances(&self) -> Tolerances {
        Tolerances {
            x: self.x_tolerance,
            y: self.y_tolerance,
        }
    }
}
