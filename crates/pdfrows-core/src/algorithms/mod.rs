pub mod header_position;
pub mod rects_boundaries;
pub mod y_groups;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PdfRowsError;
use crate::extraction::PdfBackend;
use crate::parsing::boundary::Region;
use crate::parsing::{DEFAULT_X_TOLERANCE, DEFAULT_Y_TOLERANCE};

/// Rebuilds rows of cells from a located region.
pub trait ExtractionAlgorithm {
    fn name(&self) -> &'static str;

    /// Whether the backend must report rectangle/line graphics.
    fn requires_rects(&self) -> bool {
        false
    }

    /// Raw rows, header first. Rows may differ in length.
    fn lines(&self, region: &Region) -> Result<Vec<Vec<String>>, PdfRowsError>;
}

/// Tolerances shared by the algorithms, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub x: f64,
    pub y: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances {
            x: DEFAULT_X_TOLERANCE,
            y: DEFAULT_Y_TOLERANCE,
        }
    }
}

/// Built-in table reconstruction strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    /// One row per text line, cells split on wide whitespace.
    #[default]
    #[serde(rename = "y-groups", alias = "default", alias = "plain")]
    YGroups,
    /// Columns defined by the header fragments' left edges.
    #[serde(rename = "header-position")]
    HeaderPosition,
    /// Cells bounded by the rectangles and rules drawn on the page.
    #[serde(rename = "rects-boundaries")]
    RectsBoundaries,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [
        Algorithm::YGroups,
        Algorithm::HeaderPosition,
        Algorithm::RectsBoundaries,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::YGroups => "y-groups",
            Algorithm::HeaderPosition => "header-position",
            Algorithm::RectsBoundaries => "rects-boundaries",
        }
    }

    pub fn build(&self, tolerances: Tolerances) -> Box<dyn ExtractionAlgorithm> {
        match self {
            Algorithm::YGroups => Box::new(y_groups::YGroups),
            Algorithm::HeaderPosition => {
                Box::new(header_position::HeaderPosition::new(tolerances.x))
            }
            Algorithm::RectsBoundaries => Box::new(rects_boundaries::RectsBoundaries::new(
                tolerances.x,
                tolerances.y,
            )),
        }
    }

    pub fn requires_rects(&self) -> bool {
        matches!(self, Algorithm::RectsBoundaries)
    }

    /// Fail with `UnsupportedAlgorithm` when the backend lacks a capability
    /// this algorithm needs.
    pub fn check_backend(&self, backend: &dyn PdfBackend) -> Result<(), PdfRowsError> {
        if self.requires_rects() && !backend.supports_rects() {
            return Err(PdfRowsError::UnsupportedAlgorithm {
                algorithm: self.name().to_string(),
                backend: backend.backend_name().to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = PdfRowsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "y-groups" | "default" | "plain" => Ok(Algorithm::YGroups),
            "header-position" => Ok(Algorithm::HeaderPosition),
            "rects-boundaries" => Ok(Algorithm::RectsBoundaries),
            other => Err(PdfRowsError::Configuration(format!(
                "unknown algorithm '{other}' \
                 (expected one of: y-groups, header-position, rects-boundaries)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::lopdf_backend::LopdfBackend;
    use crate::extraction::pdftotext::PdftotextBackend;

    #[test]
    fn test_algorithm_names_round_trip() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.name().parse::<Algorithm>().unwrap(), algorithm);
            let built = algorithm.build(Tolerances::default());
            assert_eq!(built.name(), algorithm.name());
            assert_eq!(built.requires_rects(), algorithm.requires_rects());
        }
        assert_eq!("plain".parse::<Algorithm>().unwrap(), Algorithm::YGroups);
        assert_eq!("Header_Position".parse::<Algorithm>().unwrap(), Algorithm::HeaderPosition);
    }

    #[test]
    fn test_unknown_algorithm_is_configuration_error() {
        let err = "stream".parse::<Algorithm>().unwrap_err();
        assert!(matches!(err, PdfRowsError::Configuration(_)));
    }

    #[test]
    fn test_rects_need_capable_backend() {
        assert!(Algorithm::RectsBoundaries.check_backend(&LopdfBackend::new()).is_ok());
        let err = Algorithm::RectsBoundaries
            .check_backend(&PdftotextBackend::new())
            .unwrap_err();
        match err {
            PdfRowsError::UnsupportedAlgorithm { algorithm, backend } => {
                assert_eq!(algorithm, "rects-boundaries");
                assert_eq!(backend, "pdftotext");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(Algorithm::HeaderPosition.check_backend(&PdftotextBackend::new()).is_ok());
    }

    #[test]
    fn test_algorithm_json_names() {
        let a: Algorithm = serde_json::from_str(r#""rects-boundaries""#).unwrap();
        assert_eq!(a, Algorithm::RectsBoundaries);
        let a: Algorithm = serde_json::from_str(r#""default""#).unwrap();
        assert_eq!(a, Algorithm::YGroups);
        assert_eq!(serde_json::to_string(&Algorithm::YGroups).unwrap(), r#""y-groups""#);
    }
}
