use std::fmt;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{PageLayout, TextLine};
use crate::error::PdfRowsError;

/// Slack (points) when deciding whether a rect lies inside a region band.
const RECT_BAND_SLACK: f64 = 1.0;

/// Delimits a table region: a literal substring or a regex searched
/// anywhere in a line.
///
/// In JSON a literal is a plain string and a pattern is `{"regex": "..."}`.
#[derive(Debug, Clone)]
pub enum Marker {
    Literal(String),
    Pattern(Regex),
}

impl Marker {
    pub fn literal(text: impl Into<String>) -> Self {
        Marker::Literal(text.into())
    }

    /// Compile a regex marker. An invalid pattern is a configuration error.
    pub fn pattern(pattern: &str) -> Result<Self, PdfRowsError> {
        Regex::new(pattern)
            .map(Marker::Pattern)
            .map_err(|e| PdfRowsError::Configuration(format!("invalid marker regex: {e}")))
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            Marker::Literal(literal) => text.contains(literal.as_str()),
            Marker::Pattern(re) => re.is_match(text),
        }
    }

    /// A line matches when its joined text or any single fragment matches.
    pub fn matches_line(&self, line: &TextLine) -> bool {
        self.matches(&line.text()) || line.fragments.iter().any(|f| self.matches(&f.text))
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Literal(text) => write!(f, "{text:?}"),
            Marker::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl PartialEq for Marker {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Marker::Literal(a), Marker::Literal(b)) => a == b,
            (Marker::Pattern(a), Marker::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl From<&str> for Marker {
    fn from(text: &str) -> Self {
        Marker::Literal(text.to_string())
    }
}

impl From<String> for Marker {
    fn from(text: String) -> Self {
        Marker::Literal(text)
    }
}

impl From<Regex> for Marker {
    fn from(re: Regex) -> Self {
        Marker::Pattern(re)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum MarkerRepr {
    Literal(String),
    Pattern { regex: String },
}

impl Serialize for Marker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = match self {
            Marker::Literal(text) => MarkerRepr::Literal(text.clone()),
            Marker::Pattern(re) => MarkerRepr::Pattern {
                regex: re.as_str().to_string(),
            },
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Marker {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match MarkerRepr::deserialize(deserializer)? {
            MarkerRepr::Literal(text) => Ok(Marker::Literal(text)),
            MarkerRepr::Pattern { regex } => Regex::new(&regex)
                .map(Marker::Pattern)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// The part of the selected pages that lies between the markers.
///
/// Pages appear in selection order; a page is present when any part of it
/// falls inside the region, even if none of its lines do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region {
    pub pages: Vec<PageLayout>,
}

impl Region {
    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.pages.iter().flat_map(|p| p.lines.iter())
    }

    pub fn line_count(&self) -> usize {
        self.pages.iter().map(|p| p.lines.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.line_count() == 0
    }
}

/// Position of a line: (page index, line index).
type LinePos = (usize, usize);

/// Cut the region between `starts_after` and `ends_before` out of `pages`.
///
/// Both markers are exclusive. The first matching line wins; the end marker
/// is only searched after the start line. A start marker that never matches
/// is an error, an end marker that never matches runs to the last line.
pub fn locate(
    pages: Vec<PageLayout>,
    starts_after: Option<&Marker>,
    ends_before: Option<&Marker>,
) -> Result<Region, PdfRowsError> {
    let positions: Vec<LinePos> = pages
        .iter()
        .enumerate()
        .flat_map(|(p, page)| (0..page.lines.len()).map(move |l| (p, l)))
        .collect();
    let line_at = |(p, l): LinePos| &pages[p].lines[l];

    let (start_index, start_hit) = match starts_after {
        None => (0, None),
        Some(marker) => {
            let index = positions
                .iter()
                .position(|&pos| marker.matches_line(line_at(pos)))
                .ok_or_else(|| PdfRowsError::MarkerNotFound {
                    marker: marker.to_string(),
                })?;
            let pos = positions[index];
            tracing::debug!(
                %marker,
                page = pages[pos.0].page_number,
                line = pos.1,
                "start marker matched"
            );
            (index + 1, Some(pos))
        }
    };

    let end_hit = ends_before.and_then(|marker| {
        let found = positions[start_index..]
            .iter()
            .find(|&&pos| marker.matches_line(line_at(pos)))
            .copied();
        match found {
            Some(pos) => {
                tracing::debug!(
                    %marker,
                    page = pages[pos.0].page_number,
                    line = pos.1,
                    "end marker matched"
                );
            }
            None => tracing::debug!(%marker, "end marker not found, reading to the last line"),
        }
        found
    });

    // Band limits as positions: inclusive start, exclusive end.
    let first_page = start_hit.map_or(0, |(p, _)| p);
    let last_page = end_hit.map_or(pages.len().saturating_sub(1), |(p, _)| p);
    let start_bound = start_hit.map(|(p, l)| (p, l + 1)).unwrap_or((0, 0));
    let end_bound = end_hit.unwrap_or((pages.len(), 0));

    let mut region = Region::default();
    for (p, page) in pages.into_iter().enumerate() {
        if outside_pages(p, first_page, last_page) {
            continue;
        }
        let top = match start_hit {
            Some((sp, sl)) if sp == p => band_edge(&page.lines[sl], Edge::Bottom),
            _ => f64::NEG_INFINITY,
        };
        let bottom = match end_hit {
            Some((ep, el)) if ep == p => band_edge(&page.lines[el], Edge::Top),
            _ => f64::INFINITY,
        };

        let page_number = page.page_number;
        let lines: Vec<TextLine> = page
            .lines
            .into_iter()
            .enumerate()
            .filter(|(l, _)| (p, *l) >= start_bound && (p, *l) < end_bound)
            .map(|(_, line)| line)
            .collect();
        let rects = page
            .rects
            .into_iter()
            .filter(|r| {
                r.bbox.y_min >= top - RECT_BAND_SLACK && r.bbox.y_max <= bottom + RECT_BAND_SLACK
            })
            .collect();

        region.pages.push(PageLayout {
            page_number,
            lines,
            rects,
        });
    }

    tracing::debug!(
        pages = region.pages.len(),
        lines = region.line_count(),
        "located table region"
    );
    Ok(region)
}

fn outside_pages(page: usize, first: usize, last: usize) -> bool {
    page < first || page > last
}

enum Edge {
    Top,
    Bottom,
}

fn band_edge(line: &TextLine, edge: Edge) -> f64 {
    match (line.bbox(), edge) {
        (Some(b), Edge::Top) => b.y_min,
        (Some(b), Edge::Bottom) => b.y_max,
        (None, Edge::Top) => f64::INFINITY,
        (None, Edge::Bottom) => f64::NEG_INFINITY,
    }
}
