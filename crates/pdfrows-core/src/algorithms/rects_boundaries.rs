use super::ExtractionAlgorithm;
use crate::error::PdfRowsError;
use crate::extraction::TextFragment;
use crate::parsing::boundary::Region;
use crate::parsing::PageLayout;

/// Cells bounded by the edges of the rectangles and rules on the page.
///
/// Column separators are the distinct x edges of the region's rects, row
/// separators the distinct y edges; edges closer than the tolerance are
/// snapped together. A fragment belongs to the cell containing its centre.
pub struct RectsBoundaries {
    x_tolerance: f64,
    y_tolerance: f64,
}

impl RectsBoundaries {
    pub fn new(x_tolerance: f64, y_tolerance: f64) -> Self {
        RectsBoundaries {
            x_tolerance,
            y_tolerance,
        }
    }

    fn page_rows(&self, page: &PageLayout) -> Vec<Vec<String>> {
        let xs = snap_edges(
            page.rects.iter().flat_map(|r| [r.bbox.x_min, r.bbox.x_max]),
            self.x_tolerance,
        );
        let ys = snap_edges(
            page.rects.iter().flat_map(|r| [r.bbox.y_min, r.bbox.y_max]),
            self.y_tolerance,
        );
        if xs.len() < 2 || ys.len() < 2 {
            return Vec::new();
        }

        let mut grid: Vec<Vec<Vec<&TextFragment>>> =
            vec![vec![Vec::new(); xs.len() - 1]; ys.len() - 1];
        for fragment in page.lines.iter().flat_map(|l| l.fragments.iter()) {
            let col = interval_index(&xs, fragment.bbox.center_x());
            let row = interval_index(&ys, fragment.bbox.center_y());
            if let (Some(row), Some(col)) = (row, col) {
                grid[row][col].push(fragment);
            }
        }

        grid.into_iter()
            .map(|cells| {
                cells
                    .into_iter()
                    .map(|fragments| {
                        fragments
                            .iter()
                            .map(|f| f.text.trim())
                            .filter(|t| !t.is_empty())
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|cells| cells.iter().any(|c| !c.is_empty()))
            .collect()
    }
}

impl ExtractionAlgorithm for RectsBoundaries {
    fn name(&self) -> &'static str {
        "rects-boundaries"
    }

    fn requires_rects(&self) -> bool {
        true
    }

    fn lines(&self, region: &Region) -> Result<Vec<Vec<String>>, PdfRowsError> {
        let rect_count: usize = region.pages.iter().map(|p| p.rects.len()).sum();
        if rect_count == 0 {
            if !region.is_empty() {
                tracing::debug!("region has text but no rects to build cells from");
            }
            return Err(PdfRowsError::EmptyRegion);
        }
        tracing::debug!(rects = rect_count, "building cells from rect edges");

        Ok(region
            .pages
            .iter()
            .flat_map(|page| self.page_rows(page))
            .collect())
    }
}

/// Sorted, de-duplicated edge positions. Values within `tolerance` of the
/// first value of a cluster collapse into it.
fn snap_edges(values: impl Iterator<Item = f64>, tolerance: f64) -> Vec<f64> {
    let mut values: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    values.sort_by(f64::total_cmp);

    let mut edges: Vec<f64> = Vec::new();
    for v in values {
        match edges.last() {
            Some(&last) if v - last <= tolerance => {}
            _ => edges.push(v),
        }
    }
    edges
}

/// Index `i` such that `edges[i] <= value < edges[i + 1]`.
fn interval_index(edges: &[f64], value: f64) -> Option<usize> {
    edges
        .windows(2)
        .position(|w| value >= w[0] && value < w[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{BBox, RectObject};
    use crate::parsing::TextLine;

    fn cell_rect(x0: f64, y0: f64, x1: f64, y1: f64) -> RectObject {
        RectObject {
            bbox: BBox::new(x0, y0, x1, y1),
            fill: false,
            stroke: true,
        }
    }

    fn frag(text: &str, x: f64, y: f64) -> TextFragment {
        TextFragment::new(text, BBox::new(x, y, x + 20.0, y + 8.0))
    }

    #[test]
    fn test_snap_edges() {
        let edges = snap_edges([10.0, 110.0, 10.4, 60.0, 109.9, 60.2].into_iter(), 1.0);
        assert_eq!(edges, vec![10.0, 60.0, 109.9]);
    }

    #[test]
    fn test_interval_index() {
        let edges = [0.0, 10.0, 20.0];
        assert_eq!(interval_index(&edges, 5.0), Some(0));
        assert_eq!(interval_index(&edges, 10.0), Some(1));
        assert_eq!(interval_index(&edges, 20.0), None);
        assert_eq!(interval_index(&edges, -1.0), None);
    }

    #[test]
    fn test_grid_cells_from_rects() {
        // 2x2 grid of cells, 100 wide and 20 high, top-left at (50, 100).
        let rects = vec![
            cell_rect(50.0, 100.0, 150.0, 120.0),
            cell_rect(150.0, 100.0, 250.0, 120.0),
            cell_rect(50.0, 120.0, 150.0, 140.0),
            cell_rect(150.0, 120.0, 250.0, 140.0),
        ];
        let lines = vec![
            TextLine {
                page_number: 1,
                fragments: vec![frag("Estado", 55.0, 106.0), frag("Total", 155.0, 106.0)],
            },
            TextLine {
                page_number: 1,
                fragments: vec![frag("MT", 55.0, 126.0), frag("10", 155.0, 126.0)],
            },
            TextLine {
                page_number: 1,
                // Outside the grid.
                fragments: vec![frag("Fonte: Conab", 55.0, 160.0)],
            },
        ];
        let region = Region {
            pages: vec![PageLayout {
                page_number: 1,
                lines,
                rects,
            }],
        };
        let rows = RectsBoundaries::new(3.0, 3.0).lines(&region).unwrap();
        assert_eq!(rows, vec![vec!["Estado", "Total"], vec!["MT", "10"]]);
    }

    #[test]
    fn test_no_rects_is_empty_region() {
        let region = Region {
            pages: vec![PageLayout {
                page_number: 1,
                lines: vec![TextLine {
                    page_number: 1,
                    fragments: vec![frag("text", 0.0, 0.0)],
                }],
                rects: Vec::new(),
            }],
        };
        let err = RectsBoundaries::new(3.0, 3.0).lines(&region).unwrap_err();
        assert!(matches!(err, PdfRowsError::EmptyRegion));
    }
}
