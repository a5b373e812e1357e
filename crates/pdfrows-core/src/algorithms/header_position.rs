use super::ExtractionAlgorithm;
use crate::error::PdfRowsError;
use crate::parsing::boundary::Region;

/// Columns start at the left edges of the header fragments.
///
/// The first line of the region is the header. Every later fragment lands in
/// the last column starting no further right than `x_min + x_tolerance`.
/// A fragment starting up to `x_tolerance` left of a column therefore joins
/// that column rather than the one before it. Fragments left of every column
/// land in the first one.
pub struct HeaderPosition {
    x_tolerance: f64,
}

impl HeaderPosition {
    pub fn new(x_tolerance: f64) -> Self {
        HeaderPosition { x_tolerance }
    }

    fn column_for(&self, starts: &[f64], x_min: f64) -> usize {
        starts
            .iter()
            .rposition(|&start| start <= x_min + self.x_tolerance)
            .unwrap_or(0)
    }
}

impl ExtractionAlgorithm for HeaderPosition {
    fn name(&self) -> &'static str {
        "header-position"
    }

    fn lines(&self, region: &Region) -> Result<Vec<Vec<String>>, PdfRowsError> {
        let mut lines = region.lines();
        let Some(header) = lines.next() else {
            return Ok(Vec::new());
        };

        let starts: Vec<f64> = header.fragments.iter().map(|f| f.bbox.x_min).collect();
        tracing::debug!(columns = starts.len(), "header-position column starts: {starts:?}");

        let mut rows = vec![header
            .fragments
            .iter()
            .map(|f| f.text.clone())
            .collect::<Vec<_>>()];

        for line in lines {
            let mut cells = vec![String::new(); starts.len()];
            for fragment in &line.fragments {
                let cell = &mut cells[self.column_for(&starts, fragment.bbox.x_min)];
                if !cell.is_empty() {
                    cell.push(' ');
                }
                cell.push_str(fragment.text.trim());
            }
            if cells.iter().any(|c| !c.is_empty()) {
                rows.push(cells);
            }
        }
        Ok(rows)
    }
}
