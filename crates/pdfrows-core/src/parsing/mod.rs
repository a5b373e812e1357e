pub mod boundary;
pub mod normalize;

use std::cmp::Ordering;

use crate::extraction::{BBox, PageObjects, RectObject, TextFragment};

/// Default horizontal tolerance (points) used to snap columns.
pub const DEFAULT_X_TOLERANCE: f64 = 3.0;
/// Default vertical tolerance (points) for grouping fragments into lines.
pub const DEFAULT_Y_TOLERANCE: f64 = 3.0;

/// Fragments closer than this many line heights are merged into one.
const MERGE_GAP_RATIO: f64 = 0.5;
/// Merged fragments further apart than this many line heights get a space.
const SPACE_GAP_RATIO: f64 = 0.15;

/// Fragments sharing a baseline band, ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub page_number: usize,
    pub fragments: Vec<TextFragment>,
}

impl TextLine {
    /// Fragment texts joined by a single space.
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn bbox(&self) -> Option<BBox> {
        let mut iter = self.fragments.iter();
        let first = iter.next()?.bbox;
        Some(iter.fold(first, |acc, f| acc.union(&f.bbox)))
    }
}

/// Lines and rects of one page, in reading order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub page_number: usize,
    pub lines: Vec<TextLine>,
    pub rects: Vec<RectObject>,
}

impl PageLayout {
    pub fn from_objects(objects: PageObjects, y_tolerance: f64) -> Self {
        let lines = group_lines(&objects.fragments, y_tolerance)
            .into_iter()
            .map(|fragments| TextLine {
                page_number: objects.page_number,
                fragments: merge_adjacent(fragments),
            })
            .collect();
        PageLayout {
            page_number: objects.page_number,
            lines,
            rects: objects.rects,
        }
    }
}

/// Cluster fragments into lines by vertical centre.
///
/// Fragments are visited top to bottom; a fragment joins the current line
/// while its centre lies within `y_tolerance` of the line's first fragment.
/// Each line comes back sorted by `x_min`.
pub fn group_lines(fragments: &[TextFragment], y_tolerance: f64) -> Vec<Vec<TextFragment>> {
    let mut sorted: Vec<&TextFragment> = fragments
        .iter()
        .filter(|f| !f.text.trim().is_empty())
        .collect();
    sorted.sort_by(|a, b| {
        a.bbox
            .center_y()
            .total_cmp(&b.bbox.center_y())
            .then_with(|| a.bbox.x_min.total_cmp(&b.bbox.x_min))
    });

    let mut lines: Vec<Vec<TextFragment>> = Vec::new();
    let mut anchor = f64::NEG_INFINITY;
    for fragment in sorted {
        let center = fragment.bbox.center_y();
        match lines.last_mut() {
            Some(line) if (center - anchor).abs() <= y_tolerance => {
                line.push(fragment.clone());
            }
            _ => {
                anchor = center;
                lines.push(vec![fragment.clone()]);
            }
        }
    }

    for line in &mut lines {
        line.sort_by(|a, b| by_x_then_y(&a.bbox, &b.bbox));
    }
    lines
}

fn by_x_then_y(a: &BBox, b: &BBox) -> Ordering {
    a.x_min
        .total_cmp(&b.x_min)
        .then_with(|| a.y_min.total_cmp(&b.y_min))
}

/// Merge horizontally adjacent fragments of one line.
///
/// Expects fragments sorted by `x_min`. Two neighbours merge when the gap
/// between them is under half a line height; they are joined with a space
/// when the gap is wide enough to be one.
pub fn merge_adjacent(line: Vec<TextFragment>) -> Vec<TextFragment> {
    let mut merged: Vec<TextFragment> = Vec::with_capacity(line.len());
    for fragment in line {
        if let Some(prev) = merged.last_mut() {
            let height = prev.bbox.height().max(fragment.bbox.height());
            let gap = fragment.bbox.x_min - prev.bbox.x_max;
            if gap < height * MERGE_GAP_RATIO {
                if gap > height * SPACE_GAP_RATIO
                    && !prev.text.ends_with(' ')
                    && !fragment.text.starts_with(' ')
                {
                    prev.text.push(' ');
                }
                prev.text.push_str(&fragment.text);
                prev.bbox = prev.bbox.union(&fragment.bbox);
                continue;
            }
        }
        merged.push(fragment);
    }
    for fragment in &mut merged {
        let trimmed = fragment.text.trim();
        if trimmed.len() != fragment.text.len() {
            fragment.text = trimmed.to_string();
        }
    }
    merged
}

/// Plain text of a page rebuilt from its fragments, one line per text line.
///
/// Lines are merged the same way as for table extraction, so a word drawn
/// by several show-text operators reads the same in both.
pub fn render_text(fragments: &[TextFragment], y_tolerance: f64) -> String {
    group_lines(fragments, y_tolerance)
        .into_iter()
        .map(|line| {
            TextLine {
                page_number: 0,
                fragments: merge_adjacent(line),
            }
            .text()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(text: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> TextFragment {
        TextFragment::new(text, BBox::new(x0, y0, x1, y1))
    }

    #[test]
    fn test_group_lines_by_center() {
        let fragments = vec![
            frag("Total", 200.0, 101.0, 230.0, 111.0),
            frag("Estado", 50.0, 100.0, 90.0, 110.0),
            frag("MT", 50.0, 120.0, 65.0, 130.0),
            frag("10,5", 200.0, 121.5, 222.0, 131.5),
        ];
        let lines = group_lines(&fragments, DEFAULT_Y_TOLERANCE);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0][0].text, "Estado");
        assert_eq!(lines[0][1].text, "Total");
        assert_eq!(lines[1][0].text, "MT");
        assert_eq!(lines[1][1].text, "10,5");
    }

    #[test]
    fn test_group_lines_is_anchored_to_first_fragment() {
        // A slow vertical drift does not chain into one line.
        let fragments = vec![
            frag("a", 0.0, 100.0, 5.0, 110.0),
            frag("b", 10.0, 102.5, 15.0, 112.5),
            frag("c", 20.0, 105.0, 25.0, 115.0),
        ];
        let lines = group_lines(&fragments, DEFAULT_Y_TOLERANCE);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 2);
        assert_eq!(lines[1][0].text, "c");
    }

    #[test]
    fn test_group_lines_skips_blank_fragments() {
        let fragments = vec![frag("  ", 0.0, 0.0, 5.0, 10.0)];
        assert!(group_lines(&fragments, DEFAULT_Y_TOLERANCE).is_empty());
    }

    #[test]
    fn test_merge_adjacent_words() {
        // Gap of 3pt on a 10pt line: merged with a space.
        let line = vec![
            frag("Mato", 50.0, 100.0, 75.0, 110.0),
            frag("Grosso", 78.0, 100.0, 110.0, 110.0),
            frag("12,3", 200.0, 100.0, 220.0, 110.0),
        ];
        let merged = merge_adjacent(line);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "Mato Grosso");
        assert_eq!(merged[0].bbox.x_max, 110.0);
        assert_eq!(merged[1].text, "12,3");
    }

    #[test]
    fn test_merge_adjacent_glyph_runs_without_space() {
        let line = vec![
            frag("Var", 50.0, 100.0, 65.0, 110.0),
            frag("iação", 65.5, 100.0, 90.0, 110.0),
        ];
        let merged = merge_adjacent(line);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "Variação");
    }

    #[test]
    fn test_render_text_orders_lines() {
        let fragments = vec![
            frag("second", 10.0, 40.0, 50.0, 50.0),
            frag("first", 10.0, 10.0, 40.0, 20.0),
            frag("line", 100.0, 10.0, 130.0, 20.0),
        ];
        assert_eq!(render_text(&fragments, 3.0), "first line\nsecond");
    }

    #[test]
    fn test_render_text_joins_split_word() {
        let fragments = vec![
            frag("Var", 50.0, 100.0, 65.0, 110.0),
            frag("iação", 65.0, 100.0, 90.0, 110.0),
            frag("Área", 120.0, 100.0, 140.0, 110.0),
        ];
        let text = render_text(&fragments, DEFAULT_Y_TOLERANCE);
        assert_eq!(text, "Variação Área");

        let layout = PageLayout::from_objects(
            PageObjects {
                page_number: 1,
                fragments,
                ..Default::default()
            },
            DEFAULT_Y_TOLERANCE,
        );
        assert_eq!(layout.lines[0].text(), text);
    }

    #[test]
    fn test_line_text_and_bbox() {
        let line = TextLine {
            page_number: 1,
            fragments: vec![
                frag("MILHO", 10.0, 10.0, 40.0, 20.0),
                frag("SAFRA", 100.0, 9.0, 130.0, 21.0),
            ],
        };
        assert_eq!(line.text(), "MILHO SAFRA");
        let bbox = line.bbox().unwrap();
        assert_eq!(bbox.y_min, 9.0);
        assert_eq!(bbox.x_max, 130.0);
    }
}
