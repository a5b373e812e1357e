use super::ExtractionAlgorithm;
use crate::error::PdfRowsError;
use crate::parsing::boundary::Region;

/// One row per text line. A fragment holding several cells (as backends
/// that merge a whole line into one run tend to produce) is split on gaps
/// of two or more whitespace characters, or on tabs.
pub struct YGroups;

impl ExtractionAlgorithm for YGroups {
    fn name(&self) -> &'static str {
        "y-groups"
    }

    fn lines(&self, region: &Region) -> Result<Vec<Vec<String>>, PdfRowsError> {
        Ok(region
            .lines()
            .map(|line| {
                line.fragments
                    .iter()
                    .flat_map(|f| split_by_whitespace_gaps(&f.text))
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|row| !row.is_empty())
            .collect())
    }
}

/// Split a line by gaps of 2+ whitespace characters or any tab.
fn split_by_whitespace_gaps(line: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = None;
    let mut gap_start = 0;
    let mut space_count = 0;

    for (i, c) in line.char_indices() {
        if c.is_whitespace() {
            if space_count == 0 {
                gap_start = i;
            }
            space_count += 1;
            if space_count >= 2 || c == '\t' {
                if let Some(s) = start.take() {
                    segments.push(&line[s..gap_start]);
                }
            }
        } else {
            if start.is_none() {
                start = Some(i);
            }
            space_count = 0;
        }
    }

    if let Some(s) = start {
        segments.push(line[s..].trim_end());
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{BBox, TextFragment};
    use crate::parsing::{PageLayout, TextLine};

    #[test]
    fn test_split_by_whitespace_gaps() {
        let segments = split_by_whitespace_gaps("Mato Grosso     12.345,6     -3,1");
        assert_eq!(segments, vec!["Mato Grosso", "12.345,6", "-3,1"]);
    }

    #[test]
    fn test_split_on_tabs_and_trailing_space() {
        assert_eq!(split_by_whitespace_gaps("a\tb c "), vec!["a", "b c"]);
        assert_eq!(split_by_whitespace_gaps("  lead"), vec!["lead"]);
        assert!(split_by_whitespace_gaps("   ").is_empty());
    }

    #[test]
    fn test_split_multibyte_boundaries() {
        assert_eq!(
            split_by_whitespace_gaps("Região  Variação"),
            vec!["Região", "Variação"]
        );
    }

    #[test]
    fn test_rows_follow_lines() {
        let frag = |text: &str, x: f64, y: f64| {
            TextFragment::new(text, BBox::new(x, y, x + 40.0, y + 10.0))
        };
        let region = Region {
            pages: vec![PageLayout {
                page_number: 1,
                lines: vec![
                    TextLine {
                        page_number: 1,
                        fragments: vec![
                            frag("UF", 10.0, 10.0),
                            frag("Área  Produção", 100.0, 10.0),
                        ],
                    },
                    TextLine {
                        page_number: 1,
                        fragments: vec![frag("MT", 10.0, 30.0), frag("4.600", 100.0, 30.0)],
                    },
                ],
                rects: Vec::new(),
            }],
        };
        let rows = YGroups.lines(&region).unwrap();
        assert_eq!(
            rows,
            vec![vec!["UF", "Área", "Produção"], vec!["MT", "4.600"]]
        );
    }
}
