use serde::{Deserialize, Serialize};

use crate::error::PdfRowsError;
use crate::parsing::normalize::make_header;

/// An extracted table: slugified field names plus rows of text cells.
///
/// Every row holds exactly `fields.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub fields: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Assemble a table from raw rows, the first of which is the header.
    ///
    /// Short rows are padded with empty strings. Rows longer than the header
    /// widen it with `field_<index>` names.
    pub fn from_lines(lines: Vec<Vec<String>>) -> Result<Self, PdfRowsError> {
        let mut iter = lines.into_iter();
        let mut header = iter.next().ok_or(PdfRowsError::EmptyRegion)?;
        let mut rows: Vec<Vec<String>> = iter.collect();

        let width = rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(header.len()))
            .max()
            .unwrap_or(0);
        if width == 0 {
            return Err(PdfRowsError::EmptyRegion);
        }

        header.resize(width, String::new());
        for row in &mut rows {
            row.resize(width, String::new());
        }

        Ok(Table {
            fields: make_header(&header),
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    /// Cell at `row` for the named field.
    pub fn get(&self, row: usize, field: &str) -> Option<&str> {
        let col = self.field_index(field)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    /// Rows as (field, value) pairs in field order.
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &str)>> + '_ {
        self.rows.iter().map(move |row| {
            self.fields
                .iter()
                .map(String::as_str)
                .zip(row.iter().map(String::as_str))
                .collect()
        })
    }
}
