use serde::ser::{Serialize, SerializeMap, Serializer};

use pdfrows_core::error::PdfRowsError;
use pdfrows_core::Table;

/// One row as a JSON object, keys in field order.
struct Record<'a>(Vec<(&'a str, &'a str)>);

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, value) in &self.0 {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

/// The table as a JSON array of objects keyed by field name.
pub fn format(table: &Table) -> Result<String, PdfRowsError> {
    let records: Vec<Record<'_>> = table.records().map(Record).collect();
    let mut json = serde_json::to_string_pretty(&records)?;
    json.push('\n');
    Ok(json)
}
