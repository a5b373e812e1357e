use pdfrows_core::error::PdfRowsError;
use pdfrows_core::Table;

/// The table as CSV, field names first.
pub fn format(table: &Table) -> Result<String, PdfRowsError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&table.fields)
        .map_err(std::io::Error::from)?;
    for row in &table.rows {
        writer.write_record(row).map_err(std::io::Error::from)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PdfRowsError::Io(std::io::Error::other(e)))
}
