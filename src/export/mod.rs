mod csv;
mod json;

use crate::db::DatabaseManager;
use crate::types::Row;
use anyhow::Result;
use std::path::Path;

pub use csv::export_csv;
pub use json::export_json;

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// Export a table or the result of a query to a file
pub fn export(
    manager: &mut DatabaseManager,
    format: ExportFormat,
    output_path: &Path,
    table_name: Option<&str>,
    query: Option<&str>,
) -> Result<usize> {
    let result = match (table_name, query) {
        (Some(table), None) => manager.read_all(table)?,
        (None, Some(q)) => manager.execute_read_query(q, 0)?,
        _ => return Err(anyhow::anyhow!("Must specify either --table or --query")),
    };

    write_rows(format, output_path, result.columns(), result.rows())?;
    Ok(result.rows().len())
}

/// Write already-fetched rows in the given format
pub fn write_rows(format: ExportFormat, output_path: &Path, columns: &[String], rows: &[Row]) -> Result<()> {
    match format {
        ExportFormat::Csv => export_csv(output_path, columns, rows),
        ExportFormat::Json => export_json(output_path, columns, rows),
    }
}
