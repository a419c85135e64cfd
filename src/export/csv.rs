use crate::types::{Row, Value};
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;

/// Export rows to CSV
pub fn export_csv(output_path: &Path, columns: &[String], rows: &[Row]) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;

    let mut writer = csv::Writer::from_writer(file);

    writer
        .write_record(columns)
        .context("Failed to write CSV header")?;

    for row in rows {
        let record = row.iter().map(|value| match value {
            Value::Null => String::new(),
            Value::Integer(i) => i.to_string(),
            Value::Real(r) => r.to_string(),
            Value::Text(t) => t.clone(),
            Value::Blob(_) => "<BLOB>".to_string(),
        });
        writer
            .write_record(record)
            .context("Failed to write CSV row")?;
    }

    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let columns = vec!["id".to_string(), "name".to_string(), "avatar".to_string()];
        let rows = vec![
            vec![Value::Integer(1), Value::Text("Ann, Jr.".into()), Value::Blob(vec![1])],
            vec![Value::Integer(2), Value::Null, Value::Null],
        ];

        export_csv(&path, &columns, &rows).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "id,name,avatar\n1,\"Ann, Jr.\",<BLOB>\n2,,\n");
    }
}
