use crate::types::{Row, Value};
use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value as JsonValue};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Convert a row into a JSON object keyed by column name
pub fn row_to_json(columns: &[String], row: &Row) -> JsonValue {
    let mut obj = serde_json::Map::new();
    for (col_name, value) in columns.iter().zip(row) {
        let json_value = match value {
            Value::Null => JsonValue::Null,
            Value::Integer(i) => json!(i),
            Value::Real(r) => json!(r),
            Value::Text(t) => json!(t),
            // Encode blob as base64
            Value::Blob(b) => json!(general_purpose::STANDARD.encode(b)),
        };
        obj.insert(col_name.clone(), json_value);
    }
    JsonValue::Object(obj)
}

/// Export rows to a JSON array of objects
pub fn export_json(output_path: &Path, columns: &[String], rows: &[Row]) -> Result<()> {
    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;

    let objects: Vec<JsonValue> = rows.iter().map(|row| row_to_json(columns, row)).collect();

    let output = serde_json::to_string_pretty(&objects).context("Failed to serialize JSON")?;
    file.write_all(output.as_bytes())
        .context("Failed to write JSON file")?;
    file.flush().context("Failed to flush file")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blobs_are_base64() {
        let columns = vec!["id".to_string(), "data".to_string()];
        let row = vec![Value::Integer(7), Value::Blob(b"hi".to_vec())];
        assert_eq!(row_to_json(&columns, &row), json!({"id": 7, "data": "aGk="}));
    }

    #[test]
    fn writes_array_of_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let columns = vec!["name".to_string()];
        let rows = vec![vec![Value::Text("a".into())], vec![Value::Null]];

        export_json(&path, &columns, &rows).unwrap();

        let parsed: JsonValue = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, json!([{"name": "a"}, {"name": null}]));
    }
}
