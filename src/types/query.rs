use rusqlite::types::{ToSql, ToSqlOutput, Value as SqliteValue, ValueRef};
use serde::{Deserialize, Serialize};

/// Display-friendly value representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<SqliteValue> for Value {
    fn from(v: SqliteValue) -> Self {
        match v {
            SqliteValue::Null => Value::Null,
            SqliteValue::Integer(i) => Value::Integer(i),
            SqliteValue::Real(r) => Value::Real(r),
            SqliteValue::Text(t) => Value::Text(t),
            SqliteValue::Blob(b) => Value::Blob(b),
        }
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i.into())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<&str> for Value {
    fn from(t: &str) -> Self {
        Value::Text(t.to_string())
    }
}

impl From<String> for Value {
    fn from(t: String) -> Self {
        Value::Text(t)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Borrowed(ValueRef::Real(*r)),
            Value::Text(t) => ToSqlOutput::Borrowed(ValueRef::Text(t.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl Value {
    /// Infer a value from user-typed text: empty or `NULL` is null, then
    /// integer, then float, anything else is text.
    pub fn parse_literal(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("NULL") {
            Value::Null
        } else if let Ok(i) = trimmed.parse::<i64>() {
            Value::Integer(i)
        } else if let Ok(r) = trimmed.parse::<f64>() {
            Value::Real(r)
        } else {
            Value::Text(text.to_string())
        }
    }

    /// Text used inside a LIKE pattern, with `\`, `%` and `_` escaped by `\`
    pub(crate) fn as_pattern_text(&self) -> String {
        let text = match self {
            Value::Null => String::new(),
            Value::Integer(i) => i.to_string(),
            Value::Real(r) => r.to_string(),
            Value::Text(t) => t.clone(),
            Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
        };

        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            if matches!(c, '\\' | '%' | '_') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }

    /// Format value for display, truncating long text/blob
    pub fn display(&self, max_len: usize) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(r) => {
                if r.fract() == 0.0 {
                    format!("{:.0}", r)
                } else {
                    format!("{:.6}", r)
                }
            }
            Value::Text(t) => {
                if t.chars().count() > max_len {
                    let kept: String = t.chars().take(max_len.saturating_sub(3)).collect();
                    format!("{}...", kept)
                } else {
                    t.clone()
                }
            }
            Value::Blob(b) => {
                if b.len() > max_len {
                    format!("<BLOB {} bytes>...", b.len())
                } else {
                    format!("<BLOB {} bytes>", b.len())
                }
            }
        }
    }
}

pub type Row = Vec<Value>;

/// One page of a table or view read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Rows matching the filter, ignoring pagination
    pub total_rows: u64,
    pub page: usize,
    pub page_size: usize,
    pub displayed_rows: usize,
}

impl PageResult {
    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            return 1;
        }
        let total = self.total_rows as usize;
        total.div_ceil(self.page_size).max(1)
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev_page(&self) -> bool {
        self.page > 1
    }
}

/// Shape of a free-form statement's result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QueryOutcome {
    Rows {
        columns: Vec<String>,
        rows: Vec<Row>,
        /// Rows delivered in this response, not the full result cardinality
        rows_fetched: usize,
        truncated: bool,
        max_rows: usize,
    },
    Affected {
        rows_affected: u64,
    },
}

/// Query execution result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub outcome: QueryOutcome,
    /// Seconds spent executing and fetching
    pub execution_time: f64,
    /// Epoch seconds at call start
    pub execution_timestamp: f64,
}

impl ExecutionResult {
    pub fn columns(&self) -> &[String] {
        match &self.outcome {
            QueryOutcome::Rows { columns, .. } => columns,
            QueryOutcome::Affected { .. } => &[],
        }
    }

    pub fn rows(&self) -> &[Row] {
        match &self.outcome {
            QueryOutcome::Rows { rows, .. } => rows,
            QueryOutcome::Affected { .. } => &[],
        }
    }

    pub fn rows_fetched(&self) -> usize {
        match &self.outcome {
            QueryOutcome::Rows { rows_fetched, .. } => *rows_fetched,
            QueryOutcome::Affected { .. } => 0,
        }
    }

    pub fn truncated(&self) -> bool {
        matches!(self.outcome, QueryOutcome::Rows { truncated: true, .. })
    }

    pub fn rows_affected(&self) -> Option<u64> {
        match &self.outcome {
            QueryOutcome::Rows { .. } => None,
            QueryOutcome::Affected { rows_affected } => Some(*rows_affected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(total_rows: u64, page: usize, page_size: usize) -> PageResult {
        PageResult {
            columns: Vec::new(),
            rows: Vec::new(),
            total_rows,
            page,
            page_size,
            displayed_rows: 0,
        }
    }

    #[test]
    fn parse_literal_infers_types() {
        assert_eq!(Value::parse_literal(""), Value::Null);
        assert_eq!(Value::parse_literal("null"), Value::Null);
        assert_eq!(Value::parse_literal("42"), Value::Integer(42));
        assert_eq!(Value::parse_literal("2.5"), Value::Real(2.5));
        assert_eq!(Value::parse_literal("Ydob"), Value::Text("Ydob".into()));
    }

    #[test]
    fn pattern_text_escapes_wildcards() {
        assert_eq!(Value::from("50%_off\\").as_pattern_text(), "50\\%\\_off\\\\");
        assert_eq!(Value::from("plain").as_pattern_text(), "plain");
        assert_eq!(Value::Integer(7).as_pattern_text(), "7");
    }

    #[test]
    fn display_truncates_long_text() {
        let v = Value::Text("abcdefghij".into());
        assert_eq!(v.display(6), "abc...");
        assert_eq!(v.display(20), "abcdefghij");
        assert_eq!(Value::Real(3.0).display(10), "3");
        assert_eq!(Value::Blob(vec![0; 4]).display(10), "<BLOB 4 bytes>");
    }

    #[test]
    fn total_pages_rounds_up_and_never_drops_below_one() {
        assert_eq!(page(10, 1, 5).total_pages(), 2);
        assert_eq!(page(11, 1, 5).total_pages(), 3);
        assert_eq!(page(0, 1, 50).total_pages(), 1);
        assert!(page(10, 1, 5).has_next_page());
        assert!(!page(10, 2, 5).has_next_page());
        assert!(page(10, 2, 5).has_prev_page());
    }

    #[test]
    fn affected_outcome_has_no_tabular_data() {
        let result = ExecutionResult {
            outcome: QueryOutcome::Affected { rows_affected: 3 },
            execution_time: 0.0,
            execution_timestamp: 0.0,
        };
        assert!(result.columns().is_empty());
        assert!(result.rows().is_empty());
        assert!(!result.truncated());
        assert_eq!(result.rows_affected(), Some(3));
        assert_eq!(result.rows_fetched(), 0);
    }
}
