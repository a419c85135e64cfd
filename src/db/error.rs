use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Failed to connect to {}: {reason}", path.display())]
    Connection { path: PathBuf, reason: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid page request: page {page}, page size {page_size} (both must be at least 1)")]
    InvalidPage { page: usize, page_size: usize },

    #[error("Unknown table or view: {0}")]
    UnknownTable(String),

    #[error("Unknown column '{column}' in {table}")]
    UnknownColumn { table: String, column: String },

    #[error("Table {0} has no column to address rows by")]
    NoKeyColumn(String),

    #[error("Statement does not only read rows: {0}")]
    NotAQuery(String),

    #[error("SQL error: {message}")]
    Query {
        message: String,
        sql: String,
        code: Option<i32>,
    },
}

impl DbError {
    pub(crate) fn connection(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DbError::Connection {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn query(error: rusqlite::Error, sql: &str) -> Self {
        let code = match &error {
            rusqlite::Error::SqliteFailure(err, _) => Some(err.extended_code),
            _ => None,
        };
        DbError::Query {
            message: error.to_string(),
            sql: sql.to_string(),
            code,
        }
    }

    /// User-friendly multi-line description for display in a host
    pub fn diagnostic(&self) -> String {
        match self {
            DbError::Query { message, sql, code } => match code {
                Some(code) => format_sqlite_error(*code, message, sql),
                None => format!("SQL error: {}\n\nQuery: {}", message, truncate_query(sql)),
            },
            DbError::UnknownColumn { .. } => {
                format!("{}\n\nHint: Check the table schema for valid column names", self)
            }
            other => other.to_string(),
        }
    }
}

fn format_sqlite_error(code: i32, message: &str, query: &str) -> String {
    let mut result = String::new();

    // Primary result code lives in the low byte of the extended code
    match code & 0xff {
        1 => {
            // SQLITE_ERROR
            if message.contains("no such table") {
                result.push_str("Table not found\n\n");
                result.push_str(&suggest_table_name(message));
            } else if message.contains("no such column") {
                result.push_str("Column not found\n\n");
                result.push_str(&suggest_column_name(message));
            } else {
                result.push_str(&format!("SQL error: {}\n", message));
            }
        }
        5 => {
            // SQLITE_BUSY
            result.push_str("Database is locked\n\n");
            result.push_str("Another process is using the database. Try again in a moment.");
        }
        8 => {
            // SQLITE_READONLY
            result.push_str("Database is opened in read-only mode\n");
        }
        19 => {
            // SQLITE_CONSTRAINT
            result.push_str(&format!("Constraint violation: {}\n", message));
        }
        _ => {
            result.push_str(&format!("SQL error (code {}): {}\n", code, message));
        }
    }

    result.push_str(&format!("\nQuery: {}", truncate_query(query)));
    result
}

fn suggest_table_name(message: &str) -> String {
    if let Some(start) = message.find(": ") {
        let table_part = &message[start + 2..];
        format!("Unknown table: {}\n\nHint: List tables to see what is available", table_part)
    } else {
        "Hint: List tables to see what is available".to_string()
    }
}

fn suggest_column_name(message: &str) -> String {
    if let Some(start) = message.find(": ") {
        let col_part = &message[start + 2..];
        format!("Unknown column: {}\n\nHint: Check the table schema for valid column names", col_part)
    } else {
        "Hint: Check the table schema for valid column names".to_string()
    }
}

fn truncate_query(query: &str) -> String {
    if query.chars().count() > 100 {
        let head: String = query.chars().take(97).collect();
        format!("{}...", head)
    } else {
        query.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_keeps_engine_message() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let sql = "SELECT * FROM missing";
        let err = conn.prepare(sql).map(|_| ()).unwrap_err();
        let err = DbError::query(err, sql);

        assert!(err.to_string().contains("no such table: missing"));
        let diagnostic = err.diagnostic();
        assert!(diagnostic.starts_with("Table not found"));
        assert!(diagnostic.ends_with("Query: SELECT * FROM missing"));
    }

    #[test]
    fn long_queries_are_shortened_in_diagnostics() {
        let sql = format!("SELECT {} FROM t", "x, ".repeat(60));
        let err = DbError::Query {
            message: "boom".into(),
            sql: sql.clone(),
            code: None,
        };
        let diagnostic = err.diagnostic();
        assert!(diagnostic.ends_with("..."));
        assert!(diagnostic.len() < sql.len() + 30);
    }
}
