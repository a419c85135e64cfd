use serde::{Deserialize, Serialize};

/// Information about a table or view column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub ordinal_position: usize,
    pub check_expression: Option<String>,
    pub foreign_key: Option<ForeignKeyRef>,
}

impl ColumnSchema {
    /// Declared type with any length/precision suffix removed, uppercased
    pub fn base_type(&self) -> String {
        let upper = self.data_type.to_ascii_uppercase();
        match upper.find('(') {
            Some(idx) => upper[..idx].trim().to_string(),
            None => upper.trim().to_string(),
        }
    }
}

/// Column referenced by a foreign key constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    /// `None` when the constraint targets the parent's primary key implicitly
    pub column: Option<String>,
}

/// Definition of a view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSchema {
    pub name: String,
    pub sql: String,
    pub created_at: Option<String>,
}
