use crate::db::ddl;
use crate::db::DbError;
use crate::types::{ColumnSchema, ForeignKeyRef, ViewSchema};
use rusqlite::{Connection, OptionalExtension};
use std::collections::{HashMap, HashSet};

/// Kind of catalog entry a name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Table,
    View,
}

/// Get all user tables in catalog order
pub fn list_tables(conn: &Connection) -> Result<Vec<String>, DbError> {
    let sql = "SELECT name FROM sqlite_master \
               WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
               ORDER BY rowid";
    collect_names(conn, sql)
}

/// Get all views, newest first
pub fn list_views(conn: &Connection) -> Result<Vec<String>, DbError> {
    let sql = "SELECT name FROM sqlite_master WHERE type = 'view' ORDER BY rowid DESC";
    collect_names(conn, sql)
}

fn collect_names(conn: &Connection, sql: &str) -> Result<Vec<String>, DbError> {
    let mut stmt = conn.prepare(sql).map_err(|e| DbError::query(e, sql))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| DbError::query(e, sql))?;
    Ok(names)
}

/// Whether `name` is a table or a view in the catalog
pub fn relation_kind(conn: &Connection, name: &str) -> Result<Option<RelationKind>, DbError> {
    Ok(resolve_relation(conn, name)?.map(|(kind, _)| kind))
}

/// Look `name` up case-insensitively, returning its kind and the catalog's spelling
pub fn resolve_relation(
    conn: &Connection,
    name: &str,
) -> Result<Option<(RelationKind, String)>, DbError> {
    let sql = "SELECT type, name FROM sqlite_master \
               WHERE name = ?1 COLLATE NOCASE AND type IN ('table', 'view')";
    let found: Option<(String, String)> = conn
        .query_row(sql, [name], |row| Ok((row.get(0)?, row.get(1)?)))
        .optional()
        .map_err(|e| DbError::query(e, sql))?;

    Ok(found.and_then(|(kind, name)| match kind.as_str() {
        "table" => Some((RelationKind::Table, name)),
        "view" => Some((RelationKind::View, name)),
        _ => None,
    }))
}

/// Get the columns of a table or view, in declaration order.
/// An unknown name yields an empty list.
pub fn get_table_schema(conn: &Connection, table_name: &str) -> Result<Vec<ColumnSchema>, DbError> {
    let sql = "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1)";
    let mut stmt = conn.prepare(sql).map_err(|e| DbError::query(e, sql))?;

    let mut columns: Vec<ColumnSchema> = stmt
        .query_map([table_name], |row| {
            let position: i64 = row.get(0)?;
            let data_type: Option<String> = row.get(2)?;
            let pk: i64 = row.get(5)?;
            Ok(ColumnSchema {
                name: row.get(1)?,
                data_type: data_type.unwrap_or_default(),
                not_null: row.get(3)?,
                default_value: row.get(4)?,
                primary_key: pk > 0,
                auto_increment: false,
                unique: false,
                ordinal_position: position as usize,
                check_expression: None,
                foreign_key: None,
            })
        })
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| DbError::query(e, sql))?;

    if columns.is_empty() {
        return Ok(columns);
    }
    columns.sort_by_key(|c| c.ordinal_position);

    let unique = unique_columns(conn, table_name)?;
    let mut foreign_keys = foreign_keys(conn, table_name)?;
    let definitions = table_definitions(conn, table_name)?;

    for column in &mut columns {
        column.unique = unique.contains(&column.name);
        column.foreign_key = foreign_keys.remove(&column.name);
        if let Some(def) = definitions
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(&column.name))
        {
            // AUTOINCREMENT is only legal on an INTEGER PRIMARY KEY
            column.auto_increment = def.auto_increment && column.primary_key;
            column.check_expression = def.check_expression.clone();
        }
    }

    Ok(columns)
}

/// Columns covered on their own by a UNIQUE constraint or unique index.
/// The primary key's implicit index is not counted.
fn unique_columns(conn: &Connection, table_name: &str) -> Result<HashSet<String>, DbError> {
    let sql = "SELECT il.name, ii.name \
               FROM pragma_index_list(?1) AS il, pragma_index_info(il.name) AS ii \
               WHERE il.\"unique\" = 1 AND il.origin <> 'pk'";
    let mut stmt = conn.prepare(sql).map_err(|e| DbError::query(e, sql))?;
    let pairs = stmt
        .query_map([table_name], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| DbError::query(e, sql))?;

    let mut by_index: HashMap<String, Vec<Option<String>>> = HashMap::new();
    for (index, column) in pairs {
        by_index.entry(index).or_default().push(column);
    }

    Ok(by_index
        .into_values()
        .filter(|cols| cols.len() == 1)
        .filter_map(|mut cols| cols.pop().flatten())
        .collect())
}

/// Single-column foreign keys keyed by the referencing column
fn foreign_keys(conn: &Connection, table_name: &str) -> Result<HashMap<String, ForeignKeyRef>, DbError> {
    let sql = "SELECT id, \"from\", \"table\", \"to\" FROM pragma_foreign_key_list(?1) ORDER BY id, seq";
    let mut stmt = conn.prepare(sql).map_err(|e| DbError::query(e, sql))?;
    let rows = stmt
        .query_map([table_name], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| DbError::query(e, sql))?;

    let mut seen: HashMap<i64, usize> = HashMap::new();
    for (id, ..) in &rows {
        *seen.entry(*id).or_default() += 1;
    }

    Ok(rows
        .into_iter()
        .filter(|(id, ..)| seen.get(id) == Some(&1))
        .map(|(_, from, table, column)| (from, ForeignKeyRef { table, column }))
        .collect())
}

fn table_definitions(conn: &Connection, table_name: &str) -> Result<Vec<ddl::ColumnDefinition>, DbError> {
    let sql = "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE";
    let create_sql: Option<Option<String>> = conn
        .query_row(sql, [table_name], |row| row.get(0))
        .optional()
        .map_err(|e| DbError::query(e, sql))?;

    Ok(create_sql
        .flatten()
        .map(|s| ddl::column_definitions(&s))
        .unwrap_or_default())
}

/// Get the definition of a view, or `None` when no such view exists
pub fn get_view_schema(conn: &Connection, view_name: &str) -> Result<Option<ViewSchema>, DbError> {
    let sql = "SELECT name, sql FROM sqlite_master WHERE type = 'view' AND name = ?1 COLLATE NOCASE";
    conn.query_row(sql, [view_name], |row| {
        let sql: Option<String> = row.get(1)?;
        Ok(ViewSchema {
            name: row.get(0)?,
            sql: sql.unwrap_or_default(),
            // SQLite does not record when a view was created
            created_at: None,
        })
    })
    .optional()
    .map_err(|e| DbError::query(e, sql))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT UNIQUE,
                age INTEGER CHECK (age >= 0)
             );
             CREATE TABLE memberships(
                user_id INTEGER REFERENCES users(id),
                team TEXT,
                UNIQUE (user_id, team)
             );
             CREATE VIEW adults AS SELECT name FROM users WHERE age >= 18;
             CREATE VIEW minors AS SELECT name FROM users WHERE age < 18;",
        )
        .unwrap();
        conn
    }

    #[test]
    fn lists_tables_without_internal_ones() {
        let conn = fixture();
        // AUTOINCREMENT creates sqlite_sequence
        assert_eq!(list_tables(&conn).unwrap(), ["users", "memberships"]);
    }

    #[test]
    fn lists_views_newest_first() {
        let conn = fixture();
        assert_eq!(list_views(&conn).unwrap(), ["minors", "adults"]);
    }

    #[test]
    fn maps_column_metadata() {
        let conn = fixture();
        let columns = get_table_schema(&conn, "users").unwrap();

        let positions: Vec<_> = columns.iter().map(|c| c.ordinal_position).collect();
        assert_eq!(positions, [0, 1, 2, 3]);
        assert!(columns[0].primary_key && columns[0].auto_increment);
        assert!(columns[1].not_null);
        assert!(columns[2].unique);
        assert!(!columns[3].unique);
        assert_eq!(columns[3].check_expression.as_deref(), Some("age >= 0"));
    }

    #[test]
    fn composite_unique_and_foreign_keys() {
        let conn = fixture();
        let columns = get_table_schema(&conn, "memberships").unwrap();

        assert!(!columns[0].unique && !columns[1].unique);
        assert_eq!(
            columns[0].foreign_key,
            Some(ForeignKeyRef {
                table: "users".into(),
                column: Some("id".into()),
            })
        );
        assert_eq!(columns[1].foreign_key, None);
    }

    #[test]
    fn unknown_table_has_empty_schema() {
        let conn = fixture();
        assert!(get_table_schema(&conn, "unknown").unwrap().is_empty());
    }

    #[test]
    fn view_schema_and_relation_kinds() {
        let conn = fixture();
        let view = get_view_schema(&conn, "adults").unwrap().unwrap();
        assert!(view.sql.starts_with("CREATE VIEW adults"));
        assert_eq!(get_view_schema(&conn, "missing").unwrap(), None);

        assert_eq!(relation_kind(&conn, "users").unwrap(), Some(RelationKind::Table));
        assert_eq!(relation_kind(&conn, "adults").unwrap(), Some(RelationKind::View));
        assert_eq!(relation_kind(&conn, "nope").unwrap(), None);
    }

    #[test]
    fn names_resolve_case_insensitively() {
        let conn = fixture();
        assert_eq!(
            resolve_relation(&conn, "USERS").unwrap(),
            Some((RelationKind::Table, "users".to_string()))
        );
        assert_eq!(get_view_schema(&conn, "Adults").unwrap().unwrap().name, "adults");
        assert_eq!(get_table_schema(&conn, "Users").unwrap().len(), 4);
    }
}
