use crate::db::query::quote_ident;
use crate::db::schema::{self, RelationKind};
use crate::db::DbError;
use crate::types::{ColumnSchema, Value};
use rusqlite::{params_from_iter, Connection};
use std::collections::BTreeMap;
use tracing::info;

/// Column name to new value
pub type RowValues = BTreeMap<String, Value>;

/// A writable table, by its catalog spelling, with its columns
fn resolve_table(conn: &Connection, table: &str) -> Result<(String, Vec<ColumnSchema>), DbError> {
    match schema::resolve_relation(conn, table)? {
        Some((RelationKind::Table, name)) => {
            let columns = schema::get_table_schema(conn, &name)?;
            Ok((name, columns))
        }
        _ => Err(DbError::UnknownTable(table.to_string())),
    }
}

/// Catalog spelling of each name, in order
fn resolve_columns<'a>(
    table: &str,
    columns: &[ColumnSchema],
    names: impl IntoIterator<Item = &'a String>,
) -> Result<Vec<String>, DbError> {
    names
        .into_iter()
        .map(|name| {
            columns
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name))
                .map(|c| c.name.clone())
                .ok_or_else(|| DbError::UnknownColumn {
                    table: table.to_string(),
                    column: name.clone(),
                })
        })
        .collect()
}

/// Column rows are addressed by: the single primary key column, else
/// `fallback` when the table has it.
pub fn key_column(columns: &[ColumnSchema], table: &str, fallback: &str) -> Result<String, DbError> {
    let mut primary = columns.iter().filter(|c| c.primary_key);
    if let (Some(pk), None) = (primary.next(), primary.next()) {
        return Ok(pk.name.clone());
    }
    columns
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(fallback))
        .map(|c| c.name.clone())
        .ok_or_else(|| DbError::NoKeyColumn(table.to_string()))
}

/// Run one write statement in a transaction, committing on success
fn execute_write(conn: &mut Connection, sql: &str, params: &[Value]) -> Result<usize, DbError> {
    let tx = conn.transaction().map_err(|e| DbError::query(e, sql))?;
    let changes = tx
        .execute(sql, params_from_iter(params.iter()))
        .map_err(|e| DbError::query(e, sql))?;
    tx.commit().map_err(|e| DbError::query(e, sql))?;
    Ok(changes)
}

/// Insert a row, binding every value as a parameter
pub fn insert_row(conn: &mut Connection, table: &str, row: &RowValues) -> Result<usize, DbError> {
    let (table, columns) = resolve_table(conn, table)?;
    let names = resolve_columns(&table, &columns, row.keys())?;

    let sql = if names.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", quote_ident(&table))
    } else {
        let names: Vec<String> = names.iter().map(|n| quote_ident(n)).collect();
        let placeholders = vec!["?"; names.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&table),
            names.join(", "),
            placeholders
        )
    };

    let params: Vec<Value> = row.values().cloned().collect();
    let changes = execute_write(conn, &sql, &params)?;
    info!(table = %table, changes, "inserted row");
    Ok(changes)
}

/// Update the row whose key column equals `id`.
/// An empty `row` changes nothing.
pub fn update_row(
    conn: &mut Connection,
    table: &str,
    row: &RowValues,
    id: &Value,
    fallback_key: &str,
) -> Result<usize, DbError> {
    let (table, columns) = resolve_table(conn, table)?;
    let names = resolve_columns(&table, &columns, row.keys())?;
    let key = key_column(&columns, &table, fallback_key)?;

    if names.is_empty() {
        return Ok(0);
    }

    let assignments: Vec<String> = names.iter().map(|n| format!("{} = ?", quote_ident(n))).collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        quote_ident(&table),
        assignments.join(", "),
        quote_ident(&key)
    );

    let mut params: Vec<Value> = row.values().cloned().collect();
    params.push(id.clone());
    let changes = execute_write(conn, &sql, &params)?;
    info!(table = %table, key = %key, changes, "updated row");
    Ok(changes)
}

/// Delete the row whose key column equals `id`
pub fn delete_row(
    conn: &mut Connection,
    table: &str,
    id: &Value,
    fallback_key: &str,
) -> Result<usize, DbError> {
    let (table, columns) = resolve_table(conn, table)?;
    let key = key_column(&columns, &table, fallback_key)?;

    let sql = format!("DELETE FROM {} WHERE {} = ?", quote_ident(&table), quote_ident(&key));
    let changes = execute_write(conn, &sql, std::slice::from_ref(id))?;
    info!(table = %table, key = %key, changes, "deleted row");
    Ok(changes)
}

/// Drop a table or view; the name must be catalogued as that kind
pub fn drop_relation(conn: &mut Connection, name: &str, kind: RelationKind) -> Result<(), DbError> {
    let name = match schema::resolve_relation(conn, name)? {
        Some((found, catalog_name)) if found == kind => catalog_name,
        _ => return Err(DbError::UnknownTable(name.to_string())),
    };

    let keyword = match kind {
        RelationKind::Table => "TABLE",
        RelationKind::View => "VIEW",
    };
    let sql = format!("DROP {} {}", keyword, quote_ident(&name));
    execute_write(conn, &sql, &[])?;
    info!(name = %name, kind = keyword, "dropped relation");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items(code TEXT PRIMARY KEY, qty INTEGER NOT NULL);
             CREATE TABLE log(id INTEGER, line TEXT);
             CREATE TABLE pairs(a INTEGER, b INTEGER, PRIMARY KEY (a, b));
             CREATE VIEW stock AS SELECT code FROM items;",
        )
        .unwrap();
        conn
    }

    fn row(values: &[(&str, Value)]) -> RowValues {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn key_column_prefers_single_primary_key() {
        let conn = fixture();
        let items = schema::get_table_schema(&conn, "items").unwrap();
        let log = schema::get_table_schema(&conn, "log").unwrap();
        let pairs = schema::get_table_schema(&conn, "pairs").unwrap();

        assert_eq!(key_column(&items, "items", "id").unwrap(), "code");
        assert_eq!(key_column(&log, "log", "id").unwrap(), "id");
        assert!(matches!(
            key_column(&pairs, "pairs", "id"),
            Err(DbError::NoKeyColumn(_))
        ));
    }

    #[test]
    fn insert_update_delete_by_text_key() {
        let mut conn = fixture();
        insert_row(&mut conn, "items", &row(&[("code", "A1".into()), ("qty", 3.into())])).unwrap();

        let changed = update_row(
            &mut conn,
            "items",
            &row(&[("qty", 7.into())]),
            &Value::from("A1"),
            "id",
        )
        .unwrap();
        assert_eq!(changed, 1);
        let qty: i64 = conn
            .query_row("SELECT qty FROM items WHERE code = 'A1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(qty, 7);

        assert_eq!(delete_row(&mut conn, "items", &Value::from("A1"), "id").unwrap(), 1);
        assert_eq!(delete_row(&mut conn, "items", &Value::from("A1"), "id").unwrap(), 0);
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let mut conn = fixture();
        let err = insert_row(&mut conn, "items", &row(&[("code", "B".into())])).unwrap_err();
        assert!(matches!(err, DbError::Query { .. }));
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 0);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn rejects_views_and_unknown_columns() {
        let mut conn = fixture();
        assert!(matches!(
            insert_row(&mut conn, "stock", &row(&[("code", "C".into())])),
            Err(DbError::UnknownTable(_))
        ));
        assert!(matches!(
            insert_row(&mut conn, "items", &row(&[("qty) VALUES (1); --", 1.into())])),
            Err(DbError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn names_match_case_insensitively() {
        let mut conn = fixture();
        insert_row(&mut conn, "ITEMS", &row(&[("Code", "D4".into()), ("QTY", 2.into())])).unwrap();
        assert_eq!(
            update_row(&mut conn, "Items", &row(&[("qty", 5.into())]), &Value::from("D4"), "id").unwrap(),
            1
        );
        assert_eq!(delete_row(&mut conn, "LOG", &Value::Integer(1), "ID").unwrap(), 0);
        drop_relation(&mut conn, "Stock", RelationKind::View).unwrap();
        assert!(schema::list_views(&conn).unwrap().is_empty());
    }

    #[test]
    fn drop_checks_relation_kind() {
        let mut conn = fixture();
        assert!(matches!(
            drop_relation(&mut conn, "stock", RelationKind::Table),
            Err(DbError::UnknownTable(_))
        ));
        drop_relation(&mut conn, "stock", RelationKind::View).unwrap();
        drop_relation(&mut conn, "log", RelationKind::Table).unwrap();
        assert_eq!(schema::list_tables(&conn).unwrap(), ["items", "pairs"]);
        assert!(schema::list_views(&conn).unwrap().is_empty());
    }
}
