use crate::config::ManagerConfig;
use crate::db::mutate::{self, RowValues};
use crate::db::{query, schema, ConnectionGateway, DbError, RelationKind};
use crate::types::{ColumnSchema, ExecutionResult, PageResult, QueryFilter, Value, ViewSchema};
use rusqlite::Connection;
use std::path::Path;

/// Handles all interactions with one database file.
///
/// Every operation opens a fresh connection, runs, and closes it again before
/// returning, on success and failure alike. Operations take `&mut self`, so a
/// manager serves one caller at a time; move it to a [`crate::worker::Worker`]
/// to keep blocking calls off an event loop.
pub struct DatabaseManager {
    gateway: ConnectionGateway,
}

impl DatabaseManager {
    /// Bind a database path. No I/O happens until the first operation.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_config(path, ManagerConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(path: P, config: ManagerConfig) -> Self {
        Self {
            gateway: ConnectionGateway::new(path, config),
        }
    }

    pub fn path(&self) -> &Path {
        self.gateway.path()
    }

    /// File name of the database, for display
    pub fn name(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path().to_string_lossy().into_owned())
    }

    pub fn config(&self) -> &ManagerConfig {
        self.gateway.config()
    }

    /// True only while an operation is running
    pub fn is_connected(&self) -> bool {
        self.gateway.is_open()
    }

    fn with_connection<T>(
        &mut self,
        op: impl FnOnce(&mut Connection, &ManagerConfig) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let config = self.gateway.config().clone();
        let result = match self.gateway.open() {
            Ok(conn) => op(conn, &config),
            Err(e) => Err(e),
        };
        self.gateway.close();
        result
    }

    /// Check the file can still be opened
    pub fn refresh(&mut self) -> Result<(), DbError> {
        let result = self.gateway.refresh().map(|_| ());
        self.gateway.close();
        result
    }

    pub fn list_tables(&mut self) -> Result<Vec<String>, DbError> {
        self.with_connection(|conn, _| schema::list_tables(conn))
    }

    pub fn list_views(&mut self) -> Result<Vec<String>, DbError> {
        self.with_connection(|conn, _| schema::list_views(conn))
    }

    /// Columns of a table or view; empty when it does not exist
    pub fn get_table_schema(&mut self, table: &str) -> Result<Vec<ColumnSchema>, DbError> {
        self.with_connection(|conn, _| schema::get_table_schema(conn, table))
    }

    /// Definition of a view; `None` when it does not exist
    pub fn get_view_schema(&mut self, view: &str) -> Result<Option<ViewSchema>, DbError> {
        self.with_connection(|conn, _| schema::get_view_schema(conn, view))
    }

    /// One page of a table or view. See [`query::read_page`].
    pub fn read_page(
        &mut self,
        table: &str,
        page: usize,
        page_size: usize,
        filter: &QueryFilter,
    ) -> Result<PageResult, DbError> {
        self.with_connection(|conn, _| query::read_page(conn, table, page, page_size, filter))
    }

    /// First page with the configured page size and no filter
    pub fn read_first_page(&mut self, table: &str) -> Result<PageResult, DbError> {
        let page_size = self.config().default_page_size;
        self.read_page(table, 1, page_size, &QueryFilter::default())
    }

    /// Run free-form SQL. `max_rows` of 0 fetches every row.
    pub fn execute_query(&mut self, sql: &str, max_rows: usize) -> Result<ExecutionResult, DbError> {
        self.with_connection(|conn, _| query::execute_query(conn, sql, max_rows))
    }

    /// Run SQL that only reads rows; anything else is refused before it runs
    pub fn execute_read_query(&mut self, sql: &str, max_rows: usize) -> Result<ExecutionResult, DbError> {
        self.with_connection(|conn, _| query::execute_read_query(conn, sql, max_rows))
    }

    pub fn insert_row(&mut self, table: &str, row: &RowValues) -> Result<usize, DbError> {
        self.with_connection(|conn, _| mutate::insert_row(conn, table, row))
    }

    /// Update the row addressed by `id` through the table's key column
    pub fn update_row(
        &mut self,
        table: &str,
        row: &RowValues,
        id: impl Into<Value>,
    ) -> Result<usize, DbError> {
        let id = id.into();
        self.with_connection(|conn, config| {
            mutate::update_row(conn, table, row, &id, &config.key_column)
        })
    }

    pub fn delete_row(&mut self, table: &str, id: impl Into<Value>) -> Result<usize, DbError> {
        let id = id.into();
        self.with_connection(|conn, config| mutate::delete_row(conn, table, &id, &config.key_column))
    }

    pub fn delete_table(&mut self, name: &str) -> Result<(), DbError> {
        self.with_connection(|conn, _| mutate::drop_relation(conn, name, RelationKind::Table))
    }

    pub fn delete_view(&mut self, name: &str) -> Result<(), DbError> {
        self.with_connection(|conn, _| mutate::drop_relation(conn, name, RelationKind::View))
    }

    /// Every row of a table or view, for export
    pub fn read_all(&mut self, table: &str) -> Result<ExecutionResult, DbError> {
        self.with_connection(|conn, _| {
            let table = match schema::resolve_relation(conn, table)? {
                Some((_, name)) => name,
                None => return Err(DbError::UnknownTable(table.to_string())),
            };
            let sql = format!("SELECT * FROM {}", query::quote_ident(&table));
            query::execute_query(conn, &sql, 0)
        })
    }
}
