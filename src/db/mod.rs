mod ddl;
mod error;
mod manager;
pub mod mutate;
pub mod query;
pub mod schema;

use crate::config::ManagerConfig;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub use error::DbError;
pub use manager::DatabaseManager;
pub use schema::RelationKind;

/// Owner of the single connection to one database file
pub struct ConnectionGateway {
    path: PathBuf,
    config: ManagerConfig,
    conn: Option<Connection>,
}

impl ConnectionGateway {
    pub fn new<P: AsRef<Path>>(path: P, config: ManagerConfig) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config,
            conn: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Open a connection, closing any previous one first
    pub fn open(&mut self) -> Result<&mut Connection, DbError> {
        self.close();
        let conn = self.connect()?;
        debug!(path = %self.path.display(), "opened database");
        Ok(self.conn.insert(conn))
    }

    /// Close the connection if one is open
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                // The handle is dropped anyway; sqlite finalizes it on drop
                warn!(path = %self.path.display(), error = %e, "failed to close database cleanly");
            } else {
                debug!(path = %self.path.display(), "closed database");
            }
        }
    }

    /// Close and reopen the same path to pick up external changes
    pub fn refresh(&mut self) -> Result<&mut Connection, DbError> {
        self.open()
    }

    fn connect(&self) -> Result<Connection, DbError> {
        let path_str = self.path.to_string_lossy().to_string();

        if !self.config.create_if_missing && !self.path.exists() {
            return Err(DbError::connection(&self.path, "database file not found"));
        }

        let flags = if self.config.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else if self.config.create_if_missing {
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };

        let conn = Connection::open_with_flags(&self.path, flags).map_err(|e| {
            if e.to_string().contains("not a database") || e.to_string().contains("file is encrypted") {
                DbError::connection(&self.path, format!("invalid SQLite file: {}", path_str))
            } else {
                DbError::connection(&self.path, e)
            }
        })?;

        if self.config.foreign_keys && !self.config.read_only {
            conn.execute("PRAGMA foreign_keys = ON", [])
                .map_err(|e| DbError::connection(&self.path, format!("failed to enable foreign keys: {}", e)))?;
        }

        conn.busy_timeout(self.config.busy_timeout())
            .map_err(|e| DbError::connection(&self.path, format!("failed to set busy timeout: {}", e)))?;

        // SQLite reads the header lazily; touch the catalog so a bad file fails here
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(|e| DbError::connection(&self.path, e))?;

        Ok(conn)
    }
}

impl Drop for ConnectionGateway {
    fn drop(&mut self) {
        self.close();
    }
}
