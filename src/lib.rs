//! Data-access and query-composition core for browsing and editing SQLite
//! databases: schema introspection, paginated and filtered table reads,
//! free-form SQL execution and row editing.

pub mod config;
pub mod db;
pub mod export;
pub mod types;
pub mod worker;

pub use config::ManagerConfig;
pub use db::{ConnectionGateway, DatabaseManager, DbError};
