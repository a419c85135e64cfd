#![allow(dead_code)]

use dbview::db::mutate::RowValues;
use dbview::types::Value;
use dbview::{DatabaseManager, ManagerConfig};
use rusqlite::Connection;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct Fixture {
    // Keeps the directory alive for the test's duration
    _dir: TempDir,
    pub path: PathBuf,
}

impl Fixture {
    /// Schema only: `users`, `posts` and `users_view`
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE users(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT UNIQUE,
                age INTEGER,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE posts(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                title TEXT NOT NULL,
                body TEXT,
                FOREIGN KEY (user_id) REFERENCES users(id)
            );
            CREATE VIEW users_view AS
                SELECT name, email FROM users WHERE age < 40;",
        )
        .unwrap();
        conn.close().unwrap();

        Self { _dir: dir, path }
    }

    /// Schema plus ten users and ten posts, inserted through the manager
    pub fn populated() -> Self {
        let fixture = Self::new();
        let mut manager = fixture.manager();

        for x in 0..10i64 {
            manager
                .insert_row(
                    "users",
                    &row(&[
                        ("name", Value::from(format!("Test User {}", x + 1))),
                        ("email", Value::from(format!("email{}@email.com", x + 1))),
                        ("age", Value::from(x * 5 + 20)),
                    ]),
                )
                .unwrap();

            let body = if x % 2 == 0 { "Body" } else { "Ydob" };
            manager
                .insert_row(
                    "posts",
                    &row(&[
                        ("user_id", Value::from(x + 1)),
                        ("title", Value::from(format!("Test Title {}", x))),
                        ("body", Value::from(format!("Test {} {}", body, x))),
                    ]),
                )
                .unwrap();
        }

        fixture
    }

    pub fn manager(&self) -> DatabaseManager {
        DatabaseManager::new(&self.path)
    }

    pub fn manager_with(&self, config: ManagerConfig) -> DatabaseManager {
        DatabaseManager::with_config(&self.path, config)
    }

    /// Independent connection, as another process would have
    pub fn raw_connection(&self) -> Connection {
        Connection::open(&self.path).unwrap()
    }
}

pub fn row(values: &[(&str, Value)]) -> RowValues {
    values
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
