//! Shared fixtures: models, schema and a statement-recording connection

#![allow(dead_code)]

use async_trait::async_trait;
use quarry_orm::{CastKind, DatabaseConnection, ExecuteResult, Model, ModelResult, Record, Row, SqliteConnection};
use serde_json::Value;

const SCHEMA: &[&str] = &[
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT UNIQUE,
        age TEXT,
        password TEXT,
        is_admin INTEGER NOT NULL DEFAULT 0,
        settings TEXT,
        created_at TEXT,
        updated_at TEXT
    )",
    "CREATE TABLE posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER REFERENCES users(id),
        title TEXT NOT NULL,
        body TEXT,
        published INTEGER NOT NULL DEFAULT 0,
        views INTEGER NOT NULL DEFAULT 0,
        created_at TEXT,
        updated_at TEXT
    )",
    "CREATE TABLE profiles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER REFERENCES users(id),
        bio TEXT,
        created_at TEXT,
        updated_at TEXT
    )",
    "CREATE TABLE roles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        created_at TEXT,
        updated_at TEXT
    )",
    "CREATE TABLE role_user (
        user_id INTEGER NOT NULL REFERENCES users(id),
        role_id INTEGER NOT NULL REFERENCES roles(id),
        scope TEXT,
        created_at TEXT,
        updated_at TEXT
    )",
    "CREATE TABLE counters (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        hits INTEGER NOT NULL DEFAULT 0
    )",
];

/// Fresh in-memory database with the test schema
pub async fn setup() -> SqliteConnection {
    let _ = tracing_subscriber::fmt().with_env_filter("quarry_orm=debug").with_test_writer().try_init();

    let mut conn = SqliteConnection::in_memory().await.expect("in-memory database");
    for statement in SCHEMA {
        conn.execute(statement, &[]).await.expect("schema statement");
    }
    conn
}

/// Build an attribute map from a JSON object literal
pub fn attrs(value: Value) -> Row {
    value.as_object().cloned().expect("object literal")
}

macro_rules! model {
    ($name:ident { $($body:tt)* }) => {
        #[derive(Debug)]
        pub struct $name {
            record: Record,
        }

        impl Model for $name {
            fn model_name() -> &'static str {
                stringify!($name)
            }

            fn from_record(record: Record) -> Self {
                Self { record }
            }

            fn record(&self) -> &Record {
                &self.record
            }

            fn record_mut(&mut self) -> &mut Record {
                &mut self.record
            }

            $($body)*
        }
    };
}

model!(User {
    fn fillable() -> &'static [&'static str] {
        &["name", "email", "age", "password", "settings"]
    }

    fn hidden() -> &'static [&'static str] {
        &["password"]
    }

    fn casts() -> &'static [(&'static str, CastKind)] {
        &[("age", CastKind::Int), ("is_admin", CastKind::Bool), ("settings", CastKind::Json)]
    }
});

model!(Post {
    fn fillable() -> &'static [&'static str] {
        &["title", "body", "published"]
    }

    fn casts() -> &'static [(&'static str, CastKind)] {
        &[("published", CastKind::Bool)]
    }
});

model!(Profile {
    fn fillable() -> &'static [&'static str] {
        &["bio"]
    }
});

model!(Role {
    fn fillable() -> &'static [&'static str] {
        &["name"]
    }
});

model!(Counter {
    fn uses_timestamps() -> bool {
        false
    }
});

/// Passes statements through to SQLite and records their SQL
pub struct RecordingConnection {
    inner: SqliteConnection,
    pub statements: Vec<String>,
}

impl RecordingConnection {
    pub async fn new() -> Self {
        Self {
            inner: setup().await,
            statements: Vec::new(),
        }
    }

    /// Forget what has been recorded so far
    pub fn reset(&mut self) {
        self.statements.clear();
    }

    pub fn count(&self) -> usize {
        self.statements.len()
    }
}

#[async_trait]
impl DatabaseConnection for RecordingConnection {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> ModelResult<ExecuteResult> {
        self.statements.push(sql.to_string());
        self.inner.execute(sql, params).await
    }

    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> ModelResult<Vec<Row>> {
        self.statements.push(sql.to_string());
        self.inner.fetch_all(sql, params).await
    }
}
