//! Database Backend Abstractions
//!
//! The connection trait every ORM operation executes against, plus the
//! SQLite implementation.

pub mod core;
pub mod sqlite;

// Re-export core traits and types
pub use self::core::*;
pub use sqlite::SqliteConnection;
