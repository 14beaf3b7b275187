//! Database module: item rows, schema and the pooled SQLite storage.
//!
//! Layout:
//! - `models.rs`: the `Item` row plus create/update payloads
//! - `schema.rs`: SQL DDL run at startup
//! - `sqlite.rs`: `ItemsStorage`, the only code that talks SQL

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{Item, ItemChanges, NewItem};
pub use schema::SQLITE_INIT;
pub use sqlite::{ItemsStorage, SqlitePool};
