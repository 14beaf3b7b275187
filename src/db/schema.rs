//! SQL DDL for initializing the item storage.

/// `id` is an INTEGER PRIMARY KEY, i.e. an alias for the rowid: a
/// client-supplied id is stored as-is, an omitted one is assigned.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL
);
"#;
