//! Database utilities for connections and schema migrations.
//!
//! - [`connection::connect_sqlite`] opens a connection with WAL journaling,
//!   `foreign_keys=ON` and a 5000ms busy timeout.
//! - [`migrate::run_all`] applies the embedded migrations. It accepts
//!   `sqlite://path`, `sqlite:path` or a bare file path.
//!
//! Example:
//! ```no_run
//! use bar_sync::db::{connection, migrate};
//!
//! let db_path = std::env::temp_dir().join("bar_sync_example.db");
//! migrate::run_all(db_path.to_str().unwrap()).expect("migrations");
//! let _conn = connection::connect_sqlite(db_path.to_str().unwrap()).expect("connect");
//! ```

pub mod connection;
pub mod migrate;

/// Strip an optional `sqlite:` / `sqlite://` scheme, leaving what
/// `SqliteConnection::establish` expects.
pub fn sqlite_path(database_url: &str) -> anyhow::Result<&str> {
    let url = database_url.trim();
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        anyhow::bail!("Unsupported DATABASE_URL (only SQLite is supported): {url}");
    }
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    if path.is_empty() {
        anyhow::bail!("Empty DATABASE_URL");
    }
    Ok(path)
}
