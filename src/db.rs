use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::Config;
use crate::layout::sanitize_room_name;

/// Search database file for a room: `<sql_dir>/<sanitized>.sqlite3`.
pub fn db_path(config: &Config, room: &str) -> PathBuf {
    config
        .paths
        .sql_dir
        .join(format!("{}.sqlite3", sanitize_room_name(room)))
}

/// Marker written beside a search database: `<name>-last-added.json`.
pub fn last_added_path(db_path: &Path) -> PathBuf {
    let stem = db_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    db_path.with_file_name(format!("{}-last-added.json", stem))
}

/// Open (creating if needed) a room's search database.
///
/// A single connection keeps `PRAGMA page_size` and `VACUUM` on the same
/// session, and the rollback journal lets the page size change take effect.
pub async fn connect(db_path: &Path, create: bool) -> Result<SqlitePool> {
    if create {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Delete);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok(pool)
}
