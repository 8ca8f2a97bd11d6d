use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::error::ArchiveError;
use crate::layout::sanitize_room_name;

/// One matching message from a room's search database.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub sender: String,
    pub ts: i64,
    pub idx: i64,
    pub snippet: String,
    pub rank: f64,
}

impl SearchHit {
    /// Link to the message relative to the docs root, e.g. `Room/2021-01-02.html#L4`.
    ///
    /// The rows carry no file name, so the page is the UTC calendar day of
    /// `ts`. This matches the renderer as long as day files are split on UTC
    /// days, which is how the log writer names them.
    pub fn permalink(&self, room: &str) -> Result<String> {
        let at = DateTime::<Utc>::from_timestamp_millis(self.ts)
            .ok_or(ArchiveError::InvalidTimestamp { ts: self.ts })?;
        Ok(format!(
            "{}/{}.html#L{}",
            sanitize_room_name(room),
            at.format("%Y-%m-%d"),
            self.idx
        ))
    }
}

pub async fn run_search(config: &Config, room: &str, query: &str, limit: i64) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let db_file = db::db_path(config, room);
    if !db_file.exists() {
        return Err(ArchiveError::RoomNotFound(room.to_string()))
            .with_context(|| format!("No search database at {}", db_file.display()));
    }

    let hits = search_db(&db_file, query, limit).await?;
    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let time = DateTime::<Utc>::from_timestamp_millis(hit.ts)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| hit.ts.to_string());
        println!("{}. [{:.2}] <{}> {}", i + 1, -hit.rank, hit.sender, time);
        println!("    excerpt: \"{}\"", hit.snippet.replace('\n', " ").trim());
        println!("    link: {}", hit.permalink(room)?);
        println!();
    }
    Ok(())
}

pub async fn search_db(db_file: &Path, query: &str, limit: i64) -> Result<Vec<SearchHit>> {
    let pool = db::connect(db_file, false).await?;
    let hits = fetch_hits(&pool, query, limit).await;
    pool.close().await;
    hits
}

async fn fetch_hits(pool: &SqlitePool, query: &str, limit: i64) -> Result<Vec<SearchHit>> {
    let rows = sqlx::query(
        r#"
        SELECT sender, ts, idx, rank,
               snippet(search, 3, '>>>', '<<<', '...', 16) AS snippet
        FROM search
        WHERE search MATCH ?
        ORDER BY rank
        LIMIT ?
        "#,
    )
    .bind(query)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| SearchHit {
            sender: row.get("sender"),
            ts: row.get("ts"),
            idx: row.get("idx"),
            snippet: row.get("snippet"),
            rank: row.get("rank"),
        })
        .collect())
}
