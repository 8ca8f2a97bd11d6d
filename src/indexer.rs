//! Search database builder.
//!
//! Builds one SQLite FTS5 database per room from its day files, then writes a
//! last-added marker beside it recording where indexing stopped. A room whose
//! database already exists is skipped; delete the file to rebuild it.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{info, warn};

use crate::config::{Config, RoomConfig};
use crate::db;
use crate::error::ArchiveError;
use crate::layout::{day_file_name, list_source_days, read_day};
use crate::models::{Event, LastAdded};
use crate::modifications::Modifications;

/// Outcome of indexing one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The database file was already present; nothing was touched.
    AlreadyExists,
    Indexed {
        files: usize,
        rows: u64,
        /// `None` when the room had no day files.
        marker: Option<LastAdded>,
    },
}

pub async fn run_index(
    config: &Config,
    room_filter: Option<&str>,
    modifications: &dyn Modifications,
) -> Result<()> {
    let mut rooms = config.room_list()?;
    if let Some(name) = room_filter {
        rooms.retain(|r| r.room == name);
        if rooms.is_empty() {
            return Err(ArchiveError::RoomNotFound(name.to_string()).into());
        }
    }

    for room in &rooms {
        info!(room = %room.room, "making DB");
        let db_file = db::db_path(config, &room.room);
        let outcome = index_room(config, room, modifications).await?;

        println!("index {}", room.room);
        match outcome {
            IndexOutcome::AlreadyExists => {
                println!("  skipped: database exists ({})", db_file.display());
            }
            IndexOutcome::Indexed {
                files,
                rows,
                marker,
            } => {
                println!("  files read: {}", files);
                println!("  rows inserted: {}", rows);
                match marker {
                    Some(m) => println!("  last added: {}", m.file),
                    None => println!("  last added: none"),
                }
            }
        }
    }
    println!("ok");
    Ok(())
}

pub async fn index_room(
    config: &Config,
    room: &RoomConfig,
    modifications: &dyn Modifications,
) -> Result<IndexOutcome> {
    let source_dir = config.source_dir(room);
    let db_file = db::db_path(config, &room.room);
    make_db(&room.room, &source_dir, &db_file, modifications).await
}

/// Build the search database for `room` at `db_file` from `source_dir`.
///
/// On failure the partially written database is removed so a later run
/// does not mistake it for a finished one.
pub async fn make_db(
    room: &str,
    source_dir: &Path,
    db_file: &Path,
    modifications: &dyn Modifications,
) -> Result<IndexOutcome> {
    if db_file.exists() {
        info!(room = %room, path = %db_file.display(), "db exists; remove it to recreate");
        return Ok(IndexOutcome::AlreadyExists);
    }
    if !source_dir.is_dir() {
        return Err(ArchiveError::RoomNotFound(source_dir.display().to_string()).into());
    }

    let pool = db::connect(db_file, true).await?;
    let built = build(&pool, room, source_dir, modifications).await;
    pool.close().await;

    let (files, rows, last) = match built {
        Ok(built) => built,
        Err(err) => {
            if let Err(rm_err) = std::fs::remove_file(db_file) {
                warn!(path = %db_file.display(), error = %rm_err, "failed to remove partial db");
            }
            return Err(err);
        }
    };

    info!(room = %room, "noting last entry");
    let marker = match last {
        Some((file, events)) => {
            let marker = LastAdded::for_file(file, &events);
            let marker_path = db::last_added_path(db_file);
            std::fs::write(&marker_path, serde_json::to_string(&marker)?)
                .with_context(|| format!("Failed to write {}", marker_path.display()))?;
            Some(marker)
        }
        None => {
            warn!(room = %room, "no day files; no last-added marker written");
            None
        }
    };

    Ok(IndexOutcome::Indexed {
        files,
        rows,
        marker,
    })
}

type Built = (usize, u64, Option<(String, Vec<Event>)>);

async fn build(
    pool: &SqlitePool,
    room: &str,
    source_dir: &Path,
    modifications: &dyn Modifications,
) -> Result<Built> {
    sqlx::query(
        r#"
        CREATE VIRTUAL TABLE search USING fts5(
            sender, ts UNINDEXED, idx UNINDEXED, content,
            prefix=3
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Oldest first, so the marker describes the chronologically latest file.
    let mut days = list_source_days(source_dir)?;
    days.reverse();

    let mut rows = 0u64;
    let mut last = None;
    for day in &days {
        let file = day_file_name(day);
        info!(room = %room, file = %file, "reading");
        let events = read_day(source_dir, day)?;
        let modified = modifications.apply(room, events.clone());
        rows += insert_day(pool, &modified)
            .await
            .with_context(|| format!("Failed to index {}", file))?;
        last = Some((file, events));
    }

    info!(room = %room, "creating fts");
    sqlx::query("INSERT INTO search(search) VALUES ('optimize')")
        .execute(pool)
        .await?;

    info!(room = %room, "optimizing");
    sqlx::query("PRAGMA page_size = 2048").execute(pool).await?;
    sqlx::query("VACUUM").execute(pool).await?;
    sqlx::query("ANALYZE").execute(pool).await?;

    Ok((days.len(), rows, last))
}

async fn insert_day(pool: &SqlitePool, events: &[Event]) -> Result<u64> {
    if events.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for (idx, event) in events.iter().enumerate() {
        sqlx::query("INSERT INTO search (sender, ts, idx, content) VALUES (?, ?, ?, ?)")
            .bind(&event.sender_name)
            .bind(event.ts)
            .bind(idx as i64)
            .bind(&event.content.body)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(events.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::text_event;
    use crate::models::LastAddedCursor;
    use crate::modifications::NoModifications;
    use sqlx::Row;
    use std::fs;
    use tempfile::TempDir;

    fn write_day(dir: &Path, day: &str, events: &[Event]) {
        fs::write(
            dir.join(day_file_name(day)),
            serde_json::to_string(events).unwrap(),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_make_db_indexes_plain_bodies() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("room");
        fs::create_dir_all(&src).unwrap();
        let mut rich = text_event(2, "Bob", "plain words");
        rich.content.format = Some(crate::models::HTML_FORMAT.to_string());
        rich.content.formatted_body = Some("<b>markup</b>".to_string());
        write_day(&src, "2021-01-01", &[text_event(1, "Alice", "hello world"), rich]);
        write_day(&src, "2021-01-02", &[text_event(3, "Alice", "goodbye")]);
        let db_file = tmp.path().join("sql").join("room.sqlite3");

        let outcome = make_db("room", &src, &db_file, &NoModifications).await.unwrap();
        match &outcome {
            IndexOutcome::Indexed { files, rows, marker } => {
                assert_eq!(*files, 2);
                assert_eq!(*rows, 3);
                let marker = marker.as_ref().unwrap();
                assert_eq!(marker.file, "2021-01-02.json");
                assert_eq!(marker.cursor, LastAddedCursor::Ts { ts: 3 });
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let pool = db::connect(&db_file, false).await.unwrap();
        let rows = sqlx::query("SELECT sender, ts, idx FROM search WHERE search MATCH ?")
            .bind("plain")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get::<String, _>("sender"), "Bob");
        assert_eq!(rows[0].get::<i64, _>("idx"), 1);

        let markup: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM search WHERE search MATCH 'markup'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(markup, 0);

        // prefix index: three-letter prefix query
        let prefix: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM search WHERE search MATCH 'hel*'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(prefix, 1);
        pool.close().await;

        let marker_json = fs::read_to_string(tmp.path().join("sql").join("room-last-added.json")).unwrap();
        assert_eq!(marker_json, r#"{"file":"2021-01-02.json","ts":3}"#);
    }

    #[tokio::test]
    async fn test_existing_db_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("room");
        fs::create_dir_all(&src).unwrap();
        let mut e = text_event(1, "Alice", "hello");
        e.id = Some("$a".to_string());
        write_day(&src, "2021-01-01", &[e]);
        let db_file = tmp.path().join("room.sqlite3");

        make_db("room", &src, &db_file, &NoModifications).await.unwrap();
        let marker_path = db::last_added_path(&db_file);
        let before = fs::read_to_string(&marker_path).unwrap();
        assert_eq!(before, r#"{"file":"2021-01-01.json","ids":["$a"]}"#);

        write_day(&src, "2021-01-02", &[text_event(2, "Bob", "new")]);
        let outcome = make_db("room", &src, &db_file, &NoModifications).await.unwrap();
        assert_eq!(outcome, IndexOutcome::AlreadyExists);
        assert_eq!(fs::read_to_string(&marker_path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_bad_day_file_removes_partial_db() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("room");
        fs::create_dir_all(&src).unwrap();
        write_day(&src, "2021-01-01", &[text_event(1, "Alice", "hello")]);
        fs::write(src.join("2021-01-02.json"), "[{").unwrap();
        let db_file = tmp.path().join("room.sqlite3");

        assert!(make_db("room", &src, &db_file, &NoModifications).await.is_err());
        assert!(!db_file.exists());
        assert!(!db::last_added_path(&db_file).exists());
    }

    #[tokio::test]
    async fn test_missing_source_dir() {
        let tmp = TempDir::new().unwrap();
        let db_file = tmp.path().join("room.sqlite3");
        let err = make_db("room", &tmp.path().join("nope"), &db_file, &NoModifications)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("room not found"));
        assert!(!db_file.exists());
    }
}
