//! On-disk layout of the log tree.
//!
//! Day files live at `<root>/<room>/<YYYY-MM-DD>.json` and rendered pages at
//! `<docs>/<sanitized-room>/<YYYY-MM-DD>.html`. Only names matching the strict
//! date pattern count as days; anything else in those directories is ignored.

use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use walkdir::WalkDir;

use crate::models::Event;

static JSON_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4}-[0-9]{2}-[0-9]{2})\.json$").unwrap());
static HTML_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4}-[0-9]{2}-[0-9]{2})\.html$").unwrap());

/// Filesystem- and URL-safe key for a room name.
pub fn sanitize_room_name(room: &str) -> String {
    room.replace(' ', "_")
}

/// Room directories directly under `root`, sorted lexicographically.
pub fn list_rooms(root: &Path) -> Result<Vec<String>> {
    let mut rooms = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to list {}", root.display()))?;
        if entry.file_type().is_dir() {
            rooms.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    rooms.sort();
    Ok(rooms)
}

/// Dates of the day files in a room's source directory, most recent first.
pub fn list_source_days(dir: &Path) -> Result<Vec<String>> {
    list_days(dir, &JSON_DAY)
}

/// Dates already rendered into a room's output directory, most recent first.
pub fn list_rendered_days(dir: &Path) -> Result<Vec<String>> {
    list_days(dir, &HTML_DAY)
}

fn list_days(dir: &Path, pattern: &Regex) -> Result<Vec<String>> {
    let mut days = Vec::new();
    if !dir.exists() {
        return Ok(days);
    }
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if let Some(caps) = pattern.captures(&name) {
            days.push(caps[1].to_string());
        }
    }
    days.sort_unstable_by(|a, b| b.cmp(a));
    Ok(days)
}

/// Name of the day file for `day`.
pub fn day_file_name(day: &str) -> String {
    format!("{}.json", day)
}

/// Load and parse one day file.
pub fn read_day(dir: &Path, day: &str) -> Result<Vec<Event>> {
    let path = dir.join(day_file_name(day));
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read day file: {}", path.display()))?;
    let events: Vec<Event> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse day file: {}", path.display()))?;
    Ok(events)
}
