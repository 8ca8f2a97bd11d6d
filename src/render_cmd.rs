//! Incremental render driver.
//!
//! Walks every room under the JSON log root and renders only the days that
//! are missing or stale. A rendered day is considered final once it is older
//! than the two most recent rendered days of its room; those two are always
//! regenerated so late corrections to recent history reach the archive.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

use crate::config::Config;
use crate::layout::{list_rendered_days, list_rooms, list_source_days, read_day, sanitize_room_name};
use crate::modifications::Modifications;
use crate::postprocess::postprocess_html;
use crate::render::{render_day, Page};

/// Rendered days per room that are always regenerated.
pub const ALWAYS_RERENDER: usize = 2;

/// What one render run did.
#[derive(Debug, Default)]
pub struct RenderReport {
    pub rooms: usize,
    /// `(room, day)` pairs written this run.
    pub rendered: Vec<(String, String)>,
    pub skipped: usize,
    pub room_indexes: usize,
    pub empty_rooms: Vec<String>,
    pub global_index: bool,
}

pub fn run_render(config: &Config, modifications: &dyn Modifications) -> Result<()> {
    let report = render_all(config, modifications)?;

    println!("render");
    println!("  rooms: {}", report.rooms);
    println!("  days rendered: {}", report.rendered.len());
    println!("  days up to date: {}", report.skipped);
    println!("  room indexes written: {}", report.room_indexes);
    for room in &report.empty_rooms {
        println!("  no day files: {}", room);
    }
    if report.global_index {
        println!("  landing page written");
    }
    println!("ok");
    Ok(())
}

pub fn render_all(config: &Config, modifications: &dyn Modifications) -> Result<RenderReport> {
    let json_root = &config.paths.json_root;
    let docs_root = &config.paths.docs_root;
    let rooms = list_rooms(json_root)?;

    let mut report = RenderReport {
        rooms: rooms.len(),
        ..RenderReport::default()
    };

    for room in &rooms {
        render_room(config, &rooms, room, modifications, &mut report)?;
    }

    if !rooms.is_empty() {
        std::fs::create_dir_all(docs_root)
            .with_context(|| format!("Failed to create {}", docs_root.display()))?;
        let index = render_day(&config.site, &rooms, &Page::Index, &[])?;
        write_file(&docs_root.join("index.html"), &index)?;
        report.global_index = true;
    }

    Ok(report)
}

fn render_room(
    config: &Config,
    rooms: &[String],
    room: &str,
    modifications: &dyn Modifications,
    report: &mut RenderReport,
) -> Result<()> {
    let source_dir = config.paths.json_root.join(room);
    let room_dir = config.paths.docs_root.join(sanitize_room_name(room));
    std::fs::create_dir_all(&room_dir)
        .with_context(|| format!("Failed to create {}", room_dir.display()))?;

    let days = list_source_days(&source_dir)?;
    let already_done: HashSet<String> = list_rendered_days(&room_dir)?
        .into_iter()
        .skip(ALWAYS_RERENDER)
        .collect();

    let mut rendered = 0usize;
    for (i, day) in days.iter().enumerate() {
        if already_done.contains(day) {
            report.skipped += 1;
            continue;
        }

        tracing::debug!(room = %room, day = %day, "rendering");
        let events = modifications.apply(room, read_day(&source_dir, day)?);
        let page = Page::Room {
            room,
            day: day.as_str(),
            prev: days.get(i + 1).map(String::as_str),
            next: i.checked_sub(1).and_then(|n| days.get(n)).map(String::as_str),
        };
        let html = render_day(&config.site, rooms, &page, &events)
            .with_context(|| format!("Failed to render {} on {}", room, day))?;
        let html = postprocess_html(&html)?;
        write_file(&room_dir.join(format!("{}.html", day)), &html)?;
        report.rendered.push((room.to_string(), day.clone()));
        rendered += 1;
    }

    let Some(latest) = days.first() else {
        tracing::warn!(room = %room, "no day files; skipping room index");
        report.empty_rooms.push(room.to_string());
        return Ok(());
    };

    write_file(&room_dir.join("index.html"), &redirect_page(latest))?;
    report.room_indexes += 1;
    tracing::info!(room = %room, rendered, "room done");
    Ok(())
}

/// Page that immediately redirects to `day`.
pub fn redirect_page(day: &str) -> String {
    format!(
        "<!doctype html>\n<meta http-equiv=\"refresh\" content=\"0; URL='{}'\" />\n",
        day
    )
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
