use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::layout::list_source_days;

/// Status of one room as seen by the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomStatus {
    pub room: String,
    pub historical: bool,
    pub days: usize,
    pub indexed: bool,
}

pub fn get_rooms(config: &Config) -> Result<Vec<RoomStatus>> {
    let mut statuses = Vec::new();
    for room in config.room_list()? {
        let days = list_source_days(&config.source_dir(&room))?.len();
        let indexed = db::db_path(config, &room.room).exists();
        statuses.push(RoomStatus {
            room: room.room,
            historical: room.historical,
            days,
            indexed,
        });
    }
    Ok(statuses)
}

pub fn list_rooms(config: &Config) -> Result<()> {
    let rooms = get_rooms(config)?;
    if rooms.is_empty() {
        println!("No rooms found.");
        return Ok(());
    }

    println!("{:<32} {:<12} {:>6} INDEXED", "ROOM", "SOURCE", "DAYS");
    for status in &rooms {
        let source = if status.historical { "historical" } else { "live" };
        println!(
            "{:<32} {:<12} {:>6} {}",
            status.room, source, status.days, status.indexed
        );
    }
    Ok(())
}
