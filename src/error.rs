use thiserror::Error;

/// Failures callers may want to tell apart from plain I/O errors.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("unknown event message type {msgtype}")]
    UnknownMsgType { msgtype: String },
    #[error("timestamp out of range: {ts}")]
    InvalidTimestamp { ts: i64 },
    #[error("invalid selector: {0}")]
    Selector(String),
    #[error("room not found: {0}")]
    RoomNotFound(String),
}
