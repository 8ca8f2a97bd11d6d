//! Core data models used throughout the archive.
//!
//! These types mirror the per-day JSON log files written by the upstream
//! ingester, plus the last-added marker persisted next to each search
//! database.

use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

/// Message type of a plain text message.
pub const MSGTYPE_TEXT: &str = "m.text";
/// Message type of an action (`/me`) message.
pub const MSGTYPE_EMOTE: &str = "m.emote";
/// `content.format` value marking a trusted pre-rendered HTML body.
pub const HTML_FORMAT: &str = "org.matrix.custom.html";

/// One chat message from a day file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Epoch milliseconds.
    pub ts: i64,
    pub sender_id: String,
    /// Display name, possibly suffixed with `" (@user:domain.tld)"`.
    pub sender_name: String,
    pub content: Content,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Message payload of an [`Event`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub msgtype: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_body: Option<String>,
}

/// The two message kinds the renderer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgKind {
    Text,
    Emote,
}

impl Content {
    /// Classify the message, rejecting anything that is neither text nor emote.
    pub fn kind(&self) -> Result<MsgKind, ArchiveError> {
        match self.msgtype.as_str() {
            MSGTYPE_TEXT => Ok(MsgKind::Text),
            MSGTYPE_EMOTE => Ok(MsgKind::Emote),
            other => Err(ArchiveError::UnknownMsgType {
                msgtype: other.to_string(),
            }),
        }
    }

    /// The trusted HTML body, if this is a rich message.
    pub fn html_body(&self) -> Option<&str> {
        match (self.format.as_deref(), self.formatted_body.as_deref()) {
            (Some(HTML_FORMAT), Some(body)) => Some(body),
            _ => None,
        }
    }
}

/// Resumption cursor written beside a room's search database.
///
/// Serialized as `{"file": "...", "ids": [...]}` or `{"file": "...", "ts": N}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastAdded {
    pub file: String,
    #[serde(flatten)]
    pub cursor: LastAddedCursor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LastAddedCursor {
    Ids { ids: Vec<String> },
    Ts { ts: i64 },
}

impl LastAdded {
    /// Build the marker for the last processed day file.
    ///
    /// Ids are recorded when every event carries one; otherwise the final
    /// event's timestamp is recorded. An empty file records an empty id list.
    pub fn for_file(file: impl Into<String>, events: &[Event]) -> Self {
        let ids: Option<Vec<String>> = events.iter().map(|e| e.id.clone()).collect();
        let cursor = match (ids, events.last()) {
            (_, None) => LastAddedCursor::Ids { ids: Vec::new() },
            (Some(ids), Some(_)) => LastAddedCursor::Ids { ids },
            (None, Some(last)) => LastAddedCursor::Ts { ts: last.ts },
        };
        Self {
            file: file.into(),
            cursor,
        }
    }
}
