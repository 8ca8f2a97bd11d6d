//! # Matrix Archive
//!
//! Turns chat-room logs stored as per-day JSON files into a static, browsable
//! HTML archive and a full-text search database per room.
//!
//! ## Architecture
//!
//! ```text
//! logs/json/<room>/<YYYY-MM-DD>.json
//!            │
//!            ▼
//!     ┌──────────────┐
//!     │ Modifications│
//!     └──────┬───────┘
//!            ├──────────────────────┐
//!            ▼                      ▼
//!   ┌────────────────┐      ┌───────────────┐
//!   │ render + post- │      │ FTS5 indexer  │
//!   │ process (HTML) │      │ + last-added  │
//!   └───────┬────────┘      └───────┬───────┘
//!           ▼                       ▼
//!   logs/docs/<room>/*.html   sql/<room>.sqlite3
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Events and the last-added marker |
//! | [`layout`] | Day-file discovery and room names |
//! | [`modifications`] | Retroactive content corrections |
//! | [`nick`] | Deterministic nick colours |
//! | [`render`] | Day page HTML |
//! | [`postprocess`] | DOM fixups on rendered pages |
//! | [`render_cmd`] | Incremental render driver |
//! | [`db`] | Search database connection |
//! | [`indexer`] | Search database builder |
//! | [`search`] | Keyword queries over a room's database |
//! | [`rooms`] | Room status listing |

pub mod config;
pub mod db;
pub mod error;
pub mod indexer;
pub mod layout;
pub mod models;
pub mod modifications;
pub mod nick;
pub mod postprocess;
pub mod render;
pub mod render_cmd;
pub mod rooms;
pub mod search;
