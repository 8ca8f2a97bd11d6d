//! Deterministic nick colouring.
//!
//! A name maps to one of sixteen `nick-N` classes via the IEEE CRC-32 of its
//! UTF-8 bytes, read as a signed 32-bit value. The scheme matches the one used
//! by irclogger so colours stay stable across previously published archives.

/// Number of colour classes, `nick-1` through `nick-16`.
pub const NICK_COLORS: i32 = 16;

/// Colour index in `1..=16` for a display name.
pub fn nick_color(name: &str) -> i32 {
    let crc = crc32fast::hash(name.as_bytes()) as i32;
    // `%` keeps the sign of a negative checksum
    let mut color = crc % NICK_COLORS + 1;
    if color <= 0 {
        color += NICK_COLORS;
    }
    color
}

/// CSS class name for a display name.
pub fn nick_class(name: &str) -> String {
    format!("nick-{}", nick_color(name))
}
