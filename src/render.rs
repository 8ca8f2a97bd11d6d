//! Day page rendering.
//!
//! [`render_day`] turns one room-day of events into a self-contained HTML
//! document: inline styles, an inline script for permalink highlighting, a
//! sidebar listing every room, and one table row per event anchored at
//! `L<index>`. Output depends only on the inputs, so re-rendering an
//! unchanged day yields identical bytes.

use chrono::{DateTime, Utc};
use linkify::{LinkFinder, LinkKind};
use regex::Regex;
use std::fmt::Write as _;
use std::sync::LazyLock;

use crate::config::SiteConfig;
use crate::error::ArchiveError;
use crate::layout::sanitize_room_name;
use crate::models::{Event, MsgKind};
use crate::nick::nick_class;

/// Shown on the landing page in place of a log.
pub const EMPTY_INDEX_MESSAGE: &str = "[see channel index on the left]";
/// Shown on a room page for a day with no events.
pub const EMPTY_DAY_MESSAGE: &str = "[no messages to display for this date]";

/// Which page is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page<'a> {
    /// The global landing page.
    Index,
    /// One room on one day, with the neighbouring days that have logs.
    Room {
        room: &'a str,
        day: &'a str,
        prev: Option<&'a str>,
        next: Option<&'a str>,
    },
}

impl Page<'_> {
    fn current_room(&self) -> Option<&str> {
        match self {
            Page::Index => None,
            Page::Room { room, .. } => Some(*room),
        }
    }
}

static CANONICAL_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*) \(@[^):\s]+:[^):\s]+\.[^):\s]+\)$").unwrap()
});

static LINK_FINDER: LazyLock<LinkFinder> = LazyLock::new(|| {
    let mut finder = LinkFinder::new();
    finder.url_must_have_scheme(false);
    finder
});

/// Render a complete HTML document for `page`.
///
/// Fails if any event has a message type other than text or emote; a day
/// containing such an event is not rendered at all.
pub fn render_day(
    site: &SiteConfig,
    rooms: &[String],
    page: &Page<'_>,
    events: &[Event],
) -> Result<String, ArchiveError> {
    let title = match page {
        Page::Index => escape_html(&site.title),
        Page::Room { room, day, .. } => format!("{} on {}", escape_html(room), escape_html(day)),
    };

    let log = if !events.is_empty() {
        let rows = events
            .iter()
            .enumerate()
            .map(|(i, event)| render_event(i, event))
            .collect::<Result<Vec<_>, _>>()?;
        format!(
            "<table><tbody id=\"log-tbody\">\n  {}\n</tbody></table>",
            rows.join("\n  ")
        )
    } else if *page == Page::Index {
        EMPTY_INDEX_MESSAGE.to_string()
    } else {
        EMPTY_DAY_MESSAGE.to_string()
    };

    Ok(format!(
        "<!doctype html>\n<head>\n  <meta charset=\"utf-8\">\n  <title>{title}</title>\n  <style>{STYLE}</style>\n  <script>{SCRIPT}</script>\n</head>\n<body><div class=\"wrapper\">\n<div class=\"sidebar\">{sidebar}</div>\n<div class=\"log\">\n{log}\n</div></div></body>\n",
        title = title,
        sidebar = render_sidebar(site, rooms, page),
        log = log,
    ))
}

fn render_sidebar(site: &SiteConfig, rooms: &[String], page: &Page<'_>) -> String {
    let header = match page {
        Page::Index => "<div class=\"title\">Channel Index</div>".to_string(),
        Page::Room {
            room,
            day,
            prev,
            next,
        } => {
            let prev_label = "<span>prev</span>";
            let next_label = "<span style=\"float:right\">next</span>";
            let prev = match prev {
                Some(d) => format!("<a href=\"{}\" class=\"nav\">{}</a>", escape_html(d), prev_label),
                None => prev_label.to_string(),
            };
            let next = match next {
                Some(d) => format!("<a href=\"{}\" class=\"nav\">{}</a>", escape_html(d), next_label),
                None => next_label.to_string(),
            };
            format!(
                "\n<div class=\"title\">{}<br>{}</div>\n{}\n{}\n",
                escape_html(room),
                escape_html(day),
                prev,
                next
            )
        }
    };

    let list = rooms
        .iter()
        .map(|r| render_room_link(r, page))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n<ul class=\"room-list\">\n{}\n</ul>\n<div class=\"footer\"><a href=\"{}\">source on github</a></div>\n",
        header,
        list,
        escape_html(&site.source_url)
    )
}

fn render_room_link(room: &str, page: &Page<'_>) -> String {
    let prefix = match page {
        Page::Index => "",
        Page::Room { .. } => "../",
    };
    let class = if page.current_room() == Some(room) {
        " class=\"current-room\""
    } else {
        ""
    };
    format!(
        "<li><a href=\"{}{}/\"{}>{}</a></li>",
        prefix,
        escape_html(&sanitize_room_name(room)),
        class,
        escape_html(room)
    )
}

fn render_event(index: usize, event: &Event) -> Result<String, ArchiveError> {
    let kind = event.content.kind()?;
    let id = format!("L{}", index);

    let at = DateTime::<Utc>::from_timestamp_millis(event.ts)
        .ok_or(ArchiveError::InvalidTimestamp { ts: event.ts })?;
    let ts = format!(
        "<a class=\"ts\" href=\"#{}\" title=\"{}\">{}</a>",
        id,
        at.format("%a %b %d %Y %H:%M:%S UTC"),
        at.format("%H:%M")
    );

    let display = display_name(&event.sender_name);
    let nick = format!(
        "<span class=\"nick {}\" title=\"{}\">{}</span>",
        nick_class(display),
        escape_html(&event.sender_id),
        escape_html(display)
    );
    let nick = match kind {
        MsgKind::Text => format!("&lt;{}&gt;", nick),
        MsgKind::Emote => nick,
    };

    let contents = match event.content.html_body() {
        Some(html) => autolink(html),
        None => autolink(&escape_html(&event.content.body)),
    };

    Ok(format!(
        "<tr class=\"msg\" id=\"{id}\"><td class=\"ts-cell\">{ts}</td><td class=\"nick-cell\">{nick}</td><td class=\"msg-cell\">{contents}</td></tr>"
    ))
}

/// Display name with a trailing `" (@user:domain.tld)"` removed.
pub fn display_name(sender_name: &str) -> &str {
    CANONICAL_SUFFIX
        .captures(sender_name)
        .and_then(|caps| caps.get(1))
        .map_or(sender_name, |m| m.as_str())
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap bare URLs in `<a>` elements.
///
/// Only text outside tags and outside existing links is scanned. Email
/// addresses and `file:///` URLs stay plain text. A URL without a scheme is
/// linked only if it starts with `www.` or ends in a common top-level domain.
pub fn autolink(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut link_depth = 0usize;
    let mut rest = html;

    while !rest.is_empty() {
        if rest.starts_with('<') {
            let end = rest.find('>').map_or(rest.len(), |i| i + 1);
            let tag = &rest[..end];
            if is_tag(tag, "<a") {
                link_depth += 1;
            } else if is_tag(tag, "</a") {
                link_depth = link_depth.saturating_sub(1);
            }
            out.push_str(tag);
            rest = &rest[end..];
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            let text = &rest[..end];
            if link_depth == 0 {
                link_text(text, &mut out);
            } else {
                out.push_str(text);
            }
            rest = &rest[end..];
        }
    }
    out
}

fn is_tag(tag: &str, open: &str) -> bool {
    let Some(head) = tag.get(..open.len()) else {
        return false;
    };
    head.eq_ignore_ascii_case(open)
        && tag[open.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_whitespace() || c == '>' || c == '/')
}

/// Top-level domains accepted for links written without a scheme. Suffixes
/// that read as file extensions or identifiers (`rs`, `md`, `map`, `foo`)
/// are left out so `Cargo.toml` or `Array.prototype.map` stay plain.
const SCHEMELESS_TLDS: &[&str] = &[
    "com", "org", "net", "edu", "gov", "mil", "int", "io", "dev", "app", "ai", "co", "me",
    "info", "biz", "xyz", "us", "uk", "ca", "de", "fr", "nl", "eu", "ch", "se", "no", "fi",
    "jp", "cn", "au", "nz", "br", "ru", "es", "it",
];

const ENTITIES: &[(&str, char)] = &[
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&amp;", '&'),
    ("&quot;", '"'),
    ("&#039;", '\''),
    ("&#39;", '\''),
    ("&apos;", '\''),
];

// Links are found in the decoded text so escaped brackets and ampersands
// delimit URLs as they would in the raw message. Everything outside a link
// is copied from `text` unchanged.
fn link_text(text: &str, out: &mut String) {
    let (decoded, offsets) = decode_entities(text);
    for span in LINK_FINDER.spans(&decoded) {
        let source = &text[offsets[span.start()]..offsets[span.end()]];
        let s = span.as_str();
        match span.kind() {
            Some(LinkKind::Url) if is_linkable(s) => {
                let href = if s.contains("://") {
                    s.to_string()
                } else {
                    format!("http://{}", s)
                };
                let _ = write!(out, "<a href=\"{}\">{}</a>", escape_html(&href), source);
            }
            _ => out.push_str(source),
        }
    }
}

fn is_linkable(url: &str) -> bool {
    if url.starts_with("file:///") {
        return false;
    }
    if url.contains("://") {
        return true;
    }
    let host = url.split(['/', '?', '#', ':']).next().unwrap_or(url);
    if host.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("www.")) {
        return true;
    }
    host.rsplit('.')
        .next()
        .is_some_and(|tld| SCHEMELESS_TLDS.iter().any(|t| t.eq_ignore_ascii_case(tld)))
}

/// Decode the entities [`escape_html`] emits. `offsets[i]` is the position in
/// `text` where decoded byte `i` came from, with one trailing entry for the end.
fn decode_entities(text: &str) -> (String, Vec<usize>) {
    let mut decoded = String::with_capacity(text.len());
    let mut offsets = Vec::with_capacity(text.len() + 1);
    let mut pos = 0;
    while pos < text.len() {
        let rest = &text[pos..];
        if let Some((entity, c)) = ENTITIES.iter().find(|(e, _)| rest.starts_with(*e)) {
            offsets.push(pos);
            decoded.push(*c);
            pos += entity.len();
            continue;
        }
        let Some(c) = rest.chars().next() else {
            break;
        };
        offsets.extend(pos..pos + c.len_utf8());
        decoded.push(c);
        pos += c.len_utf8();
    }
    offsets.push(text.len());
    (decoded, offsets)
}

const STYLE: &str = r#"
  body { background-color: #fafafa; }
  .wrapper { display: flex; position: absolute; top: 5px; bottom: 10px; width: 100%; }
  .sidebar { flex: 0 0 165px; border-right: 1px solid #444; padding-right: 10px; }
  .title { text-align: center; }
  .room-list { border-top: 1px solid #444; padding-top: 2em; padding-left: .1em; list-style: none; margin: 1em 0 0 0; }
  .room-list > li { margin-top: .2em; }
  .room-list a { color: #777; text-decoration: none; }
  .room-list a:hover { text-decoration: underline; }
  .current-room { padding-left: .5em; color: black !important; }
  .footer { position: absolute; bottom: 0px; }
  .nav > span { text-decoration: underline; }
  .log { overflow-y: auto; padding-left: 1em; }
  table { border-spacing: 0px; }
  td { padding: .12em; }
  a { color: green; }
  p { margin: 0px; }
  .ts { color: #777; text-decoration: none; }
  .ts:hover { text-decoration: underline; }
  .ts-cell { vertical-align: top; }
  .nick-cell { max-width: 10em; text-align: right; vertical-align: top; }
  .msg-cell { padding-left: .3em; }
  .highlight { background-color: #fffbdd; }
  blockquote { margin: 0px; border-left: 4px solid #ddd; padding-left: .3em; }
  .nick-1 { color: #f25e0d } .nick-2 { color: #e43611 } .nick-3 { color: #f98a11 } .nick-4 { color: #b4a700 }
  .nick-5 { color: #89bd3b } .nick-6 { color: #4ea847 } .nick-7 { color: #287e52 } .nick-8 { color: #117873 }
  .nick-9 { color: #0083a7 } .nick-10 { color: #2a6596 } .nick-11 { color: #385189 } .nick-12 { color: #434078 }
  .nick-13 { color: #5e4279 } .nick-14 { color: #7a447a } .nick-15 { color: #e92980 } .nick-16 { color: #ec273e }
  "#;

// Highlight state lives only for one page load. `applyHighlight(true)` runs
// once on DOMContentLoaded and may scroll; later hash changes pass false.
const SCRIPT: &str = r#"
  (function () {
    var RANGE = /^L[0-9]+-L[0-9]+$/;

    function fragment() {
      var h = location.hash;
      return h.charAt(0) === '#' ? h.substring(1) : h;
    }

    function isRow(id) {
      var el = document.getElementById(id);
      return el !== null && el.classList.contains('msg');
    }

    function applyHighlight(initial) {
      var lit = document.querySelectorAll('.highlight');
      for (var i = 0; i < lit.length; i++) {
        lit[i].classList.remove('highlight');
      }

      var hash = fragment();
      if (RANGE.test(hash)) {
        var ends = hash.split('-');
        var tbody = document.getElementById('log-tbody');
        if (!tbody) {
          return;
        }
        var rows = tbody.children;
        var first = -1;
        var last = -1;
        for (var j = 0; j < rows.length; j++) {
          if (rows[j].id === ends[0]) first = j;
          if (rows[j].id === ends[1]) last = j;
        }
        if (first < 0 || last < 0) {
          return;
        }
        if (first > last) {
          var t = first; first = last; last = t;
        }
        for (var k = first; k <= last; k++) {
          rows[k].classList.add('highlight');
        }
        if (initial) {
          rows[first].scrollIntoView();
        }
      } else if (hash.length > 0) {
        var target = document.getElementById(hash);
        if (target) {
          target.classList.add('highlight');
        }
      }
    }

    document.addEventListener('DOMContentLoaded', function () { applyHighlight(true); });
    window.addEventListener('hashchange', function () { applyHighlight(false); });

    document.addEventListener('click', function (e) {
      var link = e.target;
      if (!link.classList || !link.classList.contains('ts')) {
        return;
      }
      e.preventDefault();
      var hash = fragment();
      if (e.shiftKey && hash.length > 0) {
        var previous = hash.split('-');
        var clicked = link.hash.substring(1);
        if (previous.concat([clicked]).every(isRow)) {
          history.pushState({}, '', '#' + previous[0] + '-' + clicked);
        }
      } else if (link.href === location.href) {
        history.pushState({}, '', location.href.split('#')[0]);
      } else {
        history.pushState({}, '', link.href);
      }
      applyHighlight(false);
    });
  })();
  "#;
