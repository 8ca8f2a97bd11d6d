//! Presentation fixups applied to rendered day pages.
//!
//! Runs as a tree transformation over a fully parsed document:
//!
//! - quoted replies (`mx-reply > blockquote`) lose their first three child
//!   elements, the "In reply to <user>" preamble emitted upstream;
//! - links to user profiles (`https://matrix.to/#/@...`) become plain
//!   `<span>`s coloured like the user's nick.

use anyhow::{Context, Result};
use kuchikiki::traits::*;
use kuchikiki::{Attribute, ElementData, ExpandedName, NodeRef};

use crate::error::ArchiveError;
use crate::nick::nick_class;

const REPLY_SELECTOR: &str = "mx-reply > blockquote";
const REPLY_PREAMBLE_ELEMENTS: usize = 3;
const PROFILE_LINK_PREFIX: &str = "https://matrix.to/#/@";

pub fn postprocess_html(html: &str) -> Result<String> {
    let document = kuchikiki::parse_html().one(html);

    strip_reply_preambles(&document)?;
    uncolor_profile_links(&document)?;

    let mut out = Vec::with_capacity(html.len());
    document
        .serialize(&mut out)
        .context("Failed to serialize post-processed document")?;
    String::from_utf8(out).context("Serialized document is not UTF-8")
}

fn select_all(document: &NodeRef, selector: &str) -> Result<Vec<NodeRef>> {
    let matches = document
        .select(selector)
        .map_err(|()| ArchiveError::Selector(selector.to_string()))?;
    Ok(matches.map(|m| m.as_node().clone()).collect())
}

fn strip_reply_preambles(document: &NodeRef) -> Result<()> {
    for quote in select_all(document, REPLY_SELECTOR)? {
        let preamble: Vec<NodeRef> = quote
            .children()
            .filter(|child| child.as_element().is_some())
            .take(REPLY_PREAMBLE_ELEMENTS)
            .collect();
        for node in preamble {
            node.detach();
        }
    }
    Ok(())
}

fn uncolor_profile_links(document: &NodeRef) -> Result<()> {
    for link in select_all(document, "a")? {
        let Some(el) = link.as_element() else {
            continue;
        };
        let is_profile = el
            .attributes
            .borrow()
            .get("href")
            .is_some_and(|href| href.starts_with(PROFILE_LINK_PREFIX));
        if !is_profile {
            continue;
        }

        let span = span_like(el, nick_class(&link.text_contents()));
        let children: Vec<NodeRef> = link.children().collect();
        for child in children {
            span.append(child);
        }
        link.insert_before(span);
        link.detach();
    }
    Ok(())
}

/// A detached `<span class=...>` in the same namespace as `el`.
fn span_like(el: &ElementData, class: String) -> NodeRef {
    let mut name = el.name.clone();
    name.local = "span".into();
    NodeRef::new_element(
        name,
        [(
            ExpandedName::new("", "class"),
            Attribute {
                prefix: None,
                value: class,
            },
        )],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_first_three_reply_children() {
        let html = "<!doctype html><body><table><tbody><tr><td><mx-reply><blockquote><a href=\"https://matrix.to/#/!room/$ev\">In reply to</a><a href=\"https://example.com/u\">someone</a><br><p>quoted text</p></blockquote></mx-reply>answer</td></tr></tbody></table></body>";
        let out = postprocess_html(html).unwrap();
        assert!(!out.contains("In reply to"));
        assert!(!out.contains("someone"));
        assert!(out.contains("<blockquote><p>quoted text</p></blockquote>"));
        assert!(out.contains("answer"));
    }

    #[test]
    fn test_short_reply_block_does_not_fail() {
        let html = "<body><mx-reply><blockquote><p>only</p></blockquote></mx-reply></body>";
        let out = postprocess_html(html).unwrap();
        assert!(out.contains("<blockquote></blockquote>"));
    }

    #[test]
    fn test_profile_links_become_colored_spans() {
        let html = "<body><p>hi <a href=\"https://matrix.to/#/@bob:example.com\">Bob <b>B</b></a>, see <a href=\"https://example.com\">this</a></p></body>";
        let out = postprocess_html(html).unwrap();
        let class = nick_class("Bob B");
        assert!(out.contains(&format!("hi <span class=\"{}\">Bob <b>B</b></span>,", class)));
        assert!(!out.contains("matrix.to"));
        assert!(out.contains("<a href=\"https://example.com\">this</a>"));
    }

    #[test]
    fn test_output_is_full_document() {
        let out = postprocess_html("<!doctype html>\n<head><title>t</title></head><body>x</body>").unwrap();
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("<html>"));
        assert!(out.contains("<title>t</title>"));
        assert!(out.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_profile_span_carries_only_nick_class() {
        let html = "<body><table><tbody><tr><td>ping <a href=\"https://matrix.to/#/@carol:x.org\" title=\"t\">Carol</a> and <a href=\"https://matrix.to/#/@dan:x.org\">Dan</a></td></tr></tbody></table></body>";
        let out = postprocess_html(html).unwrap();
        assert!(out.contains(&format!(
            "<td>ping <span class=\"{}\">Carol</span> and <span class=\"{}\">Dan</span></td>",
            nick_class("Carol"),
            nick_class("Dan")
        )));
        assert!(!out.contains("title=\"t\""));
        assert!(!out.contains("<a "));
    }
}
