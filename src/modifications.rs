//! Retroactive corrections to archived content.
//!
//! Day files are append-only upstream, so edits to history (redactions,
//! removals) are expressed as a [`Modifications`] pass applied to a day's
//! events before they are rendered or indexed. Both consumers use the same
//! pass so a search hit's in-day position always matches the rendered
//! `L<idx>` anchor.

use crate::config::{Config, ModificationConfig};
use crate::models::Event;

/// A pure, deterministic rewrite of one day's events.
pub trait Modifications: Send + Sync {
    fn apply(&self, room: &str, events: Vec<Event>) -> Vec<Event>;
}

/// Leaves every event untouched.
pub struct NoModifications;

impl Modifications for NoModifications {
    fn apply(&self, _room: &str, events: Vec<Event>) -> Vec<Event> {
        events
    }
}

/// Corrections listed under `[[modifications]]` in the config file.
pub struct ConfiguredModifications {
    rules: Vec<ModificationConfig>,
}

impl ConfiguredModifications {
    pub fn new(rules: Vec<ModificationConfig>) -> Self {
        Self { rules }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.modifications.clone())
    }

    fn rule_for(&self, room: &str, event: &Event) -> Option<&ModificationConfig> {
        self.rules.iter().find(|rule| {
            rule.room == room
                && match (&rule.id, rule.ts) {
                    (Some(id), _) => event.id.as_deref() == Some(id.as_str()),
                    (None, Some(ts)) => event.ts == ts,
                    (None, None) => false,
                }
        })
    }
}

impl Modifications for ConfiguredModifications {
    fn apply(&self, room: &str, events: Vec<Event>) -> Vec<Event> {
        if self.rules.is_empty() {
            return events;
        }
        events
            .into_iter()
            .filter_map(|mut event| match self.rule_for(room, &event) {
                None => Some(event),
                Some(rule) if rule.remove => None,
                Some(rule) => {
                    if let Some(body) = &rule.body {
                        event.content.body = body.clone();
                        event.content.format = None;
                        event.content.formatted_body = None;
                    }
                    Some(event)
                }
            })
            .collect()
    }
}
