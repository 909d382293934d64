//! Bounded most-recent-first list of viewed tabs.
//!
//! The canonical serialized shape is a JSON array of [`TabLink`]s. An older
//! shape keyed the entries by tab URL in a JSON object; [`RecentTabs::from_json`]
//! migrates it on load, keeping the object's key order (serde_json's
//! `preserve_order` feature).

use std::collections::VecDeque;

use serde::Deserialize;

use crate::error::Result;
use crate::model::TabLink;

/// Default number of entries kept.
pub const DEFAULT_CAPACITY: usize = 50;

/// An ordered set of recently viewed tabs, deduplicated by `tab_url`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentTabs {
    capacity: usize,
    items: VecDeque<TabLink>,
}

impl Default for RecentTabs {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Entry shape of the legacy object-keyed format.
#[derive(Debug, Deserialize)]
struct LegacyEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    version: i64,
    #[serde(default, rename = "type")]
    tab_type: String,
}

impl RecentTabs {
    /// Create an empty list holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Record a visit: move (or insert) the link to the front and evict the
    /// oldest entries beyond capacity. Recording the same link twice in a row
    /// leaves the list unchanged.
    pub fn record_visit(&mut self, link: TabLink) {
        self.items.retain(|item| item.tab_url != link.tab_url);
        self.items.push_front(link);
        self.items.truncate(self.capacity);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TabLink> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, tab_url: &str) -> bool {
        self.items.iter().any(|item| item.tab_url == tab_url)
    }

    /// Serialize to the canonical array shape.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.items)?)
    }

    /// Load from either the canonical array or the legacy object shape.
    ///
    /// Anything else (including `null`) yields an empty list.
    pub fn from_json(json: &str, capacity: usize) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let mut recents = Self::new(capacity);

        let links: Vec<TabLink> = match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<serde_json::Result<Vec<_>>>()?,
            serde_json::Value::Object(map) => {
                let mut links = Vec::with_capacity(map.len());
                for (tab_url, entry) in map {
                    let entry: LegacyEntry = serde_json::from_value(entry)?;
                    links.push(TabLink {
                        tab_url,
                        name: entry.name,
                        artist: entry.artist,
                        version: entry.version,
                        tab_type: entry.tab_type,
                    });
                }
                links
            }
            _ => Vec::new(),
        };

        // Stored most-recent-first, so replay oldest first.
        for link in links.into_iter().rev() {
            recents.record_visit(link);
        }

        Ok(recents)
    }
}
