//! Turns the schema-less page payload into songs and tab versions.
//!
//! Every field read goes through an optional accessor with a fixed default,
//! so any shape of input (including `{}`) normalizes without error.

use std::collections::HashSet;

use serde_json::Value;
use tabvault_core::model::{AltVersionRef, Song, TabVersion, Tuning, UNRATED};

use crate::config::Config;

/// Content types that are not plain-text tablature.
pub const DEFAULT_BLACKLIST: &[&str] = &["Pro", "Power", "Official", "Video"];

/// Song name reported for a blacklisted content type.
pub const UNSUPPORTED_SONG_NAME: &str = "Couldn't display tab type";

const TAB: &str = "/store/page/data/tab";
const TAB_VIEW: &str = "/store/page/data/tab_view";

/// Output of [`TabNormalizer::normalize`].
///
/// `tab.tab_url` is left empty; the caller knows the request key.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTab {
    pub song: Song,
    pub tab: TabVersion,
    pub alt_versions: Vec<AltVersionRef>,
    /// Set when the primary tab's type is blacklisted.
    pub unsupported_type: Option<String>,
}

impl NormalizedTab {
    pub fn is_unsupported(&self) -> bool {
        self.unsupported_type.is_some()
    }

    /// Whether the payload described no song at all.
    pub fn is_empty(&self) -> bool {
        self.song.name.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TabNormalizer {
    blacklist: HashSet<String>,
    base_url: String,
}

impl TabNormalizer {
    pub fn new<I, S>(blacklist: I, base_url: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blacklist: blacklist.into_iter().map(Into::into).collect(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.blacklist.iter().cloned(), config.base_url.clone())
    }

    pub fn is_blacklisted(&self, tab_type: &str) -> bool {
        self.blacklist.contains(tab_type)
    }

    /// Normalize a payload tree.
    pub fn normalize(&self, tree: &Value) -> NormalizedTab {
        let tab_type = text(tree.pointer(&format!("{TAB}/type")));

        if self.is_blacklisted(&tab_type) {
            log::info!("Skipping unsupported content type {tab_type:?}");
            return NormalizedTab {
                song: Song::new(0, UNSUPPORTED_SONG_NAME, tab_type.clone()),
                tab: TabVersion::default(),
                alt_versions: Vec::new(),
                unsupported_type: Some(tab_type),
            };
        }

        let song = Song {
            id: integer(tree.pointer(&format!("{TAB}/song_id"))).unwrap_or(0),
            name: text(tree.pointer(&format!("{TAB}/song_name"))),
            artist: text(tree.pointer(&format!("{TAB}/artist_name"))),
        };

        let tab = TabVersion {
            tab_url: String::new(),
            song_id: song.id,
            tab_type,
            version: integer(tree.pointer(&format!("{TAB}/version"))).unwrap_or(0),
            rating: float(tree.pointer(&format!("{TAB}/rating"))).unwrap_or(UNRATED),
            capo: integer(tree.pointer(&format!("{TAB_VIEW}/meta/capo")))
                .and_then(|capo| u32::try_from(capo).ok())
                .unwrap_or(0),
            tuning: tuning(tree.pointer(&format!("{TAB_VIEW}/meta/tuning"))),
            contributors: contributors(tree.pointer(&format!("{TAB_VIEW}/contributors"))),
            tab: text(tree.pointer(&format!("{TAB_VIEW}/wiki_tab/content"))).replace("\r\n", "\n"),
        };

        let alt_versions = self.alt_versions(tree.pointer(&format!("{TAB_VIEW}/versions")));

        NormalizedTab {
            song,
            tab,
            alt_versions,
            unsupported_type: None,
        }
    }

    /// Relative key for a remote URL: strips the base prefix and slashes.
    pub fn relative_url<'a>(&self, url: &'a str) -> &'a str {
        url.strip_prefix(self.base_url.as_str())
            .unwrap_or(url)
            .trim_matches('/')
    }

    fn alt_versions(&self, versions: Option<&Value>) -> Vec<AltVersionRef> {
        let Some(entries) = versions.and_then(Value::as_array) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        entries
            .iter()
            .filter_map(|entry| {
                let tab_type = text(entry.get("type"));
                if self.is_blacklisted(&tab_type) {
                    return None;
                }
                let tab_url = self.relative_url(&text(entry.get("tab_url"))).to_string();
                if tab_url.is_empty() || !seen.insert(tab_url.clone()) {
                    return None;
                }
                Some(AltVersionRef {
                    tab_url,
                    version: integer(entry.get("version")).unwrap_or(0),
                    rating: float(entry.get("rating")).unwrap_or(UNRATED),
                    tab_type,
                })
            })
            .collect()
    }
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn tuning(value: Option<&Value>) -> Tuning {
    match value {
        Some(obj @ Value::Object(_)) => Tuning::new(text(obj.get("name")), text(obj.get("value"))),
        _ => Tuning::default(),
    }
}

/// Contributor usernames in page order; entries may be objects or strings.
fn contributors(value: Option<&Value>) -> Vec<String> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .map(|entry| match entry {
            Value::Object(_) => text(entry.get("username")),
            other => text(Some(other)),
        })
        .filter(|name| !name.is_empty())
        .collect()
}
