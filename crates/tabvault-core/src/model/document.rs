use serde::{Deserialize, Serialize};

use crate::model::{Song, TabVersion, Tuning};

/// A sibling entry in a song's version switcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRef {
    pub tab_url: String,
    pub version: i64,
    pub rating: f64,
}

/// The song as shown alongside a tab, with every known version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongSummary {
    pub id: i64,
    pub name: String,
    pub artist: String,
    pub versions: Vec<VersionRef>,
}

/// The value object handed to the UI.
///
/// `tab` always holds real content; placeholder rows never become a
/// `TabDocument`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabDocument {
    pub tab_url: String,
    pub song: SongSummary,
    #[serde(rename = "type")]
    pub tab_type: String,
    pub version: i64,
    pub rating: f64,
    pub capo: u32,
    pub tuning: Tuning,
    pub contributors: Vec<String>,
    pub tab: String,
}

impl TabDocument {
    /// Assemble a document from a tab, its song, and the song's versions.
    ///
    /// Versions are sorted by version number (then URL) for display.
    #[must_use]
    pub fn assemble(song: &Song, tab: &TabVersion, mut versions: Vec<VersionRef>) -> Self {
        versions.sort_by(|a, b| {
            a.version
                .cmp(&b.version)
                .then_with(|| a.tab_url.cmp(&b.tab_url))
        });

        Self {
            tab_url: tab.tab_url.clone(),
            song: SongSummary {
                id: song.id,
                name: song.name.clone(),
                artist: song.artist.clone(),
                versions,
            },
            tab_type: tab.tab_type.clone(),
            version: tab.version,
            rating: tab.rating,
            capo: tab.capo,
            tuning: tab.tuning.clone(),
            contributors: tab.contributors.clone(),
            tab: tab.tab.clone(),
        }
    }
}

/// Summary of a tab for "recent" and "saved" lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabLink {
    pub tab_url: String,
    pub name: String,
    pub artist: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default, rename = "type")]
    pub tab_type: String,
}

impl From<&TabDocument> for TabLink {
    fn from(doc: &TabDocument) -> Self {
        Self {
            tab_url: doc.tab_url.clone(),
            name: doc.song.name.clone(),
            artist: doc.song.artist.clone(),
            version: doc.version,
            tab_type: doc.tab_type.clone(),
        }
    }
}
