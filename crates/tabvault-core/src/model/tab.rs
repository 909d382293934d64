use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Body value marking a sibling version that is known to exist but whose
/// content has not been fetched yet.
pub const ALT_PLACEHOLDER: &str = "ALT";

/// Rating recorded when the remote page carries none.
pub const UNRATED: f64 = -1.0;

/// An instrument tuning, e.g. `{ name: "Standard", value: "E A D G B E" }`.
///
/// An absent tuning serializes as `{}` and reads back as
/// `Tuning::default()`. Any other tuning carries both keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Tuning {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl Serialize for Tuning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_empty() {
            return serializer.serialize_struct("Tuning", 0)?.end();
        }
        let mut state = serializer.serialize_struct("Tuning", 2)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("value", &self.value)?;
        state.end()
    }
}

impl Tuning {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.value.is_empty()
    }
}

/// One arrangement ("version") of a song.
///
/// `tab_url` is the relative path on the remote site and the natural key
/// in the cache. `tab` is either the full tablature text or
/// [`ALT_PLACEHOLDER`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabVersion {
    pub tab_url: String,
    pub song_id: i64,
    /// Remote content type ("Chords", "Tabs", ...).
    pub tab_type: String,
    pub version: i64,
    pub rating: f64,
    pub capo: u32,
    pub tuning: Tuning,
    /// Contributor usernames in the order the page lists them.
    pub contributors: Vec<String>,
    pub tab: String,
}

impl Default for TabVersion {
    fn default() -> Self {
        Self {
            tab_url: String::new(),
            song_id: 0,
            tab_type: String::new(),
            version: 0,
            rating: UNRATED,
            capo: 0,
            tuning: Tuning::default(),
            contributors: Vec::new(),
            tab: String::new(),
        }
    }
}

impl TabVersion {
    /// Whether this row only marks a sibling that still needs fetching.
    pub fn is_placeholder(&self) -> bool {
        self.tab == ALT_PLACEHOLDER
    }

    /// Whether the body holds real, fetched tablature.
    pub fn has_content(&self) -> bool {
        !self.tab.is_empty() && !self.is_placeholder()
    }
}

/// A sibling version discovered while normalizing a primary tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AltVersionRef {
    pub tab_url: String,
    pub version: i64,
    pub rating: f64,
    pub tab_type: String,
}

impl AltVersionRef {
    /// Materialize the placeholder row this reference stands for.
    #[must_use]
    pub fn to_placeholder(&self, song_id: i64) -> TabVersion {
        TabVersion {
            tab_url: self.tab_url.clone(),
            song_id,
            tab_type: self.tab_type.clone(),
            version: self.version,
            rating: self.rating,
            tab: ALT_PLACEHOLDER.to_string(),
            ..TabVersion::default()
        }
    }
}
