use serde::{Deserialize, Serialize};

/// A song as identified by the remote site.
///
/// The `id` is assigned remotely. Zero means the payload carried no usable
/// identity (unsupported content type or an unparsed page), and such a song
/// is never written to the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub name: String,
    pub artist: String,
}

impl Song {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            artist: artist.into(),
        }
    }

    /// Whether the song carries a remote-assigned identity.
    pub const fn has_identity(&self) -> bool {
        self.id != 0
    }
}
