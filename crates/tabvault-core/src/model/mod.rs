pub mod document;
pub mod recents;
pub mod song;
pub mod tab;

pub use document::{SongSummary, TabDocument, TabLink, VersionRef};
pub use recents::RecentTabs;
pub use song::Song;
pub use tab::{AltVersionRef, TabVersion, Tuning, ALT_PLACEHOLDER, UNRATED};
