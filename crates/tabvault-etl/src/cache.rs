//! Failure-tolerant access to the tab cache.
//!
//! Reads that fail are logged and treated as misses. Writes are a sequence
//! of independent idempotent upserts; each failure is logged and swallowed,
//! so a partial write leaves at most some placeholders missing until the
//! next visit.

use std::path::{Path, PathBuf};

use tabvault_core::model::{AltVersionRef, Song, TabDocument, TabVersion};
use tabvault_core::schema::{Database, RefreshPolicy, UpsertOutcome};

/// What a single cache write achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheWriteReport {
    /// Outcome of the song upsert; `None` if it failed.
    pub song: Option<UpsertOutcome>,
    /// Outcome of the tab upsert; `None` if it failed.
    pub tab: Option<UpsertOutcome>,
    pub placeholders_attempted: usize,
    pub placeholders_written: usize,
    pub failures: usize,
}

impl CacheWriteReport {
    pub const fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

/// The SQLite tab cache at a fixed path.
///
/// Each operation opens its own connection, so a `TabCache` can be cloned
/// into background tasks freely.
#[derive(Debug, Clone)]
pub struct TabCache {
    db_path: PathBuf,
    policy: RefreshPolicy,
}

impl TabCache {
    pub fn new(db_path: impl Into<PathBuf>, policy: RefreshPolicy) -> Self {
        Self {
            db_path: db_path.into(),
            policy,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Look up a resolvable document; placeholders and read errors are misses.
    pub fn lookup(&self, tab_url: &str) -> Option<TabDocument> {
        match Database::open(&self.db_path).and_then(|db| db.lookup(tab_url)) {
            Ok(found) => found,
            Err(e) => {
                log::warn!("Cache read failed for {tab_url}: {e}");
                None
            }
        }
    }

    /// Write a normalized tab through to the cache.
    ///
    /// Song first (tabs reference it), then the tab, then one placeholder
    /// per sibling. Siblings are only recorded alongside a tab with real
    /// content. Never fails; see the returned report.
    pub fn persist(&self, song: &Song, tab: &TabVersion, alts: &[AltVersionRef]) -> CacheWriteReport {
        let mut report = CacheWriteReport::default();

        let db = match Database::open(&self.db_path) {
            Ok(db) => db,
            Err(e) => {
                log::warn!("Cache write for {} skipped, cannot open cache: {e}", tab.tab_url);
                report.failures += 1;
                return report;
            }
        };

        report.song = match db.upsert_song(song) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                log::warn!("Song upsert failed for {} ({}): {e}", song.id, song.name);
                report.failures += 1;
                None
            }
        };

        report.tab = match db.upsert_tab(tab, self.policy) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                log::warn!("Tab upsert failed for {}: {e}", tab.tab_url);
                report.failures += 1;
                None
            }
        };

        if song.has_identity() && tab.has_content() {
            for alt in alts {
                report.placeholders_attempted += 1;
                match db.insert_placeholder(alt, song.id) {
                    Ok(UpsertOutcome::Written) => report.placeholders_written += 1,
                    Ok(_) => {}
                    Err(e) => {
                        log::warn!("Placeholder insert failed for {}: {e}", alt.tab_url);
                        report.failures += 1;
                    }
                }
            }
        }

        log::debug!(
            "Cached {}: song {:?}, tab {:?}, {}/{} placeholders new, {} failures",
            tab.tab_url,
            report.song,
            report.tab,
            report.placeholders_written,
            report.placeholders_attempted,
            report.failures
        );

        report
    }
}
