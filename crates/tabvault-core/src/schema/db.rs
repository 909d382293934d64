use rusqlite::{Connection, OptionalExtension as _};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::model::{AltVersionRef, Song, TabDocument, TabVersion, VersionRef, ALT_PLACEHOLDER};

use super::encode::{decode_contributors, decode_tuning, encode_contributors, encode_tuning};
use super::migrations::MIGRATIONS;

/// How a refetch of an already cached tab treats `version` and `rating`.
///
/// Body, content type, contributors, tuning and capo are always refreshed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Keep the version and rating observed when the row was first written.
    #[default]
    PreserveObserved,
    /// Replace version and rating with the freshly fetched values.
    OverwriteAll,
}

/// Result of a single idempotent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A row was inserted or changed.
    Written,
    /// The key already existed and nothing changed.
    Unchanged,
    /// The record was not eligible for writing (no identity or no content).
    Skipped,
}

/// Row counts for status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub songs: u64,
    pub tabs: u64,
    pub placeholders: u64,
}

const TAB_COLUMNS: &str =
    "tab_url, song_id, tab_type, version, rating, capo, tuning, contributors, tab";

const INSERT_TAB: &str = "INSERT INTO tabs (
        tab_url, song_id, tab_type, version, rating, capo, tuning, contributors, tab,
        created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)";

const ON_CONFLICT_REFRESH: &str = "
    ON CONFLICT(tab_url) DO UPDATE SET
        tab = excluded.tab, tab_type = excluded.tab_type,
        contributors = excluded.contributors,
        tuning = excluded.tuning, capo = excluded.capo,
        updated_at = excluded.updated_at
    WHERE tabs.tab IS NOT excluded.tab
        OR tabs.tab_type IS NOT excluded.tab_type
        OR tabs.contributors IS NOT excluded.contributors
        OR tabs.tuning IS NOT excluded.tuning
        OR tabs.capo IS NOT excluded.capo";

const ON_CONFLICT_OVERWRITE: &str = "
    ON CONFLICT(tab_url) DO UPDATE SET
        tab = excluded.tab, tab_type = excluded.tab_type,
        contributors = excluded.contributors,
        tuning = excluded.tuning, capo = excluded.capo,
        version = excluded.version, rating = excluded.rating,
        updated_at = excluded.updated_at
    WHERE tabs.tab IS NOT excluded.tab
        OR tabs.tab_type IS NOT excluded.tab_type
        OR tabs.contributors IS NOT excluded.contributors
        OR tabs.tuning IS NOT excluded.tuning
        OR tabs.capo IS NOT excluded.capo
        OR tabs.version IS NOT excluded.version
        OR tabs.rating IS NOT excluded.rating";

const ON_CONFLICT_IGNORE: &str = " ON CONFLICT(tab_url) DO NOTHING";

/// A database connection implementing the tab cache read/write contract.
///
/// Every write is a single-statement upsert keyed on `songs.id` or
/// `tabs.tab_url`, so concurrent writers for the same key rely on SQLite's
/// conflict resolution rather than application locking.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

// Song writes and reads
impl Database {
    /// Create the song if it does not exist yet.
    ///
    /// An existing song's name and artist are never overwritten. Songs
    /// without a remote identity are skipped.
    pub fn upsert_song(&self, song: &Song) -> Result<UpsertOutcome> {
        if !song.has_identity() {
            return Ok(UpsertOutcome::Skipped);
        }

        let changed = self.conn.execute(
            "INSERT INTO songs (id, name, artist, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO NOTHING",
            rusqlite::params![song.id, song.name, song.artist, now()],
        )?;

        Ok(outcome(changed))
    }

    /// Get a song by its remote id.
    pub fn get_song(&self, id: i64) -> Result<Option<Song>> {
        let song = self
            .conn
            .query_row(
                "SELECT id, name, artist FROM songs WHERE id = ?1",
                [id],
                |row| {
                    Ok(Song {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        artist: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(song)
    }
}

// Tab writes and reads
impl Database {
    /// Insert a fetched tab, or refresh the cached row for its `tab_url`.
    ///
    /// Tabs without real content (empty body or the placeholder marker) are
    /// skipped. Re-running with identical input changes nothing.
    pub fn upsert_tab(&self, tab: &TabVersion, policy: RefreshPolicy) -> Result<UpsertOutcome> {
        if !tab.has_content() {
            return Ok(UpsertOutcome::Skipped);
        }

        let on_conflict = match policy {
            RefreshPolicy::PreserveObserved => ON_CONFLICT_REFRESH,
            RefreshPolicy::OverwriteAll => ON_CONFLICT_OVERWRITE,
        };
        self.write_tab(tab, on_conflict)
    }

    /// Record a sibling version as a placeholder row.
    ///
    /// Never touches an existing row for the same URL, whether it is still a
    /// placeholder or has since been fetched in full.
    pub fn insert_placeholder(&self, alt: &AltVersionRef, song_id: i64) -> Result<UpsertOutcome> {
        if alt.tab_url.is_empty() {
            return Ok(UpsertOutcome::Skipped);
        }
        self.write_tab(&alt.to_placeholder(song_id), ON_CONFLICT_IGNORE)
    }

    fn write_tab(&self, tab: &TabVersion, on_conflict: &str) -> Result<UpsertOutcome> {
        let sql = format!("{INSERT_TAB}{on_conflict}");
        let changed = self.conn.execute(
            &sql,
            rusqlite::params![
                tab.tab_url,
                tab.song_id,
                tab.tab_type,
                tab.version,
                tab.rating,
                i64::from(tab.capo),
                encode_tuning(&tab.tuning)?,
                encode_contributors(&tab.contributors)?,
                tab.tab,
                now(),
            ],
        )?;
        Ok(outcome(changed))
    }

    /// Get the raw row for a tab URL, placeholders included.
    pub fn get_tab(&self, tab_url: &str) -> Result<Option<TabVersion>> {
        let sql = format!("SELECT {TAB_COLUMNS} FROM tabs WHERE tab_url = ?1");
        let tab = self
            .conn
            .query_row(&sql, [tab_url], Self::row_to_tab)
            .optional()?;
        Ok(tab)
    }

    /// Every known version of a song, ordered by version number.
    pub fn list_song_versions(&self, song_id: i64) -> Result<Vec<VersionRef>> {
        let mut stmt = self.conn.prepare(
            "SELECT tab_url, version, rating FROM tabs
             WHERE song_id = ?1
             ORDER BY version, tab_url",
        )?;

        let versions = stmt
            .query_map([song_id], |row| {
                Ok(VersionRef {
                    tab_url: row.get(0)?,
                    version: row.get(1)?,
                    rating: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(versions)
    }

    /// Look up a resolvable document by tab URL.
    ///
    /// A placeholder row is reported as `None`, exactly like a missing row.
    pub fn lookup(&self, tab_url: &str) -> Result<Option<TabDocument>> {
        let Some(tab) = self.get_tab(tab_url)? else {
            return Ok(None);
        };
        if !tab.has_content() {
            log::debug!("Cached row for {tab_url} is a placeholder");
            return Ok(None);
        }

        let Some(song) = self.get_song(tab.song_id)? else {
            log::warn!("Cached tab {tab_url} references missing song {}", tab.song_id);
            return Ok(None);
        };

        let versions = self.list_song_versions(song.id)?;
        Ok(Some(TabDocument::assemble(&song, &tab, versions)))
    }

    /// URLs of every cached tab with real content.
    pub fn list_resolvable_tab_urls(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tab_url FROM tabs WHERE tab != ?1 ORDER BY tab_url")?;

        let urls = stmt
            .query_map([ALT_PLACEHOLDER], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(urls)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let songs: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))?;
        let (tabs, placeholders): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(tab = ?1), 0) FROM tabs",
            [ALT_PLACEHOLDER],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(CacheStats {
            songs: u64::try_from(songs).unwrap_or(0),
            tabs: u64::try_from(tabs).unwrap_or(0),
            placeholders: u64::try_from(placeholders).unwrap_or(0),
        })
    }

    fn row_to_tab(row: &rusqlite::Row) -> rusqlite::Result<TabVersion> {
        let capo: i64 = row.get(5)?;
        let tuning: String = row.get(6)?;
        let contributors: String = row.get(7)?;

        Ok(TabVersion {
            tab_url: row.get(0)?,
            song_id: row.get(1)?,
            tab_type: row.get(2)?,
            version: row.get(3)?,
            rating: row.get(4)?,
            capo: u32::try_from(capo).unwrap_or(0),
            tuning: decode_tuning(&tuning),
            contributors: decode_contributors(&contributors).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
            })?,
            tab: row.get(8)?,
        })
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

const fn outcome(changed: usize) -> UpsertOutcome {
    if changed == 0 {
        UpsertOutcome::Unchanged
    } else {
        UpsertOutcome::Written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tuning;

    fn song() -> Song {
        Song::new(100, "Wonderwall", "Oasis")
    }

    fn tab(url: &str, body: &str) -> TabVersion {
        TabVersion {
            tab_url: url.to_string(),
            song_id: 100,
            tab_type: "Chords".to_string(),
            version: 1,
            rating: 4.5,
            capo: 2,
            tuning: Tuning::new("Standard", "E A D G B E"),
            contributors: vec!["zoe".to_string(), "adam".to_string()],
            tab: body.to_string(),
        }
    }

    fn alt(url: &str, version: i64) -> AltVersionRef {
        AltVersionRef {
            tab_url: url.to_string(),
            version,
            rating: 3.0,
            tab_type: "Chords".to_string(),
        }
    }

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.upsert_song(&song()).unwrap();
        db
    }

    fn updated_at(db: &Database, url: &str) -> String {
        db.conn()
            .query_row("SELECT updated_at FROM tabs WHERE tab_url = ?1", [url], |row| {
                row.get(0)
            })
            .unwrap()
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.conn()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_database_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_song_upsert_does_not_overwrite() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.upsert_song(&song()).unwrap(), UpsertOutcome::Written);

        let renamed = Song::new(100, "Wonderwall (Live)", "Oasis");
        assert_eq!(db.upsert_song(&renamed).unwrap(), UpsertOutcome::Unchanged);

        let stored = db.get_song(100).unwrap().unwrap();
        assert_eq!(stored.name, "Wonderwall");
        assert_eq!(count(&db, "songs"), 1);
    }

    #[test]
    fn test_song_without_identity_is_skipped() {
        let db = Database::open_in_memory().unwrap();
        let outcome = db.upsert_song(&Song::new(0, "x", "y")).unwrap();
        assert_eq!(outcome, UpsertOutcome::Skipped);
        assert_eq!(count(&db, "songs"), 0);
    }

    #[test]
    fn test_tab_upsert_is_idempotent() {
        let db = seeded();
        let t = tab("oasis/wonderwall-chords-1", "Em G D A");

        assert_eq!(
            db.upsert_tab(&t, RefreshPolicy::PreserveObserved).unwrap(),
            UpsertOutcome::Written
        );
        let first_stamp = updated_at(&db, &t.tab_url);

        assert_eq!(
            db.upsert_tab(&t, RefreshPolicy::PreserveObserved).unwrap(),
            UpsertOutcome::Unchanged
        );
        assert_eq!(updated_at(&db, &t.tab_url), first_stamp);
        assert_eq!(count(&db, "tabs"), 1);
        assert_eq!(db.get_tab(&t.tab_url).unwrap().unwrap(), t);
    }

    #[test]
    fn test_tab_without_content_is_skipped() {
        let db = seeded();
        let empty = tab("oasis/wonderwall-chords-1", "");
        let placeholder = tab("oasis/wonderwall-chords-2", ALT_PLACEHOLDER);

        for t in [&empty, &placeholder] {
            assert_eq!(
                db.upsert_tab(t, RefreshPolicy::OverwriteAll).unwrap(),
                UpsertOutcome::Skipped
            );
        }
        assert_eq!(count(&db, "tabs"), 0);
    }

    #[test]
    fn test_refresh_preserves_version_and_rating() {
        let db = seeded();
        let original = tab("oasis/wonderwall-chords-1", "Em G D A");
        db.upsert_tab(&original, RefreshPolicy::PreserveObserved).unwrap();

        let mut fresher = original.clone();
        fresher.tab = "Em7 G Dsus4 A7sus4".to_string();
        fresher.capo = 0;
        fresher.contributors = vec!["new".to_string()];
        fresher.tuning = Tuning::default();
        fresher.version = 9;
        fresher.rating = 1.0;
        db.upsert_tab(&fresher, RefreshPolicy::PreserveObserved).unwrap();

        let stored = db.get_tab(&original.tab_url).unwrap().unwrap();
        assert_eq!(stored.tab, fresher.tab);
        assert_eq!(stored.capo, 0);
        assert_eq!(stored.contributors, vec!["new".to_string()]);
        assert!(stored.tuning.is_empty());
        assert_eq!(stored.version, 1);
        assert!((stored.rating - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_refresh_updates_content_type() {
        let db = seeded();
        let original = tab("oasis/wonderwall-chords-1", "Em G D A");
        db.upsert_tab(&original, RefreshPolicy::PreserveObserved).unwrap();

        let mut retyped = original.clone();
        for policy in [RefreshPolicy::PreserveObserved, RefreshPolicy::OverwriteAll] {
            retyped.tab_type = format!("Tabs {policy:?}");
            assert_eq!(db.upsert_tab(&retyped, policy).unwrap(), UpsertOutcome::Written);
            let stored = db.get_tab(&original.tab_url).unwrap().unwrap();
            assert_eq!(stored.tab_type, retyped.tab_type);
            assert_eq!(db.upsert_tab(&retyped, policy).unwrap(), UpsertOutcome::Unchanged);
        }
    }

    #[test]
    fn test_refresh_overwrite_all_replaces_version_and_rating() {
        let db = seeded();
        let original = tab("oasis/wonderwall-chords-1", "Em G D A");
        db.upsert_tab(&original, RefreshPolicy::OverwriteAll).unwrap();

        let mut fresher = original.clone();
        fresher.version = 3;
        fresher.rating = 4.9;
        assert_eq!(
            db.upsert_tab(&fresher, RefreshPolicy::OverwriteAll).unwrap(),
            UpsertOutcome::Written
        );

        let stored = db.get_tab(&original.tab_url).unwrap().unwrap();
        assert_eq!(stored.version, 3);
        assert!((stored.rating - 4.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_placeholder_is_noop_on_conflict() {
        let db = seeded();
        let placeholder = alt("oasis/wonderwall-chords-2", 2);
        assert_eq!(
            db.insert_placeholder(&placeholder, 100).unwrap(),
            UpsertOutcome::Written
        );

        let mut changed = placeholder.clone();
        changed.rating = 5.0;
        changed.version = 7;
        assert_eq!(
            db.insert_placeholder(&changed, 100).unwrap(),
            UpsertOutcome::Unchanged
        );

        let stored = db.get_tab(&placeholder.tab_url).unwrap().unwrap();
        assert!(stored.is_placeholder());
        assert_eq!(stored.version, 2);
        assert!((stored.rating - 3.0).abs() < f64::EPSILON);
        assert_eq!(stored.tuning, Tuning::default());
    }

    #[test]
    fn test_placeholder_never_demotes_fetched_tab() {
        let db = seeded();
        let full = tab("oasis/wonderwall-chords-1", "Em G D A");
        db.upsert_tab(&full, RefreshPolicy::PreserveObserved).unwrap();

        db.insert_placeholder(&alt(&full.tab_url, 1), 100).unwrap();

        let stored = db.get_tab(&full.tab_url).unwrap().unwrap();
        assert_eq!(stored.tab, "Em G D A");
    }

    #[test]
    fn test_full_fetch_promotes_placeholder() {
        let db = seeded();
        db.insert_placeholder(&alt("oasis/wonderwall-chords-2", 2), 100)
            .unwrap();

        let full = tab("oasis/wonderwall-chords-2", "C G Am F");
        db.upsert_tab(&full, RefreshPolicy::PreserveObserved).unwrap();

        assert!(db.lookup("oasis/wonderwall-chords-2").unwrap().is_some());
    }

    #[test]
    fn test_lookup_treats_placeholder_as_miss() {
        let db = seeded();
        db.insert_placeholder(&alt("oasis/wonderwall-chords-2", 2), 100)
            .unwrap();

        assert!(db.get_tab("oasis/wonderwall-chords-2").unwrap().is_some());
        assert!(db.lookup("oasis/wonderwall-chords-2").unwrap().is_none());
        assert!(db.lookup("never/seen").unwrap().is_none());
    }

    #[test]
    fn test_lookup_includes_sorted_siblings() {
        let db = seeded();
        db.upsert_tab(&tab("oasis/wonderwall-chords-1", "Em G D A"), RefreshPolicy::default())
            .unwrap();
        db.insert_placeholder(&alt("oasis/wonderwall-chords-3", 3), 100)
            .unwrap();
        db.insert_placeholder(&alt("oasis/wonderwall-chords-0", 0), 100)
            .unwrap();

        let doc = db.lookup("oasis/wonderwall-chords-1").unwrap().unwrap();
        assert_eq!(doc.song.name, "Wonderwall");
        assert_eq!(doc.tab, "Em G D A");
        assert_eq!(doc.contributors, vec!["zoe".to_string(), "adam".to_string()]);
        let versions: Vec<i64> = doc.song.versions.iter().map(|v| v.version).collect();
        assert_eq!(versions, vec![0, 1, 3]);
    }

    #[test]
    fn test_tab_requires_existing_song() {
        let db = Database::open_in_memory().unwrap();
        let result = db.upsert_tab(&tab("x/y-chords-1", "body"), RefreshPolicy::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_list_resolvable_excludes_placeholders() {
        let db = seeded();
        db.upsert_tab(&tab("oasis/wonderwall-chords-1", "Em G D A"), RefreshPolicy::default())
            .unwrap();
        db.insert_placeholder(&alt("oasis/wonderwall-chords-2", 2), 100)
            .unwrap();

        let urls = db.list_resolvable_tab_urls().unwrap();
        assert_eq!(urls, vec!["oasis/wonderwall-chords-1".to_string()]);
    }

    #[test]
    fn test_stats() {
        let db = seeded();
        assert_eq!(
            db.stats().unwrap(),
            CacheStats {
                songs: 1,
                tabs: 0,
                placeholders: 0
            }
        );

        db.upsert_tab(&tab("oasis/wonderwall-chords-1", "Em G D A"), RefreshPolicy::default())
            .unwrap();
        db.insert_placeholder(&alt("oasis/wonderwall-chords-2", 2), 100)
            .unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.tabs, 2);
        assert_eq!(stats.placeholders, 1);
    }

    #[test]
    fn test_reopen_does_not_reapply_migrations() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tabs.db");
        {
            let db = Database::open(&path).unwrap();
            db.upsert_song(&song()).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_song(100).unwrap().unwrap().artist, "Oasis");
    }
}
