/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Songs (remote-assigned identity)
CREATE TABLE IF NOT EXISTS songs (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    artist TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_songs_artist ON songs(artist);

-- Tab versions; tab = 'ALT' marks a sibling not yet fetched
CREATE TABLE IF NOT EXISTS tabs (
    tab_url TEXT PRIMARY KEY,
    song_id INTEGER NOT NULL REFERENCES songs(id),
    tab_type TEXT NOT NULL DEFAULT '',
    version INTEGER NOT NULL DEFAULT 0,
    rating REAL NOT NULL DEFAULT -1,
    capo INTEGER NOT NULL DEFAULT 0,
    tuning TEXT NOT NULL DEFAULT '{}',
    contributors TEXT NOT NULL DEFAULT '[]',
    tab TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tabs_song_id ON tabs(song_id);
"#;

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: MIGRATION_001,
}];
