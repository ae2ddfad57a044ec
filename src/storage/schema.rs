//! Database schema definitions.
//!
//! Contains the SQL schema and migration scaffolding for the ContextKit
//! `SQLite` database.

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// SQL schema for initial database setup.
pub const SCHEMA_SQL: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_info (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Index-wide metadata: generation counter, token/embedder fingerprints
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Registered source roots
CREATE TABLE IF NOT EXISTS sources (
    id TEXT PRIMARY KEY,
    root TEXT NOT NULL,
    include TEXT NOT NULL DEFAULT '[]',  -- JSON array of globs
    exclude TEXT NOT NULL DEFAULT '[]',  -- JSON array of globs
    indexed_at INTEGER
);

-- Indexed files, one row per (source, relative path)
CREATE TABLE IF NOT EXISTS files (
    source_id TEXT NOT NULL,
    relative_path TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    indexed_at INTEGER NOT NULL,
    PRIMARY KEY (source_id, relative_path),
    FOREIGN KEY (source_id) REFERENCES sources(id) ON DELETE CASCADE
);

-- Retrieval units, replaced transactionally per file
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL,
    file_path TEXT NOT NULL,
    content TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    tokens INTEGER NOT NULL,
    kind TEXT NOT NULL,
    unit_name TEXT,
    exported INTEGER NOT NULL DEFAULT 0,
    embedding BLOB,            -- f32 array, little-endian, L2-normalized
    embedding_dims INTEGER,
    embedding_model TEXT,
    created_at INTEGER NOT NULL,
    FOREIGN KEY (source_id, file_path)
        REFERENCES files(source_id, relative_path) ON DELETE CASCADE
);

-- Index for per-file chunk replacement and ordering
CREATE INDEX IF NOT EXISTS idx_chunks_file ON chunks(source_id, file_path, start_line);

-- Cached selection outputs keyed by query fingerprint
CREATE TABLE IF NOT EXISTS query_cache (
    fingerprint TEXT PRIMARY KEY,
    output TEXT NOT NULL,
    meta TEXT NOT NULL,        -- JSON CacheMeta
    created_at INTEGER NOT NULL,
    hits INTEGER NOT NULL DEFAULT 0
);

-- Append-only log of executed queries
CREATE TABLE IF NOT EXISTS query_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query TEXT NOT NULL,
    budget INTEGER NOT NULL,
    mode TEXT NOT NULL,
    format TEXT NOT NULL,
    sources TEXT NOT NULL DEFAULT '[]',  -- JSON array of source ids
    chunk_count INTEGER NOT NULL,
    total_tokens INTEGER NOT NULL,
    duration_ms INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);
";

/// SQL to check if the schema is initialized.
pub const CHECK_SCHEMA_SQL: &str = r"
SELECT COUNT(*) FROM sqlite_master
WHERE type='table' AND name='schema_info';
";

/// SQL to get the schema version.
pub const GET_VERSION_SQL: &str = r"
SELECT value FROM schema_info WHERE key = 'version';
";

/// SQL to set the schema version.
pub const SET_VERSION_SQL: &str = r"
INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?);
";

/// A migration from one schema version to the next.
pub struct Migration {
    /// Version this migration upgrades from.
    pub from_version: u32,
    /// Version this migration upgrades to.
    pub to_version: u32,
    /// SQL statements to execute.
    pub sql: &'static str,
}

/// Available migrations. Empty at schema v1.
pub const MIGRATIONS: &[Migration] = &[];

/// Gets the migrations needed to upgrade from a version.
#[must_use]
pub fn get_migrations_from(current_version: u32) -> Vec<&'static Migration> {
    MIGRATIONS
        .iter()
        .filter(|m| m.from_version >= current_version && m.to_version <= CURRENT_SCHEMA_VERSION)
        .collect()
}
