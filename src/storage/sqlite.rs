//! `SQLite` store implementation.
//!
//! Single-file embedded database with WAL journaling, exclusive
//! transactions per file replacement, and a generation counter in the
//! `meta` table.

// SQLite stores all integers as i64. These casts are intentional and safe
// because we only store non-negative values that fit in usize.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use crate::core::{Chunk, ChunkKind, Source};
use crate::error::{Error, Result};
use crate::storage::schema::{
    CHECK_SCHEMA_SQL, CURRENT_SCHEMA_VERSION, GET_VERSION_SQL, SCHEMA_SQL, SET_VERSION_SQL,
};
use crate::storage::traits::{
    CacheEntry, CacheMeta, CacheStats, ChunkFilter, HistoryEntry, IndexStats, QueryRecord, Store,
};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// SQLite-backed [`Store`].
///
/// # Examples
///
/// ```no_run
/// use contextkit::storage::{SqliteStore, Store};
///
/// let mut store = SqliteStore::open(".contextkit/index.db").unwrap();
/// store.init().unwrap();
/// ```
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    /// Path to the database file (None for in-memory).
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens or creates the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Database`] if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::Database(e.to_string()))?;
        }

        let conn = Connection::open(&path)?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        // WAL keeps the store readable while an index run writes.
        let _: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;

        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Creates an in-memory store, for tests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Database`] if the connection cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        Ok(Self { conn, path: None })
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn get_schema_version(&self) -> Result<Option<u32>> {
        let version: Option<String> = self
            .conn
            .query_row(GET_VERSION_SQL, [], |row| row.get(0))
            .optional()?;
        Ok(version.and_then(|v| v.parse().ok()))
    }

    fn set_schema_version(&self, version: u32) -> Result<()> {
        self.conn
            .execute(SET_VERSION_SQL, params![version.to_string()])?;
        Ok(())
    }

    fn meta_get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = ?", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn meta_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Bumps the generation counter inside `tx`.
    fn bump_generation(tx: &Transaction<'_>) -> Result<()> {
        tx.execute(
            r"
            INSERT INTO meta (key, value) VALUES ('generation', '1')
            ON CONFLICT(key) DO UPDATE SET value = CAST(CAST(value AS INTEGER) + 1 AS TEXT)
            ",
            [],
        )?;
        Ok(())
    }

    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    fn row_to_source(row: &Row<'_>) -> rusqlite::Result<(Source, String, String)> {
        let id: String = row.get(0)?;
        let root: String = row.get(1)?;
        let include: String = row.get(2)?;
        let exclude: String = row.get(3)?;
        let indexed_at: Option<i64> = row.get(4)?;
        Ok((
            Source {
                id,
                root: PathBuf::from(root),
                include: Vec::new(),
                exclude: Vec::new(),
                indexed_at,
            },
            include,
            exclude,
        ))
    }

    fn finish_source((mut source, include, exclude): (Source, String, String)) -> Result<Source> {
        source.include = serde_json::from_str(&include)?;
        source.exclude = serde_json::from_str(&exclude)?;
        Ok(source)
    }

    fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<Chunk> {
        let kind: String = row.get(7)?;
        let embedding: Option<Vec<u8>> = row.get(10)?;
        Ok(Chunk {
            id: row.get(0)?,
            source_id: row.get(1)?,
            file_path: row.get(2)?,
            content: row.get(3)?,
            start_line: row.get::<_, i64>(4)? as usize,
            end_line: row.get::<_, i64>(5)? as usize,
            tokens: row.get::<_, i64>(6)? as usize,
            kind: ChunkKind::parse(&kind),
            unit_name: row.get(8)?,
            exported: row.get::<_, i64>(9)? != 0,
            embedding: embedding.map(|blob| blob_to_vec(&blob)),
        })
    }

    fn row_to_history(row: &Row<'_>) -> rusqlite::Result<(HistoryEntry, String)> {
        let sources_json: String = row.get(5)?;
        Ok((
            HistoryEntry {
                id: row.get(0)?,
                record: QueryRecord {
                    query: row.get(1)?,
                    budget: row.get::<_, i64>(2)? as usize,
                    mode: row.get(3)?,
                    format: row.get(4)?,
                    sources: Vec::new(),
                    chunk_count: row.get::<_, i64>(6)? as usize,
                    total_tokens: row.get::<_, i64>(7)? as usize,
                    duration_ms: row.get::<_, i64>(8)? as u64,
                    created_at: row.get(9)?,
                },
            },
            sources_json,
        ))
    }

    fn finish_history((mut entry, sources_json): (HistoryEntry, String)) -> Result<HistoryEntry> {
        entry.record.sources = serde_json::from_str(&sources_json)?;
        Ok(entry)
    }
}

/// Chunk columns in select order, matching [`SqliteStore::row_to_chunk`].
const CHUNK_COLUMNS: &str = "id, source_id, file_path, content, start_line, end_line, tokens, \
     kind, unit_name, exported, embedding";

/// Serializes an f32 vector as little-endian bytes.
#[must_use]
pub fn vec_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Deserializes little-endian bytes back into an f32 vector.
#[must_use]
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

impl Store for SqliteStore {
    fn init(&mut self) -> Result<()> {
        let is_init: i64 = self.conn.query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))?;

        if is_init == 0 {
            self.conn.execute_batch(SCHEMA_SQL)?;
            self.set_schema_version(CURRENT_SCHEMA_VERSION)?;
        } else if let Some(current) = self.get_schema_version()?
            && current < CURRENT_SCHEMA_VERSION
        {
            for migration in crate::storage::schema::get_migrations_from(current) {
                self.conn
                    .execute_batch(migration.sql)
                    .map_err(|e| Error::Database(format!("migration: {e}")))?;
            }
            self.set_schema_version(CURRENT_SCHEMA_VERSION)?;
        }

        Ok(())
    }

    fn is_initialized(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))?;
        Ok(count > 0)
    }

    fn generation(&self) -> Result<i64> {
        Ok(self
            .meta_get("generation")?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0))
    }

    fn token_model(&self) -> Result<Option<String>> {
        self.meta_get("token_model")
    }

    fn set_token_model(&mut self, fingerprint: &str) -> Result<()> {
        self.meta_set("token_model", fingerprint)
    }

    // ==================== Sources ====================

    fn upsert_source(&mut self, source: &Source) -> Result<()> {
        let include = serde_json::to_string(&source.include)?;
        let exclude = serde_json::to_string(&source.exclude)?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            r"
            INSERT INTO sources (id, root, include, exclude, indexed_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                root = excluded.root,
                include = excluded.include,
                exclude = excluded.exclude
            ",
            params![
                source.id,
                source.root.to_string_lossy(),
                include,
                exclude,
                source.indexed_at,
            ],
        )?;
        Self::bump_generation(&tx)?;
        tx.commit()?;
        Ok(())
    }

    fn get_source(&self, id: &str) -> Result<Option<Source>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, root, include, exclude, indexed_at FROM sources WHERE id = ?",
                params![id],
                Self::row_to_source,
            )
            .optional()?;
        row.map(Self::finish_source).transpose()
    }

    fn list_sources(&self) -> Result<Vec<Source>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, root, include, exclude, indexed_at FROM sources ORDER BY id")?;
        let rows = stmt.query_map([], Self::row_to_source)?;
        let mut sources = Vec::new();
        for row in rows {
            sources.push(Self::finish_source(row?)?);
        }
        Ok(sources)
    }

    fn remove_source(&mut self, id: &str) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Exclusive)?;
        tx.execute("DELETE FROM chunks WHERE source_id = ?", params![id])?;
        let removed = tx.execute("DELETE FROM sources WHERE id = ?", params![id])?;
        if removed == 0 {
            return Err(Error::SourceNotFound {
                name: id.to_string(),
            });
        }
        Self::bump_generation(&tx)?;
        tx.commit()?;
        Ok(())
    }

    fn touch_source(&mut self, id: &str, indexed_at: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE sources SET indexed_at = ? WHERE id = ?",
            params![indexed_at, id],
        )?;
        Ok(())
    }

    // ==================== Files & chunks ====================

    fn file_hashes(&self, source_id: &str) -> Result<BTreeMap<String, String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT relative_path, content_hash FROM files WHERE source_id = ?")?;
        let rows = stmt.query_map(params![source_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut hashes = BTreeMap::new();
        for row in rows {
            let (path, hash) = row?;
            hashes.insert(path, hash);
        }
        Ok(hashes)
    }

    fn replace_file_chunks(
        &mut self,
        source_id: &str,
        relative_path: &str,
        content_hash: &str,
        chunks: &[Chunk],
    ) -> Result<()> {
        let now = Self::now();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Exclusive)?;

        tx.execute(
            "DELETE FROM chunks WHERE source_id = ? AND file_path = ?",
            params![source_id, relative_path],
        )?;
        tx.execute(
            r"
            INSERT INTO files (source_id, relative_path, content_hash, indexed_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(source_id, relative_path) DO UPDATE SET
                content_hash = excluded.content_hash,
                indexed_at = excluded.indexed_at
            ",
            params![source_id, relative_path, content_hash, now],
        )?;

        {
            let mut stmt = tx.prepare(
                r"
                INSERT OR REPLACE INTO chunks (
                    id, source_id, file_path, content, start_line, end_line,
                    tokens, kind, unit_name, exported,
                    embedding, embedding_dims, embedding_model, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, NULL, ?)
                ",
            )?;
            for chunk in chunks {
                stmt.execute(params![
                    chunk.id,
                    chunk.source_id,
                    chunk.file_path,
                    chunk.content,
                    chunk.start_line as i64,
                    chunk.end_line as i64,
                    chunk.tokens as i64,
                    chunk.kind.as_str(),
                    chunk.unit_name,
                    i64::from(chunk.exported),
                    now,
                ])?;
            }
        }

        Self::bump_generation(&tx)?;
        tx.commit()?;
        Ok(())
    }

    fn set_embeddings(&mut self, updates: &[(String, Vec<f32>)], model: &str) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Exclusive)?;
        {
            let mut stmt = tx.prepare(
                r"
                UPDATE chunks
                SET embedding = ?, embedding_dims = ?, embedding_model = ?
                WHERE id = ?
                ",
            )?;
            for (chunk_id, vector) in updates {
                stmt.execute(params![
                    vec_to_blob(vector),
                    vector.len() as i64,
                    model,
                    chunk_id,
                ])?;
            }
        }
        Self::bump_generation(&tx)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_file(&mut self, source_id: &str, relative_path: &str) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Exclusive)?;
        tx.execute(
            "DELETE FROM chunks WHERE source_id = ? AND file_path = ?",
            params![source_id, relative_path],
        )?;
        tx.execute(
            "DELETE FROM files WHERE source_id = ? AND relative_path = ?",
            params![source_id, relative_path],
        )?;
        Self::bump_generation(&tx)?;
        tx.commit()?;
        Ok(())
    }

    fn list_chunks(&self, filter: &ChunkFilter) -> Result<Vec<Chunk>> {
        let mut sql = format!("SELECT {CHUNK_COLUMNS} FROM chunks");
        let mut clauses = Vec::new();
        let mut args: Vec<String> = Vec::new();
        if let Some(source_id) = &filter.source_id {
            clauses.push("source_id = ?");
            args.push(source_id.clone());
        }
        if let Some(file_path) = &filter.file_path {
            clauses.push("file_path = ?");
            args.push(file_path.clone());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY source_id, file_path, start_line");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), Self::row_to_chunk)?;
        let mut chunks = Vec::new();
        for row in rows {
            chunks.push(row?);
        }
        Ok(chunks)
    }

    fn chunks_with_embeddings(&self, sources: Option<&[String]>) -> Result<Vec<Chunk>> {
        let mut sql = format!("SELECT {CHUNK_COLUMNS} FROM chunks WHERE embedding IS NOT NULL");
        let args: Vec<String> = match sources {
            Some(ids) if !ids.is_empty() => {
                let placeholders = vec!["?"; ids.len()].join(", ");
                sql.push_str(&format!(" AND source_id IN ({placeholders})"));
                ids.to_vec()
            }
            _ => Vec::new(),
        };
        sql.push_str(" ORDER BY source_id, file_path, start_line");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), Self::row_to_chunk)?;
        let mut chunks = Vec::new();
        for row in rows {
            chunks.push(row?);
        }
        Ok(chunks)
    }

    fn index_stats(&self) -> Result<IndexStats> {
        let source_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sources", [], |row| row.get(0))?;
        let file_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        let (chunk_count, embedded_count, total_tokens): (i64, i64, i64) = self.conn.query_row(
            r"
            SELECT COUNT(*),
                   COUNT(embedding),
                   COALESCE(SUM(tokens), 0)
            FROM chunks
            ",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let db_size = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len());

        Ok(IndexStats {
            source_count: source_count as usize,
            file_count: file_count as usize,
            chunk_count: chunk_count as usize,
            embedded_count: embedded_count as usize,
            total_tokens: total_tokens as usize,
            db_size,
        })
    }

    // ==================== Query cache ====================

    fn cache_get(&mut self, fingerprint: &str) -> Result<Option<CacheEntry>> {
        let row = self
            .conn
            .query_row(
                "SELECT output, meta, created_at, hits FROM query_cache WHERE fingerprint = ?",
                params![fingerprint],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((output, meta_json, created_at, hits)) = row else {
            return Ok(None);
        };
        self.conn.execute(
            "UPDATE query_cache SET hits = hits + 1 WHERE fingerprint = ?",
            params![fingerprint],
        )?;
        let meta: CacheMeta = serde_json::from_str(&meta_json)?;
        Ok(Some(CacheEntry {
            fingerprint: fingerprint.to_string(),
            output,
            meta,
            created_at,
            hits: hits + 1,
        }))
    }

    fn cache_put(&mut self, entry: &CacheEntry) -> Result<()> {
        let meta = serde_json::to_string(&entry.meta)?;
        self.conn.execute(
            r"
            INSERT OR REPLACE INTO query_cache (fingerprint, output, meta, created_at, hits)
            VALUES (?, ?, ?, ?, ?)
            ",
            params![
                entry.fingerprint,
                entry.output,
                meta,
                entry.created_at,
                entry.hits
            ],
        )?;
        Ok(())
    }

    fn cache_clear(&mut self) -> Result<()> {
        self.conn.execute("DELETE FROM query_cache", [])?;
        Ok(())
    }

    fn cache_stats(&self) -> Result<CacheStats> {
        let (entries, total_hits): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(hits), 0) FROM query_cache",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(CacheStats {
            entries: entries as usize,
            total_hits,
        })
    }

    // ==================== Query history ====================

    fn record_query(&mut self, record: &QueryRecord) -> Result<i64> {
        let sources = serde_json::to_string(&record.sources)?;
        self.conn.execute(
            r"
            INSERT INTO query_history (
                query, budget, mode, format, sources,
                chunk_count, total_tokens, duration_ms, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                record.query,
                record.budget as i64,
                record.mode,
                record.format,
                sources,
                record.chunk_count as i64,
                record.total_tokens as i64,
                record.duration_ms as i64,
                record.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, query, budget, mode, format, sources,
                   chunk_count, total_tokens, duration_ms, created_at
            FROM query_history ORDER BY id DESC LIMIT ?
            ",
        )?;
        let rows = stmt.query_map(params![limit as i64], Self::row_to_history)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(Self::finish_history(row?)?);
        }
        Ok(entries)
    }

    fn get_history_entry(&self, id: i64) -> Result<Option<HistoryEntry>> {
        let row = self
            .conn
            .query_row(
                r"
                SELECT id, query, budget, mode, format, sources,
                       chunk_count, total_tokens, duration_ms, created_at
                FROM query_history WHERE id = ?
                ",
                params![id],
                Self::row_to_history,
            )
            .optional()?;
        row.map(Self::finish_history).transpose()
    }

    fn clear_history(&mut self) -> Result<()> {
        self.conn.execute("DELETE FROM query_history", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chunk_id;

    fn test_store() -> SqliteStore {
        let mut store = SqliteStore::in_memory().unwrap();
        store.init().unwrap();
        store
    }

    fn test_chunk(source_id: &str, file_path: &str, start: usize, content: &str) -> Chunk {
        Chunk::new(
            source_id,
            file_path,
            content.to_string(),
            start,
            start,
            3,
            ChunkKind::TokenBlock,
        )
    }

    fn test_source(id: &str) -> Source {
        Source::new(id, PathBuf::from("/tmp/project"))
    }

    #[test]
    fn test_init_idempotent() {
        let mut store = test_store();
        store.init().unwrap();
        assert!(store.is_initialized().unwrap());
    }

    #[test]
    fn test_generation_starts_at_zero() {
        let store = test_store();
        assert_eq!(store.generation().unwrap(), 0);
    }

    #[test]
    fn test_source_roundtrip() {
        let mut store = test_store();
        let source = test_source("app")
            .with_include(vec!["**/*.ts".to_string()])
            .with_exclude(vec!["**/*.test.ts".to_string()]);
        store.upsert_source(&source).unwrap();

        let loaded = store.get_source("app").unwrap().unwrap();
        assert_eq!(loaded.include, source.include);
        assert_eq!(loaded.exclude, source.exclude);
        assert!(store.get_source("missing").unwrap().is_none());
        assert_eq!(store.list_sources().unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_source_bumps_generation() {
        let mut store = test_store();
        store.upsert_source(&test_source("app")).unwrap();
        assert_eq!(store.generation().unwrap(), 1);
        store.upsert_source(&test_source("app")).unwrap();
        assert_eq!(store.generation().unwrap(), 2);
    }

    #[test]
    fn test_remove_source_unknown() {
        let mut store = test_store();
        let err = store.remove_source("nope").unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { .. }));
    }

    #[test]
    fn test_replace_file_chunks_and_list() {
        let mut store = test_store();
        store.upsert_source(&test_source("app")).unwrap();
        let chunks = vec![
            test_chunk("app", "a.ts", 1, "line one"),
            test_chunk("app", "a.ts", 2, "line two"),
        ];
        store
            .replace_file_chunks("app", "a.ts", "hash1", &chunks)
            .unwrap();

        let listed = store.list_chunks(&ChunkFilter::default()).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].start_line, 1);
        assert_eq!(listed[1].start_line, 2);

        let hashes = store.file_hashes("app").unwrap();
        assert_eq!(hashes.get("a.ts").map(String::as_str), Some("hash1"));
    }

    #[test]
    fn test_replace_is_transactional_swap() {
        let mut store = test_store();
        store.upsert_source(&test_source("app")).unwrap();
        store
            .replace_file_chunks("app", "a.ts", "h1", &[test_chunk("app", "a.ts", 1, "old")])
            .unwrap();
        store
            .replace_file_chunks(
                "app",
                "a.ts",
                "h2",
                &[
                    test_chunk("app", "a.ts", 1, "new one"),
                    test_chunk("app", "a.ts", 2, "new two"),
                ],
            )
            .unwrap();

        let listed = store.list_chunks(&ChunkFilter::default()).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|c| c.content.starts_with("new")));
        let hashes = store.file_hashes("app").unwrap();
        assert_eq!(hashes.get("a.ts").map(String::as_str), Some("h2"));
    }

    #[test]
    fn test_delete_file_removes_chunks() {
        let mut store = test_store();
        store.upsert_source(&test_source("app")).unwrap();
        store
            .replace_file_chunks("app", "a.ts", "h1", &[test_chunk("app", "a.ts", 1, "x")])
            .unwrap();
        store.delete_file("app", "a.ts").unwrap();

        assert!(store.list_chunks(&ChunkFilter::default()).unwrap().is_empty());
        assert!(store.file_hashes("app").unwrap().is_empty());
    }

    #[test]
    fn test_embedding_roundtrip() {
        let mut store = test_store();
        store.upsert_source(&test_source("app")).unwrap();
        let chunk = test_chunk("app", "a.ts", 1, "content");
        let id = chunk.id.clone();
        store
            .replace_file_chunks("app", "a.ts", "h1", &[chunk])
            .unwrap();

        assert!(store.chunks_with_embeddings(None).unwrap().is_empty());

        let vector = vec![0.6f32, 0.8, 0.0];
        store
            .set_embeddings(&[(id, vector.clone())], "hash-v1")
            .unwrap();

        let embedded = store.chunks_with_embeddings(None).unwrap();
        assert_eq!(embedded.len(), 1);
        assert_eq!(embedded[0].embedding.as_deref(), Some(vector.as_slice()));
    }

    #[test]
    fn test_chunks_with_embeddings_source_filter() {
        let mut store = test_store();
        store.upsert_source(&test_source("app")).unwrap();
        store.upsert_source(&test_source("lib")).unwrap();
        for (source, path) in [("app", "a.ts"), ("lib", "b.ts")] {
            let chunk = test_chunk(source, path, 1, "content here");
            let id = chunk.id.clone();
            store
                .replace_file_chunks(source, path, "h", &[chunk])
                .unwrap();
            store
                .set_embeddings(&[(id, vec![1.0, 0.0])], "hash-v1")
                .unwrap();
        }

        let all = store.chunks_with_embeddings(None).unwrap();
        assert_eq!(all.len(), 2);
        let filtered = store
            .chunks_with_embeddings(Some(&["lib".to_string()]))
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].source_id, "lib");
    }

    #[test]
    fn test_index_stats() {
        let mut store = test_store();
        store.upsert_source(&test_source("app")).unwrap();
        store
            .replace_file_chunks(
                "app",
                "a.ts",
                "h1",
                &[
                    test_chunk("app", "a.ts", 1, "one"),
                    test_chunk("app", "a.ts", 2, "two"),
                ],
            )
            .unwrap();

        let stats = store.index_stats().unwrap();
        assert_eq!(stats.source_count, 1);
        assert_eq!(stats.file_count, 1);
        assert_eq!(stats.chunk_count, 2);
        assert_eq!(stats.embedded_count, 0);
        assert_eq!(stats.total_tokens, 6);
    }

    #[test]
    fn test_cache_roundtrip_and_hits() {
        let mut store = test_store();
        let entry = CacheEntry {
            fingerprint: "fp1".to_string(),
            output: "## a.ts (lines 1-3)".to_string(),
            meta: CacheMeta {
                query: "auth".to_string(),
                format: "markdown".to_string(),
                total_tokens: 42,
                chunk_count: 1,
            },
            created_at: 1000,
            hits: 0,
        };
        store.cache_put(&entry).unwrap();

        let first = store.cache_get("fp1").unwrap().unwrap();
        assert_eq!(first.output, entry.output);
        assert_eq!(first.hits, 1);
        let second = store.cache_get("fp1").unwrap().unwrap();
        assert_eq!(second.hits, 2);

        assert!(store.cache_get("other").unwrap().is_none());

        let stats = store.cache_stats().unwrap();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.total_hits, 2);

        store.cache_clear().unwrap();
        assert!(store.cache_get("fp1").unwrap().is_none());
    }

    #[test]
    fn test_cache_writes_do_not_bump_generation() {
        let mut store = test_store();
        let before = store.generation().unwrap();
        store
            .cache_put(&CacheEntry {
                fingerprint: "fp".to_string(),
                output: "out".to_string(),
                meta: CacheMeta {
                    query: "q".to_string(),
                    format: "markdown".to_string(),
                    total_tokens: 0,
                    chunk_count: 0,
                },
                created_at: 0,
                hits: 0,
            })
            .unwrap();
        assert_eq!(store.generation().unwrap(), before);
    }

    #[test]
    fn test_history() {
        let mut store = test_store();
        let record = QueryRecord {
            query: "find auth".to_string(),
            budget: 4000,
            mode: "full".to_string(),
            format: "markdown".to_string(),
            sources: vec!["app".to_string()],
            chunk_count: 3,
            total_tokens: 900,
            duration_ms: 12,
            created_at: 1000,
        };
        let id = store.record_query(&record).unwrap();
        assert!(id > 0);
        store.record_query(&record).unwrap();

        let history = store.get_history(10).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].id > history[1].id, "newest first");

        let entry = store.get_history_entry(id).unwrap().unwrap();
        assert_eq!(entry.record.query, "find auth");
        assert_eq!(entry.record.sources, vec!["app".to_string()]);

        store.clear_history().unwrap();
        assert!(store.get_history(10).unwrap().is_empty());
    }

    #[test]
    fn test_blob_roundtrip() {
        let vector = vec![1.5f32, -0.25, 0.0, 3.75];
        assert_eq!(blob_to_vec(&vec_to_blob(&vector)), vector);
    }

    #[test]
    fn test_chunk_ids_survive_storage() {
        let mut store = test_store();
        store.upsert_source(&test_source("app")).unwrap();
        let chunk = test_chunk("app", "a.ts", 1, "stable content");
        let expected = chunk_id("app", "a.ts", 1, "stable content");
        assert_eq!(chunk.id, expected);
        store
            .replace_file_chunks("app", "a.ts", "h", &[chunk])
            .unwrap();
        let listed = store.list_chunks(&ChunkFilter::default()).unwrap();
        assert_eq!(listed[0].id, expected);
    }
}
