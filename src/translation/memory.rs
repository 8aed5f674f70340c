/*!
 * Translation memory.
 *
 * Accepted translation results are stored in SQLite, keyed by a SHA-256 digest
 * of the normalised source text, the language pair, the domain and the
 * glossary entries that matched. Editing a matched glossary term therefore
 * changes the key and bypasses stale results.
 *
 * All database work runs on the blocking pool via `spawn_blocking`.
 */

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};

use crate::app_config::MemoryConfig;

use super::result::{MatchSpan, TranslationResult};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Lookup key of a translation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryKey(String);

impl MemoryKey {
    /// Derive the key for a request and the glossary matches found in it.
    pub fn new(text: &str, source_lang: &str, target_lang: &str, domain: Option<&str>, spans: &[MatchSpan]) -> Self {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let source = source_lang.trim().to_lowercase();
        let target = target_lang.trim().to_lowercase();
        let mut hasher = Sha256::new();
        for part in [normalized.as_str(), source.as_str(), target.as_str(), domain.unwrap_or("")] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        for span in spans {
            let entry = &span.resolved_entry;
            hasher.update(entry.source_term.to_lowercase().as_bytes());
            hasher.update([0x1f]);
            hasher.update(entry.context.as_bytes());
            hasher.update([0x1f]);
            hasher.update(entry.target_term.as_bytes());
            hasher.update([0u8]);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Memory statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub entries: i64,
    pub hits: i64,
}

/// SQLite-backed store of accepted translation results
#[derive(Debug, Clone)]
pub struct TranslationMemory {
    /// Path to the database file
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl TranslationMemory {
    /// Open (or create) a memory database file
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create memory directory: {:?}", parent))?;
        }

        info!("Opening translation memory at: {:?}", db_path);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open translation memory: {:?}", db_path))?;
        initialize_schema(&conn)?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        debug!("Creating in-memory translation memory");
        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        initialize_schema(&conn)?;
        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open the memory described by configuration, if enabled
    pub fn from_config(config: &MemoryConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let memory = match config.path.as_deref() {
            Some(path) => Self::open(path)?,
            None => Self::in_memory()?,
        };
        Ok(Some(memory))
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| anyhow::anyhow!("Failed to acquire memory lock: {}", e))?;
            f(&conn)
        })
        .await
        .context("Translation memory task panicked")?
    }

    /// Fetch a stored result and count the hit
    pub async fn lookup(&self, key: &MemoryKey) -> Result<Option<TranslationResult>> {
        let key = key.0.clone();
        let json: Option<String> = self
            .execute_async(move |conn| {
                let json: Option<String> = conn
                    .query_row(
                        "SELECT result_json FROM translation_memory WHERE key = ?1",
                        [&key],
                        |row| row.get(0),
                    )
                    .optional()?;
                if json.is_some() {
                    conn.execute(
                        "UPDATE translation_memory SET hit_count = hit_count + 1 WHERE key = ?1",
                        [&key],
                    )?;
                }
                Ok(json)
            })
            .await?;

        match json {
            Some(json) => {
                let result = serde_json::from_str(&json).context("Corrupt translation memory record")?;
                debug!("Translation memory hit");
                Ok(Some(result))
            }
            None => Ok(None),
        }
    }

    /// Store a result, replacing any earlier one with the same key
    pub async fn store(&self, key: &MemoryKey, result: &TranslationResult) -> Result<()> {
        let key = key.0.clone();
        let json = serde_json::to_string(result).context("Failed to serialize translation result")?;
        let source_language = result.source_lang().to_string();
        let target_language = result.target_lang().to_string();
        let engine = result.engine_used().to_string();
        let overall = f64::from(result.overall_confidence());
        let created_at = Utc::now().to_rfc3339();

        self.execute_async(move |conn| {
            conn.execute(
                r#"
                INSERT INTO translation_memory (
                    key, source_language, target_language, engine,
                    overall_confidence, result_json, created_at, hit_count
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)
                ON CONFLICT(key) DO UPDATE SET
                    engine = excluded.engine,
                    overall_confidence = excluded.overall_confidence,
                    result_json = excluded.result_json,
                    created_at = excluded.created_at
                "#,
                params![key, source_language, target_language, engine, overall, json, created_at],
            )?;
            Ok(())
        })
        .await
    }

    /// Entry and hit counts
    pub async fn stats(&self) -> Result<MemoryStats> {
        self.execute_async(|conn| {
            let (entries, hits) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(hit_count), 0) FROM translation_memory",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(MemoryStats { entries, hits })
        })
        .await
    }

    /// Delete all stored results
    pub async fn clear(&self) -> Result<i64> {
        self.execute_async(|conn| {
            let deleted = conn.execute("DELETE FROM translation_memory", [])?;
            Ok(deleted as i64)
        })
        .await
    }
}

fn initialize_schema(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .context("Failed to read schema version")?;
    if version >= SCHEMA_VERSION {
        debug!("Translation memory schema is up to date (v{})", version);
        return Ok(());
    }

    info!("Initializing translation memory schema v{}", SCHEMA_VERSION);
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS translation_memory (
            key TEXT PRIMARY KEY,
            source_language TEXT NOT NULL,
            target_language TEXT NOT NULL,
            engine TEXT NOT NULL,
            overall_confidence REAL NOT NULL,
            result_json TEXT NOT NULL,
            created_at TEXT NOT NULL,
            hit_count INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_memory_languages
            ON translation_memory (source_language, target_language);
        "#,
    )
    .context("Failed to create translation memory tables")?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)
        .context("Failed to set schema version")?;
    Ok(())
}
