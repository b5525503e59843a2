//! Storage tiers behind one capability interface.
//!
//! The backend owns a primary/secondary pair of [`Tier`] implementations:
//!
//! - [`FileTier`] — the strict-quota primary: one JSON document per key in
//!   a directory, synchronous, the source of truth.
//! - [`SqliteTier`] — the larger best-effort secondary: a key/value table
//!   in a SQLite database, mirrored opportunistically.
//!
//! Either tier can be swapped without touching the manager; the backend
//! only speaks `put`/`get`/`remove`/`keys`/`quota_bytes`.

use std::fs;
use std::io;
use std::path::PathBuf;

use rusqlite::{Connection, OptionalExtension};

/// Errors from a single tier operation.
#[derive(Debug, thiserror::Error)]
pub enum TierError {
    /// I/O error reading or writing tier data.
    #[error("tier I/O error: {0}")]
    Io(#[from] io::Error),

    /// A write was rejected because it would exceed the tier's byte quota.
    #[error("write of {needed} bytes rejected by {quota}-byte quota")]
    QuotaExceeded { needed: u64, quota: u64 },

    /// The tier's backing store reported an error.
    #[error("tier backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for TierError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// One storage tier: a flat key -> document store.
pub trait Tier {
    /// Short tier name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Write one document.
    ///
    /// # Errors
    ///
    /// Returns [`TierError::QuotaExceeded`] when the tier enforces a quota
    /// and the write would exceed it; the existing document is left intact.
    fn put(&self, key: &str, value: &str) -> Result<(), TierError>;

    /// Read one document. `Ok(None)` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, TierError>;

    /// Remove one document. Removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), TierError>;

    /// List every key currently stored.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store cannot be read.
    fn keys(&self) -> Result<Vec<String>, TierError>;

    /// The enforced byte quota, if this tier has one.
    fn quota_bytes(&self) -> Option<u64>;

    /// Approximate bytes currently stored.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store cannot be read.
    fn used_bytes(&self) -> Result<u64, TierError>;
}

// ---------------------------------------------------------------------------
// FileTier
// ---------------------------------------------------------------------------

/// Quota-bounded primary tier: each key is a `<key>.json` file in `dir`.
#[derive(Debug)]
pub struct FileTier {
    dir: PathBuf,
    quota: u64,
}

impl FileTier {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, quota: u64) -> Self {
        Self {
            dir: dir.into(),
            quota,
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Tier for FileTier {
    fn name(&self) -> &'static str {
        "file"
    }

    fn put(&self, key: &str, value: &str) -> Result<(), TierError> {
        fs::create_dir_all(&self.dir)?;

        let path = self.key_path(key);
        let existing = fs::metadata(&path).map_or(0, |m| m.len());
        let needed = self.used_bytes()? - existing + value.len() as u64;
        if needed > self.quota {
            return Err(TierError::QuotaExceeded {
                needed,
                quota: self.quota,
            });
        }

        // Replace atomically so a failed write never clobbers the document.
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, TierError> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn remove(&self, key: &str) -> Result<(), TierError> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, TierError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(key) = name.strip_suffix(".json") {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn quota_bytes(&self) -> Option<u64> {
        Some(self.quota)
    }

    fn used_bytes(&self) -> Result<u64, TierError> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut total = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().ends_with(".json") {
                total += entry.metadata()?.len();
            }
        }
        Ok(total)
    }
}

// ---------------------------------------------------------------------------
// SqliteTier
// ---------------------------------------------------------------------------

/// Best-effort secondary tier backed by a SQLite key/value table.
pub struct SqliteTier {
    conn: Connection,
}

impl SqliteTier {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the database cannot be opened or the schema
    /// cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TierError> {
        let conn = Connection::open(path.into())?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )?;
        Ok(Self { conn })
    }

    /// In-memory database, for tests.
    ///
    /// # Errors
    ///
    /// Returns an error when the database cannot be created.
    pub fn open_in_memory() -> Result<Self, TierError> {
        let conn = Connection::open_in_memory()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )?;
        Ok(Self { conn })
    }
}

impl Tier for SqliteTier {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn put(&self, key: &str, value: &str) -> Result<(), TierError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, TierError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn remove(&self, key: &str) -> Result<(), TierError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, TierError> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for key in rows {
            keys.push(key?);
        }
        Ok(keys)
    }

    fn quota_bytes(&self) -> Option<u64> {
        None
    }

    fn used_bytes(&self) -> Result<u64, TierError> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(key) + LENGTH(value)), 0) FROM kv",
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(total).unwrap_or(0))
    }
}
