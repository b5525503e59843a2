//! Durable storage for the whole project collection plus the recent list.
//!
//! [`StorageBackend`] is the only component that touches the two tiers:
//!
//! 1. **Primary** — strict-quota, synchronous, the source of truth.
//! 2. **Secondary** — larger, best-effort redundancy. Mirror failures are
//!    logged, never propagated.
//!
//! # Quota recovery
//!
//! When the primary tier rejects a write for size, the backend prunes the
//! collection to the 20 most recently updated projects, discards stray
//! backend keys, and retries. A successful retry is reported in the
//! returned [`SaveReport`] so the caller can tell the user what was kept;
//! a failed retry surfaces as [`StorageError::QuotaExceeded`].
//!
//! # Load fallback
//!
//! Loads read the primary tier, fall back to the secondary when the
//! primary is empty or unreadable, and return an empty collection (never
//! an error) when both are empty. Every loaded record passes through the
//! schema migration in [`crate::migrate`]. [`LoadResult`] carries the
//! provenance for diagnostics.

pub mod tier;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{Value, json};

use crate::error::ErrorCode;
use crate::migrate::CURRENT_SCHEMA_VERSION;
use crate::model::project::Project;
use tier::{FileTier, SqliteTier, Tier, TierError};

/// Primary-tier key holding the serialized project collection.
pub const PROJECTS_KEY: &str = "projects";
/// Primary-tier key holding the recent-project id list.
pub const RECENT_KEY: &str = "recent";
/// Primary-tier key holding save metadata.
pub const META_KEY: &str = "meta";
/// Primary-tier key holding the last-active-project hint.
pub const LAST_ACTIVE_KEY: &str = "last_active";

/// Projects retained by the quota cleanup pass.
pub const CLEANUP_KEEP: usize = 20;

const EXPORT_SYSTEM: &str = "markbook";

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error on an import/export file.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record or document could not be serialized.
    #[error("storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The primary tier rejected the write even after pruning.
    #[error("primary tier quota exceeded even after pruning to {kept} newest projects: {source}")]
    QuotaExceeded {
        kept: usize,
        #[source]
        source: TierError,
    },

    /// The import file's top level does not contain a project list.
    #[error("import file {} lacks a top-level 'projects' array", .0.display())]
    MalformedImport(PathBuf),

    /// A tier operation failed.
    #[error(transparent)]
    Tier(#[from] TierError),
}

impl StorageError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::QuotaExceeded { .. } | Self::Tier(TierError::QuotaExceeded { .. }) => {
                ErrorCode::QuotaExceeded
            }
            Self::MalformedImport(_) => ErrorCode::MalformedImport,
            Self::Io(_) | Self::Serialize(_) | Self::Tier(_) => ErrorCode::StorageWriteFailed,
        }
    }
}

/// Which tier a load was satisfied from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Primary,
    Secondary,
    /// Both tiers were empty; the collection starts fresh.
    Empty,
}

/// Result of a [`StorageBackend::load`] call.
#[derive(Debug)]
pub struct LoadResult {
    pub projects: Vec<Project>,
    pub recent: Vec<String>,
    pub source: LoadSource,
}

/// Result of a [`StorageBackend::save`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    /// Set when quota recovery pruned the persisted collection.
    pub pruned_to: Option<usize>,
    /// Whether the secondary mirror succeeded.
    pub mirrored: bool,
}

/// Diagnostics snapshot of tier usage. Never used for control flow.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct StorageStats {
    pub primary_used_bytes: u64,
    pub primary_quota_bytes: Option<u64>,
    pub used_percent: f64,
    pub secondary_available: bool,
}

/// Durable persistence for the project collection.
pub struct StorageBackend {
    primary: Box<dyn Tier>,
    secondary: Option<Box<dyn Tier>>,
}

impl StorageBackend {
    /// Build a backend from explicit tiers.
    #[must_use]
    pub fn new(primary: Box<dyn Tier>, secondary: Option<Box<dyn Tier>>) -> Self {
        Self { primary, secondary }
    }

    /// Open the standard layout under `data_dir`: a quota-bounded file
    /// tier in `primary/` plus a best-effort SQLite mirror in
    /// `redundant.db`. A secondary that fails to open is logged and
    /// dropped, not fatal.
    ///
    /// # Errors
    ///
    /// Returns an error when the data directory cannot be created.
    pub fn open(data_dir: &Path, quota_bytes: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(data_dir)?;

        let primary = FileTier::new(data_dir.join("primary"), quota_bytes);
        let secondary = match SqliteTier::open(data_dir.join("redundant.db")) {
            Ok(tier) => Some(Box::new(tier) as Box<dyn Tier>),
            Err(err) => {
                tracing::warn!(%err, "secondary tier unavailable");
                None
            }
        };

        Ok(Self::new(Box::new(primary), secondary))
    }

    /// Persist the full collection and the recent list.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::QuotaExceeded`] when the primary tier
    /// rejects the write even after the cleanup pass, or another
    /// [`StorageError`] for serialization/tier failures.
    pub fn save(
        &self,
        projects: &[Project],
        recent: &[String],
    ) -> Result<SaveReport, StorageError> {
        let mut report = SaveReport {
            pruned_to: None,
            mirrored: false,
        };

        let mut payload = serde_json::to_string(projects)?;
        let mut stored_count = projects.len();

        match self.primary.put(PROJECTS_KEY, &payload) {
            Ok(()) => {}
            Err(TierError::QuotaExceeded { needed, quota }) => {
                tracing::warn!(
                    needed,
                    quota,
                    "primary tier full; pruning to {CLEANUP_KEEP} most recently updated projects"
                );

                self.cleanup_primary();
                let retained = most_recently_updated(projects, CLEANUP_KEEP);
                payload = serde_json::to_string(&retained)?;
                stored_count = retained.len();
                self.primary
                    .put(PROJECTS_KEY, &payload)
                    .map_err(|source| StorageError::QuotaExceeded {
                        kept: stored_count,
                        source,
                    })?;
                report.pruned_to = Some(stored_count);
            }
            Err(other) => return Err(other.into()),
        }

        let recent_payload = serde_json::to_string(recent)?;
        self.primary.put(RECENT_KEY, &recent_payload)?;

        let meta = json!({
            "savedAt": Utc::now().to_rfc3339(),
            "version": CURRENT_SCHEMA_VERSION,
            "totalProjects": stored_count,
        });
        self.primary.put(META_KEY, &meta.to_string())?;

        report.mirrored = self.mirror(&payload, &recent_payload, &meta.to_string());
        Ok(report)
    }

    /// Load the collection, preferring the primary tier.
    ///
    /// Never fails: unreadable or corrupt tiers are logged and treated as
    /// empty, and an empty [`LoadResult`] is returned when nothing is
    /// stored anywhere.
    #[must_use]
    pub fn load(&self) -> LoadResult {
        if let Some((projects, recent)) = load_tier(self.primary.as_ref()) {
            if !projects.is_empty() {
                tracing::debug!(count = projects.len(), "loaded registry from primary tier");
                return LoadResult {
                    projects,
                    recent,
                    source: LoadSource::Primary,
                };
            }
        }

        if let Some(secondary) = self.secondary.as_deref() {
            if let Some((projects, recent)) = load_tier(secondary) {
                if !projects.is_empty() {
                    tracing::info!(
                        count = projects.len(),
                        "primary tier empty; recovered registry from secondary tier"
                    );
                    return LoadResult {
                        projects,
                        recent,
                        source: LoadSource::Secondary,
                    };
                }
            }
        }

        LoadResult {
            projects: Vec::new(),
            recent: Vec::new(),
            source: LoadSource::Empty,
        }
    }

    /// Serialize the given projects plus export metadata to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or the file write fails.
    pub fn export_to_file(
        &self,
        projects: &[&Project],
        path: &Path,
    ) -> Result<usize, StorageError> {
        let document = json!({
            "projects": projects
                .iter()
                .map(|p| p.to_value())
                .collect::<Result<Vec<_>, _>>()?,
            "exportInfo": {
                "exportedAt": Utc::now().to_rfc3339(),
                "version": CURRENT_SCHEMA_VERSION,
                "system": EXPORT_SYSTEM,
            },
        });

        fs::write(path, serde_json::to_string_pretty(&document)?)?;
        Ok(projects.len())
    }

    /// Parse one file as the storage format and return its raw project
    /// records for the caller to validate, default, and de-duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MalformedImport`] when the file is not JSON
    /// or its top level lacks a `projects` array; [`StorageError::Io`]
    /// when it cannot be read.
    pub fn import_from_file(&self, path: &Path) -> Result<Vec<Value>, StorageError> {
        let content = fs::read_to_string(path)?;
        let document: Value = serde_json::from_str(&content)
            .map_err(|_| StorageError::MalformedImport(path.to_path_buf()))?;

        document
            .get("projects")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| StorageError::MalformedImport(path.to_path_buf()))
    }

    /// Persist or clear the last-active-project hint.
    ///
    /// # Errors
    ///
    /// Returns an error when the primary tier cannot be written.
    pub fn save_last_active(&self, id: Option<&str>) -> Result<(), StorageError> {
        match id {
            Some(id) => self.primary.put(LAST_ACTIVE_KEY, id)?,
            None => self.primary.remove(LAST_ACTIVE_KEY)?,
        }
        Ok(())
    }

    /// Read the last-active-project hint, if one is stored.
    #[must_use]
    pub fn load_last_active(&self) -> Option<String> {
        match self.primary.get(LAST_ACTIVE_KEY) {
            Ok(hint) => hint.filter(|id| !id.is_empty()),
            Err(err) => {
                tracing::warn!(%err, "failed to read last-active hint");
                None
            }
        }
    }

    /// Approximate usage diagnostics for both tiers.
    #[must_use]
    pub fn storage_stats(&self) -> StorageStats {
        let used = self.primary.used_bytes().unwrap_or_else(|err| {
            tracing::warn!(%err, "failed to measure primary tier usage");
            0
        });
        let quota = self.primary.quota_bytes();

        #[allow(clippy::cast_precision_loss)]
        let used_percent = quota
            .filter(|q| *q > 0)
            .map_or(0.0, |q| used as f64 / q as f64 * 100.0);

        StorageStats {
            primary_used_bytes: used,
            primary_quota_bytes: quota,
            used_percent,
            secondary_available: self.secondary.is_some(),
        }
    }

    /// Drop primary-tier keys that do not belong to the backend's known
    /// set. Part of quota recovery; failures are logged only.
    fn cleanup_primary(&self) {
        let known = [PROJECTS_KEY, RECENT_KEY, META_KEY, LAST_ACTIVE_KEY];
        match self.primary.keys() {
            Ok(keys) => {
                for key in keys {
                    if !known.contains(&key.as_str()) {
                        if let Err(err) = self.primary.remove(&key) {
                            tracing::warn!(key, %err, "failed to remove stray key");
                        }
                    }
                }
            }
            Err(err) => tracing::warn!(%err, "failed to list primary tier keys"),
        }
    }

    /// Mirror the persisted documents to the secondary tier. Best-effort:
    /// returns whether the whole mirror succeeded.
    fn mirror(&self, projects: &str, recent: &str, meta: &str) -> bool {
        let Some(secondary) = self.secondary.as_deref() else {
            return false;
        };

        let result = secondary
            .put(PROJECTS_KEY, projects)
            .and_then(|()| secondary.put(RECENT_KEY, recent))
            .and_then(|()| secondary.put(META_KEY, meta));

        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(tier = secondary.name(), %err, "secondary mirror failed");
                false
            }
        }
    }
}

/// Read and migrate one tier's collection. `None` when the tier holds no
/// usable document.
fn load_tier(tier: &dyn Tier) -> Option<(Vec<Project>, Vec<String>)> {
    let raw = match tier.get(PROJECTS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            tracing::error!(tier = tier.name(), %err, "failed to read tier");
            return None;
        }
    };

    let records: Vec<Value> = match serde_json::from_str(&raw) {
        Ok(records) => records,
        Err(err) => {
            tracing::error!(tier = tier.name(), %err, "corrupt project collection");
            return None;
        }
    };

    let now = Utc::now();
    let mut projects = Vec::with_capacity(records.len());
    for record in records {
        match Project::from_value(record, now) {
            Ok(project) => projects.push(project),
            Err(err) => tracing::warn!(tier = tier.name(), %err, "dropping unusable record"),
        }
    }

    let recent = tier
        .get(RECENT_KEY)
        .ok()
        .flatten()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();

    Some((projects, recent))
}

/// The `keep` most recently updated projects, newest first.
fn most_recently_updated(projects: &[Project], keep: usize) -> Vec<Project> {
    let mut sorted: Vec<Project> = projects.to_vec();
    sorted.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    sorted.truncate(keep);
    sorted
}
