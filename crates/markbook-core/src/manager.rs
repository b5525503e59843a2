//! Project lifecycle manager.
//!
//! [`ProjectManager`] owns the in-memory registry of all projects, the
//! notion of exactly one "current" project, and the working buffer the
//! surrounding application edits. It orchestrates
//! create/open/save/duplicate/delete/search, delegates all durability to
//! [`StorageBackend`], and emits typed lifecycle events for observers.
//!
//! # Ordering guarantees
//!
//! Every lifecycle operation takes `&mut self` and runs to completion, so
//! open/save pairs are strictly sequenced within a process: `open_project`
//! finishes its save-then-load sequence before any subsequent lifecycle
//! call can start mutating the buffer. Registry-mutating operations
//! complete their persist step before returning.
//!
//! # Failure semantics
//!
//! A not-found id, a malformed import, or a storage write failure is
//! reported to the notification sink and aborts only that operation; the
//! in-memory registry is rolled back to its pre-call shape.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::buffer::WorkBuffer;
use crate::error::ErrorCode;
use crate::events::{EventBus, ProjectEvent};
use crate::model::project::{self, Kind, Project, ProjectStats, Status};
use crate::model::stats::calculate_stats;
use crate::notify::{Notifier, Severity};
use crate::storage::{StorageBackend, StorageError, StorageStats};

/// Recent-list capacity.
const RECENT_CAPACITY: usize = 10;

/// Last-active hints older than this are ignored on session restore.
const RESTORE_MAX_AGE_DAYS: i64 = 30;

/// Errors from manager operations.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// The referenced id is absent from the registry.
    #[error("project not found: {0}")]
    NotFound(String),

    /// A storage operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ManagerError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::ProjectNotFound,
            Self::Storage(err) => err.code(),
        }
    }
}

/// Options for [`ProjectManager::create_project`].
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Explicit name; defaults to an incrementing placeholder.
    pub name: Option<String>,
    pub kind: Option<Kind>,
    pub subject: String,
    pub class: String,
    pub theme: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    /// Deep-copy the current working buffer's payload into the new project.
    pub seed_from_buffer: bool,
}

/// Sort key for [`ProjectManager::filter_projects`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    UpdatedAt,
    CreatedAt,
    Name,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Independent, conjunctively-composed filter predicates.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    /// Substring match against name and subject.
    pub search: Option<String>,
    pub subject: Option<String>,
    pub status: Option<Status>,
    pub kind: Option<Kind>,
    /// Inclusive lower bound on `updated_at`.
    pub updated_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `updated_at`.
    pub updated_before: Option<DateTime<Utc>>,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
}

/// In-memory registry of all projects plus the current-project pointer.
pub struct ProjectManager {
    storage: StorageBackend,
    notifier: Box<dyn Notifier>,
    bus: EventBus,
    projects: Vec<Project>,
    recent: Vec<String>,
    current_id: Option<String>,
    buffer: WorkBuffer,
}

impl ProjectManager {
    #[must_use]
    pub fn new(storage: StorageBackend, notifier: Box<dyn Notifier>) -> Self {
        Self {
            storage,
            notifier,
            bus: EventBus::default(),
            projects: Vec::new(),
            recent: Vec::new(),
            current_id: None,
            buffer: WorkBuffer::default(),
        }
    }

    /// Load the registry from storage and restore the previous session's
    /// current project. Never fails; restore problems are logged and the
    /// manager starts with an empty current pointer instead.
    pub fn init(&mut self) {
        let loaded = self.storage.load();
        tracing::info!(
            count = loaded.projects.len(),
            source = ?loaded.source,
            "registry loaded"
        );
        self.projects = loaded.projects;
        self.recent = loaded.recent;
        self.bus.emit(&ProjectEvent::Loaded {
            count: self.projects.len(),
        });

        self.restore_session();
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    #[must_use]
    pub fn current_project(&self) -> Option<&Project> {
        self.current_id.as_deref().and_then(|id| self.get(id))
    }

    #[must_use]
    pub fn recent_ids(&self) -> &[String] {
        &self.recent
    }

    /// Read-only view of the working buffer.
    #[must_use]
    pub const fn buffer(&self) -> &WorkBuffer {
        &self.buffer
    }

    /// Mutable access to the working buffer. The manager stays the single
    /// owner; the surrounding application edits through this borrow between
    /// an open and the next save.
    pub const fn buffer_mut(&mut self) -> &mut WorkBuffer {
        &mut self.buffer
    }

    /// Register a lifecycle event subscriber.
    pub fn subscribe(&mut self, subscriber: impl Fn(&ProjectEvent) + 'static) {
        self.bus.subscribe(subscriber);
    }

    /// Storage usage diagnostics.
    #[must_use]
    pub fn storage_stats(&self) -> StorageStats {
        self.storage.storage_stats()
    }

    /// Recompute a project's derived statistics.
    #[must_use]
    pub fn calculate_project_stats(project: &Project) -> ProjectStats {
        calculate_stats(project)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Build a project, insert it through the name-collision path, and
    /// immediately open it. Returns the new project.
    ///
    /// # Errors
    ///
    /// Returns an error when the subsequent open/persist step fails; the
    /// registry is rolled back.
    pub fn create_project(&mut self, options: CreateOptions) -> Result<Project, ManagerError> {
        let now = Utc::now();
        let name = options
            .name
            .unwrap_or_else(|| format!("New work {}", self.projects.len() + 1));

        let mut project = Project::new(name, now);
        if let Some(kind) = options.kind {
            project.kind = kind;
        }
        project.subject = options.subject;
        project.class = options.class;
        project.theme = options.theme;
        if let Some(icon) = options.icon {
            project.icon = icon;
        }
        if let Some(color) = options.color {
            project.color = color;
        }

        if options.seed_from_buffer {
            project.settings = self.buffer.settings.clone();
            project.tasks = self.buffer.tasks.clone();
            project.students = self.buffer.students.clone();
            project.results = self.buffer.keyed_results();
            project.errors = self.buffer.errors.clone();
            project.psychology_features = self.buffer.psychology_features.clone();
            project.stats = calculate_stats(&project);
        }

        project.name = self.unique_name(&project.name, None);
        let id = project.id.clone();
        self.projects.push(project);
        self.bus.emit(&ProjectEvent::Created { id: id.clone() });

        if let Err(err) = self.open_project(&id) {
            self.projects.retain(|p| p.id != id);
            return Err(err);
        }

        let project = self
            .get(&id)
            .cloned()
            .ok_or_else(|| ManagerError::NotFound(id))?;
        tracing::info!(id = %project.id, name = %project.name, "project created");
        Ok(project)
    }

    /// Make `id` the current project.
    ///
    /// No-op when `id` is already current. Otherwise the currently open
    /// project is saved first so no edits are lost, the target's payload
    /// overwrites the working buffer, and the registry is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NotFound`] (also reported to the sink) when
    /// `id` is absent, or a storage error when persisting fails.
    pub fn open_project(&mut self, id: &str) -> Result<(), ManagerError> {
        if self.current_id.as_deref() == Some(id) {
            return Ok(());
        }

        // Flush pending edits before switching.
        if self.current_id.is_some() {
            self.save_current_project()?;
        }

        let Some(index) = self.projects.iter().position(|p| p.id == id) else {
            self.report(ErrorCode::ProjectNotFound, &format!("No project with id {id}"));
            return Err(ManagerError::NotFound(id.to_string()));
        };

        let previous = self.current_id.clone();
        self.buffer.apply_project(&self.projects[index]);
        self.projects[index].last_opened = Some(Utc::now());
        self.current_id = Some(id.to_string());
        self.push_recent(id);

        self.persist()?;
        if let Err(err) = self.storage.save_last_active(Some(id)) {
            tracing::warn!(%err, "failed to persist last-active hint");
        }

        tracing::info!(id, name = %self.projects[index].name, "project opened");
        self.bus.emit(&ProjectEvent::Opened {
            previous,
            id: id.to_string(),
        });
        Ok(())
    }

    /// Capture the working buffer into the current project and persist.
    ///
    /// No-op when no project is current. Idempotent: a second call with no
    /// intervening edits produces the same persisted state apart from
    /// `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns a storage error when persisting fails; the project record
    /// is rolled back to its pre-save state.
    pub fn save_current_project(&mut self) -> Result<(), ManagerError> {
        let Some(id) = self.current_id.clone() else {
            return Ok(());
        };
        let Some(index) = self.projects.iter().position(|p| p.id == id) else {
            tracing::error!(id, "current project missing from registry");
            return Ok(());
        };

        let backup = self.projects[index].clone();

        {
            let project = &mut self.projects[index];
            project.settings = self.buffer.settings.clone();
            project.tasks = self.buffer.tasks.clone();
            project.students = self.buffer.students.clone();
            project.results = self.buffer.keyed_results();
            project.errors = self.buffer.errors.clone();
            project.psychology_features = self.buffer.psychology_features.clone();
            project.updated_at = Utc::now();
        }
        self.projects[index].stats = calculate_stats(&self.projects[index]);

        if let Err(err) = self.persist() {
            self.projects[index] = backup;
            return Err(err);
        }

        tracing::debug!(id, "project saved");
        self.bus.emit(&ProjectEvent::Saved { id });
        Ok(())
    }

    /// Remove a project from the registry and storage.
    ///
    /// Returns `Ok(false)` when the user declines the confirmation prompt.
    /// When the deleted project was current, the most recently updated
    /// remaining project is opened; deleting the last project auto-creates
    /// a fresh one so a current project always exists afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NotFound`] when `id` is absent, or a
    /// storage error when persisting fails; the registry is rolled back.
    pub fn delete_project(
        &mut self,
        id: &str,
        require_confirmation: bool,
    ) -> Result<bool, ManagerError> {
        let Some(index) = self.projects.iter().position(|p| p.id == id) else {
            self.report(ErrorCode::ProjectNotFound, &format!("No project with id {id}"));
            return Err(ManagerError::NotFound(id.to_string()));
        };
        let name = self.projects[index].name.clone();

        if require_confirmation
            && !self.notifier.confirm(
                "Delete work?",
                &format!("Delete \"{name}\"? This cannot be undone."),
            )
        {
            return Ok(false);
        }

        let removed = self.projects.remove(index);
        let recent_backup = self.recent.clone();
        self.recent.retain(|r| r != id);

        let was_current = self.current_id.as_deref() == Some(id);
        let buffer_backup = was_current.then(|| self.buffer.clone());
        if was_current {
            self.current_id = None;
            self.buffer.clear();
            if let Err(err) = self.storage.save_last_active(None) {
                tracing::warn!(%err, "failed to clear last-active hint");
            }
        }

        if let Err(err) = self.persist() {
            self.projects.insert(index, removed);
            self.recent = recent_backup;
            if let Some(buffer) = buffer_backup {
                self.buffer = buffer;
                self.current_id = Some(id.to_string());
            }
            return Err(err);
        }

        tracing::info!(id, name = %name, "project deleted");
        self.bus.emit(&ProjectEvent::Deleted { id: id.to_string() });
        self.notifier
            .notify(&format!("Deleted \"{name}\""), Severity::Success);

        if was_current {
            let next = self
                .projects
                .iter()
                .max_by_key(|p| p.updated_at)
                .map(|p| p.id.clone());
            match next {
                Some(next_id) => self.open_project(&next_id)?,
                None => {
                    self.create_project(CreateOptions::default())?;
                }
            }
        }

        Ok(true)
    }

    /// Deep-copy a project into a new registry entry. The copy gets a new
    /// id, a `"(copy)"` name through the collision path, fresh timestamps,
    /// a cleared `last_opened`, and counts-only stats. It is not opened.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NotFound`] when `id` is absent, or a
    /// storage error when persisting fails; the registry is rolled back.
    pub fn duplicate_project(&mut self, id: &str) -> Result<Project, ManagerError> {
        let Some(source) = self.get(id).cloned() else {
            self.report(ErrorCode::ProjectNotFound, &format!("No project with id {id}"));
            return Err(ManagerError::NotFound(id.to_string()));
        };

        let now = Utc::now();
        let mut copy = source.clone();
        copy.id = project::generate_id();
        copy.name = self.unique_name(&format!("{} (copy)", source.name), None);
        copy.created_at = now;
        copy.updated_at = now;
        copy.last_opened = None;
        copy.stats = ProjectStats {
            total_students: copy.students.len(),
            total_tasks: copy.tasks.len(),
            ..ProjectStats::default()
        };

        let copy_id = copy.id.clone();
        self.projects.push(copy.clone());

        if let Err(err) = self.persist() {
            self.projects.retain(|p| p.id != copy_id);
            return Err(err);
        }

        tracing::info!(source = id, id = %copy_id, "project duplicated");
        self.bus.emit(&ProjectEvent::Duplicated {
            source: id.to_string(),
            id: copy_id,
        });
        self.notifier
            .notify(&format!("Created \"{}\"", copy.name), Severity::Success);
        Ok(copy)
    }

    /// Rename a registry entry in place. Uniqueness is not re-enforced on
    /// rename; collisions are only resolved at insertion time.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NotFound`] when `id` is absent, or a
    /// storage error when persisting fails; the registry is rolled back.
    pub fn rename_project(&mut self, id: &str, name: &str) -> Result<(), ManagerError> {
        let Some(index) = self.projects.iter().position(|p| p.id == id) else {
            self.report(ErrorCode::ProjectNotFound, &format!("No project with id {id}"));
            return Err(ManagerError::NotFound(id.to_string()));
        };

        let backup = (
            self.projects[index].name.clone(),
            self.projects[index].updated_at,
        );
        self.projects[index].name = name.to_string();
        self.projects[index].updated_at = Utc::now();

        if let Err(err) = self.persist() {
            self.projects[index].name = backup.0;
            self.projects[index].updated_at = backup.1;
            return Err(err);
        }

        self.bus.emit(&ProjectEvent::Renamed { id: id.to_string() });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Search & filter
    // -----------------------------------------------------------------------

    /// Case-insensitive match against name, subject, theme, class, and
    /// tags. An empty query returns everything.
    #[must_use]
    pub fn search_projects(&self, query: &str) -> Vec<&Project> {
        let term = query.trim().to_lowercase();
        if term.is_empty() {
            return self.projects.iter().collect();
        }

        self.projects
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&term)
                    || p.subject.to_lowercase().contains(&term)
                    || p.theme.to_lowercase().contains(&term)
                    || p.class.to_lowercase().contains(&term)
                    || p.tags.iter().any(|tag| tag.to_lowercase().contains(&term))
            })
            .collect()
    }

    /// Compose the criteria's predicates conjunctively, then sort by the
    /// configured field and direction.
    #[must_use]
    pub fn filter_projects(&self, criteria: &FilterCriteria) -> Vec<&Project> {
        let term = criteria
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut filtered: Vec<&Project> = self
            .projects
            .iter()
            .filter(|p| {
                term.as_deref().is_none_or(|term| {
                    p.name.to_lowercase().contains(term)
                        || p.subject.to_lowercase().contains(term)
                })
            })
            .filter(|p| {
                criteria
                    .subject
                    .as_deref()
                    .is_none_or(|subject| p.subject == subject)
            })
            .filter(|p| criteria.status.is_none_or(|status| p.status == status))
            .filter(|p| criteria.kind.is_none_or(|kind| p.kind == kind))
            .filter(|p| {
                criteria
                    .updated_after
                    .is_none_or(|after| p.updated_at >= after)
            })
            .filter(|p| {
                criteria
                    .updated_before
                    .is_none_or(|before| p.updated_at <= before)
            })
            .collect();

        filtered.sort_by(|a, b| {
            let ordering = match criteria.sort_field {
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            };
            match criteria.sort_direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        filtered
    }

    // -----------------------------------------------------------------------
    // Import & export
    // -----------------------------------------------------------------------

    /// Export one project to a file.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NotFound`] when `id` is absent, or a
    /// storage error when the file cannot be written.
    pub fn export_project(&self, id: &str, path: &Path) -> Result<usize, ManagerError> {
        let Some(project) = self.get(id) else {
            self.report(ErrorCode::ProjectNotFound, &format!("No project with id {id}"));
            return Err(ManagerError::NotFound(id.to_string()));
        };

        let count = self.run_export(&[project], path)?;
        self.notifier.notify(
            &format!("Exported \"{}\" to {}", project.name, path.display()),
            Severity::Success,
        );
        Ok(count)
    }

    /// Export the whole registry to a file.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the file cannot be written.
    pub fn export_all(&self, path: &Path) -> Result<usize, ManagerError> {
        let refs: Vec<&Project> = self.projects.iter().collect();
        let count = self.run_export(&refs, path)?;
        self.notifier.notify(
            &format!("Exported {count} projects to {}", path.display()),
            Severity::Success,
        );
        Ok(count)
    }

    /// Import projects from one or more files.
    ///
    /// A file whose top-level shape is wrong is reported and skipped; the
    /// batch continues. Individual unusable records are dropped silently
    /// (logged) without failing their file. Imported records are defaulted,
    /// migrated, de-duplicated against the registry, and inserted through
    /// the name-collision path. Returns the count of imported projects.
    ///
    /// # Errors
    ///
    /// Returns a storage error when persisting the grown registry fails;
    /// the registry is rolled back.
    pub fn import_projects(&mut self, paths: &[PathBuf]) -> Result<usize, ManagerError> {
        let now = Utc::now();
        let snapshot_len = self.projects.len();
        let mut imported = 0_usize;

        for path in paths {
            let records: Vec<Value> = match self.storage.import_from_file(path) {
                Ok(records) => records,
                Err(err) => {
                    self.report(err.code(), &err.to_string());
                    continue;
                }
            };

            for record in records {
                match Project::from_value(record, now) {
                    Ok(mut project) => {
                        if self.is_import_duplicate(&project) {
                            tracing::debug!(name = %project.name, "skipping duplicate import");
                            continue;
                        }
                        if self.get(&project.id).is_some() {
                            project.id = project::generate_id();
                        }
                        project.name = self.unique_name(&project.name, None);
                        self.projects.push(project);
                        imported += 1;
                    }
                    Err(err) => {
                        tracing::warn!(path = %path.display(), %err, "skipping unusable record");
                    }
                }
            }
        }

        if imported > 0 {
            if let Err(err) = self.persist() {
                self.projects.truncate(snapshot_len);
                return Err(err);
            }
            self.bus.emit(&ProjectEvent::Imported { count: imported });
            self.notifier
                .notify(&format!("Imported {imported} projects"), Severity::Success);
        } else {
            self.notifier
                .notify("No new projects imported", Severity::Info);
        }

        Ok(imported)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Reopen the previous session's project: the persisted last-active
    /// hint when it is fresh enough, else the first active project, else a
    /// fresh project when the registry is empty.
    fn restore_session(&mut self) {
        if let Some(id) = self.storage.load_last_active() {
            if let Some(project) = self.get(&id) {
                let anchor = project.last_opened.unwrap_or(project.updated_at);
                if Utc::now() - anchor <= Duration::days(RESTORE_MAX_AGE_DAYS) {
                    if self.open_project(&id).is_ok() {
                        return;
                    }
                } else {
                    tracing::debug!(id, "last-active hint is stale; ignoring");
                }
            }
        }

        if let Some(id) = self
            .projects
            .iter()
            .find(|p| p.is_active())
            .map(|p| p.id.clone())
        {
            if self.open_project(&id).is_ok() {
                return;
            }
        }

        if self.projects.is_empty() {
            if let Err(err) = self.create_project(CreateOptions::default()) {
                tracing::warn!(%err, "failed to create initial project");
            }
        }
    }

    /// Resolve a name collision by appending an incrementing counter to
    /// the base name.
    fn unique_name(&self, base: &str, exclude_id: Option<&str>) -> String {
        let mut name = base.to_string();
        let mut counter = 1;
        while self
            .projects
            .iter()
            .any(|p| p.name == name && Some(p.id.as_str()) != exclude_id)
        {
            name = format!("{base} ({counter})");
            counter += 1;
        }
        name
    }

    fn push_recent(&mut self, id: &str) {
        self.recent.retain(|r| r != id);
        self.recent.insert(0, id.to_string());
        self.recent.truncate(RECENT_CAPACITY);
    }

    /// Persist the registry, surfacing a quota prune to the user and
    /// reporting hard failures to the sink.
    fn persist(&self) -> Result<(), ManagerError> {
        match self.storage.save(&self.projects, &self.recent) {
            Ok(report) => {
                if let Some(kept) = report.pruned_to {
                    self.notifier.notify(
                        &format!(
                            "Storage was full; kept the {kept} most recently updated projects"
                        ),
                        Severity::Warning,
                    );
                }
                Ok(())
            }
            Err(err) => {
                self.report(err.code(), &err.to_string());
                Err(err.into())
            }
        }
    }

    fn run_export(&self, projects: &[&Project], path: &Path) -> Result<usize, ManagerError> {
        match self.storage.export_to_file(projects, path) {
            Ok(count) => Ok(count),
            Err(err) => {
                self.report(err.code(), &err.to_string());
                Err(err.into())
            }
        }
    }

    /// Whether an imported record duplicates an existing project: same
    /// name, subject and class, created within one second.
    fn is_import_duplicate(&self, candidate: &Project) -> bool {
        self.projects.iter().any(|p| {
            p.name == candidate.name
                && p.subject == candidate.subject
                && p.class == candidate.class
                && (p.created_at - candidate.created_at).num_seconds().abs() < 1
        })
    }

    fn report(&self, code: ErrorCode, detail: &str) {
        let message = code.hint().map_or_else(
            || detail.to_string(),
            |hint| format!("{detail} {hint}"),
        );
        tracing::error!(code = %code, "{message}");
        self.notifier.report_error(code.message(), &message);
    }
}

#[cfg(test)]
mod tests {
    use super::{CreateOptions, FilterCriteria, ManagerError, ProjectManager, SortDirection,
                SortField};
    use crate::events::ProjectEvent;
    use crate::model::project::{Status, Student, TaskDef};
    use crate::notify::{Notifier, NullNotifier, Severity};
    use crate::storage::StorageBackend;
    use chrono::{Duration, Utc};
    use std::cell::{Cell, RefCell};
    use std::path::Path;
    use std::rc::Rc;

    struct RecordingNotifier {
        messages: Rc<RefCell<Vec<(String, Severity)>>>,
        errors: Rc<RefCell<Vec<(String, String)>>>,
        confirm_response: Cell<bool>,
    }

    impl RecordingNotifier {
        fn new() -> Self {
            Self {
                messages: Rc::new(RefCell::new(Vec::new())),
                errors: Rc::new(RefCell::new(Vec::new())),
                confirm_response: Cell::new(true),
            }
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str, severity: Severity) {
            self.messages.borrow_mut().push((message.into(), severity));
        }

        fn report_error(&self, title: &str, message: &str) {
            self.errors.borrow_mut().push((title.into(), message.into()));
        }

        fn confirm(&self, _title: &str, _message: &str) -> bool {
            self.confirm_response.get()
        }
    }

    fn manager_in(dir: &Path) -> ProjectManager {
        let storage = StorageBackend::open(dir, 1024 * 1024).expect("open storage");
        ProjectManager::new(storage, Box::new(NullNotifier))
    }

    fn manager() -> (tempfile::TempDir, ProjectManager) {
        let dir = tempfile::tempdir().expect("temp dir");
        let mgr = manager_in(dir.path());
        (dir, mgr)
    }

    #[test]
    fn create_opens_and_persists() {
        let (dir, mut mgr) = manager();
        let project = mgr.create_project(CreateOptions::default()).unwrap();

        assert_eq!(project.name, "New work 1");
        assert_eq!(mgr.current_id(), Some(project.id.as_str()));
        assert!(project.last_opened.is_some());
        assert_eq!(mgr.recent_ids(), [project.id.clone()]);

        // A fresh manager sees the persisted registry.
        let mut reloaded = manager_in(dir.path());
        reloaded.init();
        assert_eq!(reloaded.projects().len(), 1);
        assert_eq!(reloaded.projects()[0].name, "New work 1");
    }

    #[test]
    fn name_collisions_get_counter_suffixes() {
        let (_dir, mut mgr) = manager();
        let opts = |name: &str| CreateOptions {
            name: Some(name.into()),
            ..CreateOptions::default()
        };

        assert_eq!(mgr.create_project(opts("Test")).unwrap().name, "Test");
        assert_eq!(mgr.create_project(opts("Test")).unwrap().name, "Test (1)");
        assert_eq!(mgr.create_project(opts("Test")).unwrap().name, "Test (2)");
    }

    #[test]
    fn seed_from_buffer_copies_payload() {
        let (_dir, mut mgr) = manager();
        mgr.buffer_mut().students = vec![Student {
            name: "A".into(),
            ..Student::default()
        }];
        mgr.buffer_mut().tasks = vec![TaskDef::default()];
        mgr.buffer_mut().record_score(0, 0, 1.0);

        let seeded = mgr
            .create_project(CreateOptions {
                seed_from_buffer: true,
                ..CreateOptions::default()
            })
            .unwrap();

        assert_eq!(seeded.students.len(), 1);
        assert_eq!(seeded.tasks.len(), 1);
        assert_eq!(seeded.results["0"]["task_0"], 1.0);
        assert_eq!(seeded.stats.total_students, 1);
    }

    #[test]
    fn open_is_a_noop_for_current_project() {
        let (_dir, mut mgr) = manager();
        let project = mgr.create_project(CreateOptions::default()).unwrap();
        let before = mgr.get(&project.id).unwrap().last_opened;

        mgr.open_project(&project.id).unwrap();
        assert_eq!(mgr.get(&project.id).unwrap().last_opened, before);
    }

    #[test]
    fn open_saves_previous_project_first() {
        let (_dir, mut mgr) = manager();
        let a = mgr.create_project(CreateOptions::default()).unwrap();
        let b = mgr.create_project(CreateOptions::default()).unwrap();
        mgr.open_project(&a.id).unwrap();

        // Unsaved edits to A live only in the buffer.
        mgr.buffer_mut().students = vec![Student {
            name: "Edited".into(),
            ..Student::default()
        }];

        mgr.open_project(&b.id).unwrap();

        // A's record reflects the buffered edits before B overwrote the
        // buffer.
        assert_eq!(mgr.get(&a.id).unwrap().students[0].name, "Edited");
        assert!(mgr.buffer().students.is_empty());
        assert_eq!(mgr.current_id(), Some(b.id.as_str()));
    }

    #[test]
    fn open_unknown_id_reports_and_leaves_registry_alone() {
        let (_dir, mut mgr) = manager();
        let notifier = RecordingNotifier::new();
        let errors = Rc::clone(&notifier.errors);
        mgr.notifier = Box::new(notifier);

        let a = mgr.create_project(CreateOptions::default()).unwrap();
        let result = mgr.open_project("missing");

        assert!(matches!(result, Err(ManagerError::NotFound(_))));
        assert_eq!(mgr.current_id(), Some(a.id.as_str()));
        assert_eq!(mgr.projects().len(), 1);
        assert_eq!(errors.borrow().len(), 1);
        assert_eq!(errors.borrow()[0].0, "Project not found");
    }

    #[test]
    fn save_is_idempotent_apart_from_updated_at() {
        let (_dir, mut mgr) = manager();
        let id = mgr.create_project(CreateOptions::default()).unwrap().id;
        mgr.buffer_mut().students = vec![Student {
            name: "A".into(),
            ..Student::default()
        }];

        mgr.save_current_project().unwrap();
        let first = mgr.get(&id).unwrap().clone();

        mgr.save_current_project().unwrap();
        let second = mgr.get(&id).unwrap().clone();

        let mut normalized = second.clone();
        normalized.updated_at = first.updated_at;
        assert_eq!(normalized, first);
    }

    #[test]
    fn save_without_current_is_a_noop() {
        let (_dir, mut mgr) = manager();
        mgr.save_current_project().unwrap();
        assert!(mgr.projects().is_empty());
    }

    #[test]
    fn at_most_one_current_through_lifecycle() {
        let (_dir, mut mgr) = manager();
        let a = mgr.create_project(CreateOptions::default()).unwrap();
        let b = mgr.create_project(CreateOptions::default()).unwrap();
        mgr.open_project(&a.id).unwrap();
        mgr.delete_project(&a.id, false).unwrap();

        let current = mgr.current_id().map(str::to_string);
        assert_eq!(current.as_deref(), Some(b.id.as_str()));
        assert!(mgr.get(&b.id).is_some());
    }

    #[test]
    fn delete_current_opens_most_recently_updated_remaining() {
        let (_dir, mut mgr) = manager();
        let t1 = mgr.create_project(CreateOptions::default()).unwrap().id;
        let t2 = mgr.create_project(CreateOptions::default()).unwrap().id;
        let t3 = mgr.create_project(CreateOptions::default()).unwrap().id;

        mgr.open_project(&t2).unwrap();

        // Pin updated_at so t1 < t2 < t3, and give t3 a recognizable roster.
        let base = Utc::now();
        for (id, offset) in [(&t1, 1), (&t2, 2), (&t3, 3)] {
            let index = mgr.projects.iter().position(|p| &p.id == id).unwrap();
            mgr.projects[index].updated_at = base + Duration::seconds(offset);
        }
        let t3_index = mgr.projects.iter().position(|p| p.id == t3).unwrap();
        mgr.projects[t3_index].students = vec![Student {
            name: "From T3".into(),
            ..Student::default()
        }];

        mgr.delete_project(&t2, false).unwrap();

        assert_eq!(mgr.projects().len(), 2);
        assert_eq!(mgr.current_id(), Some(t3.as_str()));
        assert_eq!(mgr.buffer().students[0].name, "From T3");
    }

    #[test]
    fn deleting_last_project_auto_creates_a_fresh_current() {
        let (_dir, mut mgr) = manager();
        let only = mgr.create_project(CreateOptions::default()).unwrap();

        mgr.delete_project(&only.id, false).unwrap();

        assert_eq!(mgr.projects().len(), 1);
        let fresh = &mgr.projects()[0];
        assert_ne!(fresh.id, only.id);
        assert_eq!(mgr.current_id(), Some(fresh.id.as_str()));
    }

    #[test]
    fn declined_confirmation_aborts_without_side_effects() {
        let (_dir, mut mgr) = manager();
        let notifier = RecordingNotifier::new();
        notifier.confirm_response.set(false);
        mgr.notifier = Box::new(notifier);

        let project = mgr.create_project(CreateOptions::default()).unwrap();
        let deleted = mgr.delete_project(&project.id, true).unwrap();

        assert!(!deleted);
        assert_eq!(mgr.projects().len(), 1);
        assert_eq!(mgr.current_id(), Some(project.id.as_str()));
    }

    #[test]
    fn duplicate_names_and_resets_derived_state() {
        let (_dir, mut mgr) = manager();
        let source = mgr
            .create_project(CreateOptions {
                name: Some("Test".into()),
                ..CreateOptions::default()
            })
            .unwrap();

        let copy = mgr.duplicate_project(&source.id).unwrap();
        assert_eq!(copy.name, "Test (copy)");
        assert_ne!(copy.id, source.id);
        assert!(copy.last_opened.is_none());
        // The duplicate is not opened.
        assert_eq!(mgr.current_id(), Some(source.id.as_str()));

        let second = mgr.duplicate_project(&source.id).unwrap();
        assert_eq!(second.name, "Test (copy) (1)");
    }

    #[test]
    fn rename_skips_collision_resolution() {
        let (_dir, mut mgr) = manager();
        let a = mgr.create_project(CreateOptions::default()).unwrap();
        let b = mgr.create_project(CreateOptions::default()).unwrap();

        mgr.rename_project(&b.id, &a.name).unwrap();
        assert_eq!(mgr.get(&b.id).unwrap().name, a.name);
    }

    #[test]
    fn recent_list_is_deduplicated_and_capped() {
        let (_dir, mut mgr) = manager();
        let mut ids = Vec::new();
        for _ in 0..12 {
            ids.push(mgr.create_project(CreateOptions::default()).unwrap().id);
        }

        assert_eq!(mgr.recent_ids().len(), 10);
        assert_eq!(mgr.recent_ids()[0], ids[11]);

        mgr.open_project(&ids[5]).unwrap();
        assert_eq!(mgr.recent_ids()[0], ids[5]);
        assert_eq!(mgr.recent_ids().len(), 10);
        assert_eq!(
            mgr.recent_ids().iter().filter(|r| **r == ids[5]).count(),
            1
        );
    }

    #[test]
    fn search_matches_case_insensitively_across_fields() {
        let (_dir, mut mgr) = manager();
        mgr.create_project(CreateOptions {
            name: Some("Fractions quiz".into()),
            subject: "Mathematics".into(),
            ..CreateOptions::default()
        })
        .unwrap();
        let tagged = mgr
            .create_project(CreateOptions {
                name: Some("Reading check".into()),
                ..CreateOptions::default()
            })
            .unwrap();
        let index = mgr.projects.iter().position(|p| p.id == tagged.id).unwrap();
        mgr.projects[index].tags = vec!["MATH".into()];

        let hits = mgr.search_projects("math");
        assert_eq!(hits.len(), 2);

        let hits = mgr.search_projects("fractions");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Fractions quiz");

        assert_eq!(mgr.search_projects("").len(), 2);
    }

    #[test]
    fn filter_composes_predicates_and_sorts() {
        let (_dir, mut mgr) = manager();
        let mut ids = Vec::new();
        for (name, subject) in [("A", "math"), ("B", "math"), ("C", "physics")] {
            ids.push(
                mgr.create_project(CreateOptions {
                    name: Some(name.into()),
                    subject: subject.into(),
                    ..CreateOptions::default()
                })
                .unwrap()
                .id,
            );
        }

        let base = Utc::now();
        for (offset, id) in ids.iter().enumerate() {
            let index = mgr.projects.iter().position(|p| &p.id == id).unwrap();
            mgr.projects[index].updated_at = base + Duration::seconds(offset as i64);
            mgr.projects[index].status = Status::Active;
        }

        let criteria = FilterCriteria {
            subject: Some("math".into()),
            status: Some(Status::Active),
            updated_after: Some(base),
            updated_before: Some(base + Duration::seconds(10)),
            sort_field: SortField::UpdatedAt,
            sort_direction: SortDirection::Ascending,
            ..FilterCriteria::default()
        };

        let hits = mgr.filter_projects(&criteria);
        assert_eq!(
            hits.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            ["A", "B"]
        );

        let descending = mgr.filter_projects(&FilterCriteria {
            sort_direction: SortDirection::Descending,
            ..criteria
        });
        assert_eq!(
            descending
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>(),
            ["B", "A"]
        );
    }

    #[test]
    fn export_then_import_deduplicates() {
        let (dir, mut mgr) = manager();
        mgr.create_project(CreateOptions {
            name: Some("Exported".into()),
            subject: "math".into(),
            ..CreateOptions::default()
        })
        .unwrap();

        let path = dir.path().join("export.json");
        assert_eq!(mgr.export_all(&path).unwrap(), 1);

        let other_dir = tempfile::tempdir().unwrap();
        let mut other = manager_in(other_dir.path());

        assert_eq!(other.import_projects(&[path.clone()]).unwrap(), 1);
        assert_eq!(other.projects()[0].name, "Exported");
        // Re-importing the same file adds nothing.
        assert_eq!(other.import_projects(&[path]).unwrap(), 0);
        assert_eq!(other.projects().len(), 1);
    }

    #[test]
    fn import_skips_unusable_records_but_keeps_the_batch() {
        let (dir, mut mgr) = manager();
        let path = dir.path().join("mixed.json");
        std::fs::write(
            &path,
            r#"{"projects": [{"name": "Good"}, {"subject": "nameless"}, 17]}"#,
        )
        .unwrap();

        assert_eq!(mgr.import_projects(&[path]).unwrap(), 1);
        assert_eq!(mgr.projects()[0].name, "Good");
    }

    #[test]
    fn malformed_file_is_reported_and_batch_continues() {
        let (dir, mut mgr) = manager();
        let notifier = RecordingNotifier::new();
        let errors = Rc::clone(&notifier.errors);
        mgr.notifier = Box::new(notifier);

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"nope": true}"#).unwrap();
        let good = dir.path().join("good.json");
        std::fs::write(&good, r#"{"projects": [{"name": "Survivor"}]}"#).unwrap();

        assert_eq!(mgr.import_projects(&[bad, good]).unwrap(), 1);
        assert_eq!(errors.borrow().len(), 1);
        assert_eq!(mgr.projects()[0].name, "Survivor");
    }

    #[test]
    fn session_restore_reopens_fresh_hint() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let mut mgr = manager_in(dir.path());
            mgr.create_project(CreateOptions::default()).unwrap().id
        };

        let mut mgr = manager_in(dir.path());
        mgr.init();
        assert_eq!(mgr.current_id(), Some(id.as_str()));
    }

    #[test]
    fn session_restore_ignores_stale_hint() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut mgr = manager_in(dir.path());
            let id = mgr.create_project(CreateOptions::default()).unwrap().id;
            let index = mgr.projects.iter().position(|p| p.id == id).unwrap();
            mgr.projects[index].last_opened = Some(Utc::now() - Duration::days(45));
            mgr.projects[index].updated_at = Utc::now() - Duration::days(45);
            mgr.storage.save(&mgr.projects, &mgr.recent).unwrap();
        }

        let mut mgr = manager_in(dir.path());
        mgr.init();
        // Stale hint, no active project, non-empty registry: nothing opens.
        assert_eq!(mgr.current_id(), None);
        assert_eq!(mgr.projects().len(), 1);
    }

    #[test]
    fn session_restore_creates_first_project_for_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = manager_in(dir.path());
        mgr.init();

        assert_eq!(mgr.projects().len(), 1);
        assert!(mgr.current_id().is_some());
    }

    #[test]
    fn lifecycle_events_are_emitted() {
        let (_dir, mut mgr) = manager();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        mgr.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let project = mgr.create_project(CreateOptions::default()).unwrap();
        mgr.save_current_project().unwrap();
        mgr.delete_project(&project.id, false).unwrap();

        let seen = seen.borrow();
        assert!(matches!(seen[0], ProjectEvent::Created { .. }));
        assert!(
            seen.iter()
                .any(|e| matches!(e, ProjectEvent::Opened { .. }))
        );
        assert!(seen.iter().any(|e| matches!(e, ProjectEvent::Saved { .. })));
        assert!(
            seen.iter()
                .any(|e| matches!(e, ProjectEvent::Deleted { .. }))
        );
    }
}
