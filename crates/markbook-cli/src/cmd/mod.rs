pub mod create;
pub mod delete;
pub mod dup;
pub mod export;
pub mod import;
pub mod init;
pub mod list;
pub mod open;
pub mod record;
pub mod roster;
pub mod stats;
pub mod task;

use anyhow::{Context as _, Result, bail};
use markbook_core::lock::StoreLock;
use markbook_core::manager::ProjectManager;
use markbook_core::storage::StorageBackend;
use markbook_core::{Project, config};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::output::{ConsoleNotifier, OutputMode};

/// Everything a command needs: the manager over a locked store plus the
/// output mode.
pub struct Ctx {
    pub manager: ProjectManager,
    pub mode: OutputMode,
    pub data_dir: PathBuf,
    _lock: StoreLock,
}

impl Ctx {
    /// Open the store, acquire the instance lock, and restore the session.
    pub fn build(
        data_dir: Option<&Path>,
        assume_yes: bool,
        mode: OutputMode,
    ) -> Result<Self> {
        let config = config::load_config().context("failed to load configuration")?;
        let data_dir = config::resolve_data_dir(data_dir, &config);

        let lock = StoreLock::acquire(&data_dir.join("lock"), Duration::from_secs(2))
            .context("failed to lock the project store")?;
        let storage = StorageBackend::open(&data_dir, config.storage.quota_bytes)
            .context("failed to open the project store")?;

        tracing::debug!(data_dir = %data_dir.display(), "store opened");
        let mut manager = ProjectManager::new(storage, Box::new(ConsoleNotifier { assume_yes }));
        manager.init();

        Ok(Self {
            manager,
            mode,
            data_dir,
            _lock: lock,
        })
    }
}

/// Resolve a user-supplied project reference: exact id, unique id prefix,
/// or case-insensitive name.
pub fn find_project_id(manager: &ProjectManager, needle: &str) -> Result<String> {
    if let Some(project) = manager.get(needle) {
        return Ok(project.id.clone());
    }

    let by_prefix: Vec<&Project> = manager
        .projects()
        .iter()
        .filter(|p| p.id.starts_with(needle))
        .collect();
    match by_prefix.as_slice() {
        [one] => return Ok(one.id.clone()),
        [] => {}
        _ => bail!("ambiguous id prefix '{needle}'"),
    }

    let by_name: Vec<&Project> = manager
        .projects()
        .iter()
        .filter(|p| p.name.eq_ignore_ascii_case(needle))
        .collect();
    match by_name.as_slice() {
        [one] => Ok(one.id.clone()),
        [] => bail!("no project matches '{needle}'"),
        _ => bail!("multiple projects named '{needle}'; use the id"),
    }
}

/// The current project's id, or a friendly error telling the user to open
/// one first.
pub fn require_current(manager: &ProjectManager) -> Result<String> {
    manager
        .current_id()
        .map(str::to_string)
        .context("no work is open; run `mb open <work>` first")
}
