//! markbook-core: project persistence and lifecycle layer.
//!
//! The rest of the application (forms, charts, report rendering) is an
//! external collaborator that edits the working buffer and listens for
//! lifecycle events; everything durable lives here.
//!
//! # Conventions
//!
//! - **Errors**: per-module `thiserror` enums; `anyhow::Result` only at
//!   orchestration edges.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `error!`, `debug!`).

pub mod autosave;
pub mod buffer;
pub mod config;
pub mod error;
pub mod events;
pub mod lock;
pub mod manager;
pub mod migrate;
pub mod model;
pub mod notify;
pub mod storage;

pub use buffer::WorkBuffer;
pub use events::ProjectEvent;
pub use manager::{CreateOptions, FilterCriteria, ManagerError, ProjectManager};
pub use model::project::{Kind, Project, Status};
pub use notify::{Notifier, NullNotifier, Severity};
pub use storage::{StorageBackend, StorageError};
