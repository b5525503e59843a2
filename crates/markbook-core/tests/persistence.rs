//! End-to-end persistence tests across manager sessions.
//!
//! Each test drives the public API only: a manager is built over a real
//! store directory, dropped, and rebuilt to prove what actually survived
//! on disk.

use markbook_core::manager::{CreateOptions, ProjectManager};
use markbook_core::model::project::{Student, TaskDef};
use markbook_core::notify::NullNotifier;
use markbook_core::storage::{LoadSource, StorageBackend};
use std::path::Path;

fn manager_in(dir: &Path) -> ProjectManager {
    let storage = StorageBackend::open(dir, 1024 * 1024).expect("open storage");
    ProjectManager::new(storage, Box::new(NullNotifier))
}

fn roster_entry(name: &str) -> Student {
    Student {
        name: name.into(),
        ..Student::default()
    }
}

#[test]
fn edits_survive_a_full_session_cycle() {
    let dir = tempfile::tempdir().expect("temp dir");

    let id = {
        let mut mgr = manager_in(dir.path());
        let id = mgr
            .create_project(CreateOptions {
                name: Some("Quarter test".into()),
                subject: "math".into(),
                ..CreateOptions::default()
            })
            .expect("create")
            .id;

        let buffer = mgr.buffer_mut();
        buffer.tasks = vec![
            TaskDef {
                max_score: 2.0,
                ..TaskDef::default()
            },
            TaskDef {
                max_score: 3.0,
                ..TaskDef::default()
            },
        ];
        buffer.students = vec![roster_entry("A. Ivanov"), roster_entry("B. Petrov")];
        buffer.record_score(0, 0, 2.0);
        buffer.record_score(0, 1, 3.0);
        mgr.save_current_project().expect("save");
        id
    };

    let mut mgr = manager_in(dir.path());
    mgr.init();

    assert_eq!(mgr.current_id(), Some(id.as_str()));
    let project = mgr.get(&id).expect("project survived");
    assert_eq!(project.name, "Quarter test");
    assert_eq!(project.tasks.len(), 2);
    assert_eq!(project.students.len(), 2);
    assert_eq!(project.results["0"]["task_0"], 2.0);

    // Stats were recomputed on save: one perfect score, one ungraded.
    assert_eq!(project.stats.total_students, 2);
    assert!((project.stats.avg_grade - 5.0).abs() < f64::EPSILON);
    assert!((project.stats.completion_percent - 50.0).abs() < f64::EPSILON);

    // The buffer was rehydrated from the keyed mapping.
    assert_eq!(mgr.buffer().results[0], vec![Some(2.0), Some(3.0)]);
    assert_eq!(mgr.buffer().results[1], vec![None, None]);
}

#[test]
fn registry_recovers_from_secondary_after_primary_loss() {
    let dir = tempfile::tempdir().expect("temp dir");

    {
        let mut mgr = manager_in(dir.path());
        mgr.create_project(CreateOptions {
            name: Some("Mirrored".into()),
            ..CreateOptions::default()
        })
        .expect("create");
    }

    // Simulate primary-tier loss; the SQLite mirror remains.
    std::fs::remove_dir_all(dir.path().join("primary")).expect("wipe primary");

    let backend = StorageBackend::open(dir.path(), 1024 * 1024).expect("reopen");
    let loaded = backend.load();
    assert_eq!(loaded.source, LoadSource::Secondary);
    assert_eq!(loaded.projects.len(), 1);
    assert_eq!(loaded.projects[0].name, "Mirrored");
}

#[test]
fn duplicate_then_reload_keeps_both_entries() {
    let dir = tempfile::tempdir().expect("temp dir");

    {
        let mut mgr = manager_in(dir.path());
        let source = mgr
            .create_project(CreateOptions {
                name: Some("Original".into()),
                ..CreateOptions::default()
            })
            .expect("create");
        mgr.duplicate_project(&source.id).expect("duplicate");
    }

    let mut mgr = manager_in(dir.path());
    mgr.init();

    let names: Vec<&str> = mgr.projects().iter().map(|p| p.name.as_str()).collect();
    assert!(names.contains(&"Original"));
    assert!(names.contains(&"Original (copy)"));
}

#[test]
fn legacy_records_migrate_on_load() {
    let dir = tempfile::tempdir().expect("temp dir");

    // Hand-write a v1 registry document into the primary tier layout.
    let primary = dir.path().join("primary");
    std::fs::create_dir_all(&primary).expect("mkdir");
    std::fs::write(
        primary.join("projects.json"),
        r#"[{
            "id": "legacy-1",
            "name": "Old work",
            "version": "1.0",
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-02T10:00:00Z",
            "tasks": [{"maxScore": 2}],
            "students": [{"name": "A"}],
            "results": [{"task_0": 2}]
        }]"#,
    )
    .expect("seed registry");

    let backend = StorageBackend::open(dir.path(), 1024 * 1024).expect("open");
    let loaded = backend.load();

    assert_eq!(loaded.projects.len(), 1);
    let project = &loaded.projects[0];
    assert_eq!(project.version, markbook_core::migrate::CURRENT_SCHEMA_VERSION);
    // Positional results were keyed by roster index.
    assert_eq!(project.results["0"]["task_0"], 2.0);
}
