//! The working buffer: the currently-edited assessment's payload.
//!
//! The buffer is the shared structure the surrounding application renders
//! and edits between an open and the next save. It is singly owned by the
//! [`crate::manager::ProjectManager`]; external readers may borrow it
//! freely, but all mutation routes through the manager so the
//! current-project invariant and persistence stay consistent.
//!
//! Results are positional here (`results[student][task]`), matching how the
//! editing surface addresses them; the keyed mapping stored on a
//! [`Project`] is produced on save and expanded on open. A `None` cell
//! means no score has been recorded, which is distinct from an explicit 0.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::model::project::{Project, Results, Settings, Student, TaskDef};

/// The owned working-buffer context object.
#[derive(Debug, Clone, Default)]
pub struct WorkBuffer {
    pub settings: Settings,
    pub tasks: Vec<TaskDef>,
    pub students: Vec<Student>,
    pub results: Vec<Vec<Option<f64>>>,
    pub errors: BTreeMap<String, Value>,
    pub psychology_features: Vec<Value>,
}

impl WorkBuffer {
    /// Reset every field to its empty state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Overwrite the buffer with a project's payload, expanding the keyed
    /// results mapping into the positional grid.
    ///
    /// Task keys resolve against explicit task ids first, then the
    /// `task_{index}` convention; student keys resolve against roster ids
    /// first, then as roster indexes. Keys that match neither are dropped.
    pub fn apply_project(&mut self, project: &Project) {
        self.settings = project.settings.clone();
        self.tasks = project.tasks.clone();
        self.students = project.students.clone();
        self.errors = project.errors.clone();
        self.psychology_features = project.psychology_features.clone();

        self.results = vec![vec![None; self.tasks.len()]; self.students.len()];
        for (student_key, scores) in &project.results {
            let Some(student_index) = self.resolve_student(student_key) else {
                continue;
            };
            for (task_key, score) in scores {
                let Some(task_index) = self.resolve_task(task_key) else {
                    continue;
                };
                self.results[student_index][task_index] = Some(*score);
            }
        }
    }

    /// Fold the positional grid back into the keyed results mapping.
    ///
    /// Students with no recorded cells contribute no entry; recorded zeros
    /// are kept.
    #[must_use]
    pub fn keyed_results(&self) -> Results {
        let mut keyed = Results::new();
        for (student_index, student) in self.students.iter().enumerate() {
            let Some(row) = self.results.get(student_index) else {
                continue;
            };
            let mut scores = BTreeMap::new();
            for (task_index, task) in self.tasks.iter().enumerate() {
                if let Some(score) = row.get(task_index).copied().flatten() {
                    scores.insert(task.result_key(task_index), score);
                }
            }
            if !scores.is_empty() {
                keyed.insert(student.result_key(student_index), scores);
            }
        }
        keyed
    }

    /// Record a single score cell, growing the grid if the roster or task
    /// list changed shape since the last open.
    pub fn record_score(&mut self, student_index: usize, task_index: usize, score: f64) {
        if self.results.len() < self.students.len() {
            self.results.resize(self.students.len(), Vec::new());
        }
        if let Some(row) = self.results.get_mut(student_index) {
            if row.len() < self.tasks.len() {
                row.resize(self.tasks.len(), None);
            }
            if let Some(cell) = row.get_mut(task_index) {
                *cell = Some(score);
            }
        }
    }

    fn resolve_student(&self, key: &str) -> Option<usize> {
        if let Some(index) = self
            .students
            .iter()
            .position(|s| s.id.as_deref() == Some(key))
        {
            return Some(index);
        }
        key.parse::<usize>()
            .ok()
            .filter(|index| *index < self.students.len())
    }

    fn resolve_task(&self, key: &str) -> Option<usize> {
        if let Some(index) = self.tasks.iter().position(|t| t.id.as_deref() == Some(key)) {
            return Some(index);
        }
        key.strip_prefix("task_")
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|index| *index < self.tasks.len())
    }
}
