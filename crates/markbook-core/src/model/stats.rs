//! Derived project statistics.
//!
//! Stats are a cache: recomputed on every save, never trusted as
//! authoritative, always safe to discard and rebuild from the payload.

use std::cmp::Ordering;

use crate::model::project::{GradeCriteria, Project, ProjectStats};

/// Map a percentage score to a discrete grade.
///
/// The highest criteria band whose `min` lower bound is at or below the
/// percentage wins; ties on the bound go to the higher grade. Bands with
/// non-numeric grade keys are ignored. Returns `None` when no band
/// matches (e.g. an empty table).
#[must_use]
pub fn grade_for_percent(criteria: &GradeCriteria, percent: f64) -> Option<u8> {
    criteria
        .iter()
        .filter_map(|(grade, band)| grade.parse::<u8>().ok().map(|g| (g, band)))
        .filter(|(_, band)| percent >= band.min)
        .max_by(|(grade_a, band_a), (grade_b, band_b)| {
            band_a
                .min
                .partial_cmp(&band_b.min)
                .unwrap_or(Ordering::Equal)
                .then(grade_a.cmp(grade_b))
        })
        .map(|(grade, _)| grade)
}

/// Recompute the aggregate statistics for a project.
///
/// Every roster entry with recorded results contributes its achieved/possible
/// percentage and the grade that percentage maps to; entries with no recorded
/// results are excluded from the average but counted in the roster size.
#[must_use]
pub fn calculate_stats(project: &Project) -> ProjectStats {
    let mut stats = ProjectStats {
        total_students: project.students.len(),
        total_tasks: project.tasks.len(),
        ..ProjectStats::default()
    };

    if project.tasks.is_empty() || project.students.is_empty() {
        return stats;
    }

    let mut graded = 0_usize;
    let mut grade_sum = 0.0_f64;
    let mut grade_count = 0_usize;

    for (index, student) in project.students.iter().enumerate() {
        let key = student.result_key(index);
        let Some(scores) = project.results.get(&key) else {
            continue;
        };
        if scores.is_empty() {
            continue;
        }

        let mut achieved = 0.0;
        let mut possible = 0.0;
        for (task_index, task) in project.tasks.iter().enumerate() {
            let task_key = task.result_key(task_index);
            achieved += scores.get(&task_key).copied().unwrap_or(0.0);
            possible += task.max_score;
        }
        if possible <= 0.0 {
            continue;
        }

        graded += 1;
        let percent = achieved / possible * 100.0;
        if let Some(grade) = grade_for_percent(&project.settings.criteria, percent) {
            *stats
                .grades_distribution
                .entry(grade.to_string())
                .or_insert(0) += 1;
            grade_sum += f64::from(grade);
            grade_count += 1;
        }
    }

    if grade_count > 0 {
        #[allow(clippy::cast_precision_loss)]
        {
            stats.avg_grade = grade_sum / grade_count as f64;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    {
        stats.completion_percent = graded as f64 / project.students.len() as f64 * 100.0;
    }

    stats
}
