use anyhow::Result;
use markbook_core::manager::ProjectManager;
use serde_json::json;

use crate::cmd::Ctx;

pub fn run(ctx: &Ctx) -> Result<()> {
    let storage = ctx.manager.storage_stats();
    let current = ctx.manager.current_project().map(|project| {
        let stats = ProjectManager::calculate_project_stats(project);
        (project.name.clone(), stats)
    });

    ctx.mode.emit(
        &json!({
            "storage": storage,
            "current": current.as_ref().map(|(name, stats)| json!({
                "name": name,
                "stats": stats,
            })),
        }),
        || {
            println!(
                "Primary tier: {} bytes used{}",
                storage.primary_used_bytes,
                storage.primary_quota_bytes.map_or_else(String::new, |q| {
                    format!(" of {q} ({:.1}%)", storage.used_percent)
                })
            );
            println!(
                "Secondary tier: {}",
                if storage.secondary_available {
                    "available"
                } else {
                    "unavailable"
                }
            );

            match &current {
                Some((name, stats)) => {
                    println!("Current work: {name}");
                    println!(
                        "  {} students, {} tasks, {:.0}% complete, average grade {:.2}",
                        stats.total_students,
                        stats.total_tasks,
                        stats.completion_percent,
                        stats.avg_grade
                    );
                }
                None => println!("No work is open."),
            }
        },
    )
}
