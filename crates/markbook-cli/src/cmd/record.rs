use anyhow::{Result, bail};
use clap::Args;
use serde_json::json;

use crate::cmd::{Ctx, require_current};

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Student: roster index or name.
    #[arg(long)]
    pub student: String,

    /// Task index (0-based).
    #[arg(long)]
    pub task: usize,

    /// Achieved score.
    #[arg(long)]
    pub score: f64,
}

pub fn run(ctx: &mut Ctx, args: &RecordArgs) -> Result<()> {
    require_current(&ctx.manager)?;

    let buffer = ctx.manager.buffer();
    let student_index = resolve_student(buffer, &args.student)?;
    if args.task >= buffer.tasks.len() {
        bail!(
            "task index {} out of range (the work has {} tasks)",
            args.task,
            buffer.tasks.len()
        );
    }

    let student_name = buffer.students[student_index].name.clone();
    ctx.manager
        .buffer_mut()
        .record_score(student_index, args.task, args.score);
    ctx.manager.save_current_project()?;

    ctx.mode.emit(
        &json!({
            "student": student_index,
            "task": args.task,
            "score": args.score,
        }),
        || {
            println!(
                "Recorded {} for {student_name} on task {}",
                args.score, args.task
            );
        },
    )
}

fn resolve_student(buffer: &markbook_core::WorkBuffer, needle: &str) -> Result<usize> {
    if let Ok(index) = needle.parse::<usize>() {
        if index < buffer.students.len() {
            return Ok(index);
        }
        bail!(
            "student index {index} out of range (the roster has {} entries)",
            buffer.students.len()
        );
    }

    buffer
        .students
        .iter()
        .position(|s| s.name.eq_ignore_ascii_case(needle))
        .ok_or_else(|| anyhow::anyhow!("no student named '{needle}' in the roster"))
}
