use anyhow::Result;
use clap::{Args, Subcommand};
use markbook_core::model::project::TaskDef;
use serde_json::json;

use crate::cmd::{Ctx, require_current};

#[derive(Args, Debug)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Append a task to the current work.
    Add {
        /// Maximum score for the task.
        #[arg(long, default_value_t = 1.0)]
        max_score: f64,

        /// Difficulty level (1 = basic).
        #[arg(long, default_value_t = 1)]
        level: u8,
    },
    /// List the current work's tasks.
    List,
}

pub fn run(ctx: &mut Ctx, args: &TaskArgs) -> Result<()> {
    require_current(&ctx.manager)?;

    match &args.command {
        TaskCommand::Add { max_score, level } => {
            let buffer = ctx.manager.buffer_mut();
            buffer.tasks.push(TaskDef {
                max_score: *max_score,
                level: *level,
                ..TaskDef::default()
            });
            let index = buffer.tasks.len() - 1;
            ctx.manager.save_current_project()?;

            ctx.mode.emit(
                &json!({ "index": index, "maxScore": max_score, "level": level }),
                || println!("Added task {index} (max score {max_score}, level {level})"),
            )
        }
        TaskCommand::List => {
            let tasks = &ctx.manager.buffer().tasks;
            ctx.mode.emit(tasks, || {
                if tasks.is_empty() {
                    println!("No tasks yet.");
                }
                for (index, task) in tasks.iter().enumerate() {
                    println!(
                        "{index:>3}  max score {:<5} level {}",
                        task.max_score, task.level
                    );
                }
            })
        }
    }
}
