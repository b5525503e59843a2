use anyhow::Result;
use clap::{Args, Subcommand};
use markbook_core::model::project::Student;
use serde_json::json;

use crate::cmd::{Ctx, require_current};

#[derive(Args, Debug)]
pub struct RosterArgs {
    #[command(subcommand)]
    pub command: RosterCommand,
}

#[derive(Subcommand, Debug)]
pub enum RosterCommand {
    /// Add a student to the current work's roster.
    Add {
        /// Student display name.
        name: String,
    },
    /// List the current work's roster.
    List,
}

pub fn run(ctx: &mut Ctx, args: &RosterArgs) -> Result<()> {
    require_current(&ctx.manager)?;

    match &args.command {
        RosterCommand::Add { name } => {
            let buffer = ctx.manager.buffer_mut();
            buffer.students.push(Student {
                name: name.clone(),
                ..Student::default()
            });
            let index = buffer.students.len() - 1;
            ctx.manager.save_current_project()?;

            ctx.mode.emit(&json!({ "index": index, "name": name }), || {
                println!("Added student {index}: {name}");
            })
        }
        RosterCommand::List => {
            let students = &ctx.manager.buffer().students;
            ctx.mode.emit(students, || {
                if students.is_empty() {
                    println!("Roster is empty.");
                }
                for (index, student) in students.iter().enumerate() {
                    println!("{index:>3}  {}", student.name);
                }
            })
        }
    }
}
