use anyhow::Result;
use chrono::Utc;
use clap::Args;
use serde_json::json;
use std::path::PathBuf;

use crate::cmd::{Ctx, find_project_id};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Work to export: id, id prefix, or name. Exports everything when
    /// omitted.
    pub project: Option<String>,

    /// Output path (defaults to a dated file in the current directory).
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

pub fn run(ctx: &Ctx, args: &ExportArgs) -> Result<()> {
    let path = args.output.clone().unwrap_or_else(|| {
        PathBuf::from(format!(
            "markbook_projects_{}.json",
            Utc::now().format("%Y-%m-%d")
        ))
    });

    let count = match &args.project {
        Some(needle) => {
            let id = find_project_id(&ctx.manager, needle)?;
            ctx.manager.export_project(&id, &path)?
        }
        None => ctx.manager.export_all(&path)?,
    };

    ctx.mode.emit(
        &json!({ "exported": count, "path": path }),
        || {
            println!(
                "Exported {count} {} to {}",
                if count == 1 { "work" } else { "works" },
                path.display()
            );
        },
    )
}
