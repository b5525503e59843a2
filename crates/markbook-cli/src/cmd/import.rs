use anyhow::Result;
use clap::Args;
use serde_json::json;
use std::path::PathBuf;

use crate::cmd::Ctx;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Export files to import.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

pub fn run(ctx: &mut Ctx, args: &ImportArgs) -> Result<()> {
    let imported = ctx.manager.import_projects(&args.files)?;

    ctx.mode.emit(&json!({ "imported": imported }), || {
        println!(
            "Imported {imported} {}",
            if imported == 1 { "work" } else { "works" }
        );
    })
}
