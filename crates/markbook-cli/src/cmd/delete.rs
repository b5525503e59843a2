use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::cmd::{Ctx, find_project_id};

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Work to delete: id, id prefix, or name.
    pub project: String,
}

pub fn run(ctx: &mut Ctx, args: &DeleteArgs) -> Result<()> {
    let id = find_project_id(&ctx.manager, &args.project)?;
    let deleted = ctx.manager.delete_project(&id, true)?;

    ctx.mode.emit(&json!({ "id": id, "deleted": deleted }), || {
        if !deleted {
            println!("Cancelled.");
        }
    })
}
