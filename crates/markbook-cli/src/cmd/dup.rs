use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::cmd::{Ctx, find_project_id};
use crate::output::short_id;

#[derive(Args, Debug)]
pub struct DupArgs {
    /// Work to duplicate: id, id prefix, or name.
    pub project: String,
}

pub fn run(ctx: &mut Ctx, args: &DupArgs) -> Result<()> {
    let id = find_project_id(&ctx.manager, &args.project)?;
    let copy = ctx.manager.duplicate_project(&id)?;

    ctx.mode.emit(&json!({ "id": copy.id, "name": copy.name }), || {
        println!("Duplicated into \"{}\" ({})", copy.name, short_id(&copy.id));
    })
}
