use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::cmd::{Ctx, find_project_id};
use crate::output::short_id;

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Work to open: id, id prefix, or name.
    pub project: String,
}

pub fn run(ctx: &mut Ctx, args: &OpenArgs) -> Result<()> {
    let id = find_project_id(&ctx.manager, &args.project)?;
    ctx.manager.open_project(&id)?;

    let name = ctx
        .manager
        .get(&id)
        .map(|p| p.name.clone())
        .unwrap_or_default();

    ctx.mode.emit(&json!({ "id": id, "name": name }), || {
        println!("Opened \"{name}\" ({})", short_id(&id));
    })
}
