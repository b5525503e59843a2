use anyhow::Result;
use serde_json::json;

use crate::cmd::Ctx;

pub fn run(ctx: &Ctx) -> Result<()> {
    let count = ctx.manager.projects().len();
    ctx.mode.emit(
        &json!({
            "data_dir": ctx.data_dir,
            "projects": count,
        }),
        || {
            println!(
                "Store ready at {} ({count} {})",
                ctx.data_dir.display(),
                if count == 1 { "work" } else { "works" }
            );
        },
    )
}
