use anyhow::Result;
use clap::Args;
use markbook_core::manager::CreateOptions;
use markbook_core::model::project::Kind;
use serde_json::json;

use crate::cmd::Ctx;
use crate::output::short_id;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Name for the new work (defaults to a placeholder).
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, default_value = "")]
    pub subject: String,

    /// Class/group label.
    #[arg(long, default_value = "")]
    pub class: String,

    #[arg(long, default_value = "")]
    pub theme: String,

    /// Work category: current, exam, diagnostic, literacy, psychology.
    #[arg(long)]
    pub kind: Option<String>,

    /// Seed the new work from the current working buffer.
    #[arg(long)]
    pub from_current: bool,
}

pub fn run(ctx: &mut Ctx, args: &CreateArgs) -> Result<()> {
    let kind = args
        .kind
        .as_deref()
        .map(str::parse::<Kind>)
        .transpose()?;

    let project = ctx.manager.create_project(CreateOptions {
        name: args.name.clone(),
        kind,
        subject: args.subject.clone(),
        class: args.class.clone(),
        theme: args.theme.clone(),
        icon: None,
        color: None,
        seed_from_buffer: args.from_current,
    })?;

    ctx.mode.emit(
        &json!({ "id": project.id, "name": project.name }),
        || {
            println!(
                "Created {} ({})",
                project.display_name(),
                short_id(&project.id)
            );
        },
    )
}
