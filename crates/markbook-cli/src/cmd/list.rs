use anyhow::{Result, bail};
use clap::Args;
use markbook_core::manager::{FilterCriteria, SortDirection, SortField};
use markbook_core::model::project::Status;

use crate::cmd::Ctx;
use crate::output::ProjectRow;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Substring filter on name and subject.
    #[arg(long)]
    pub search: Option<String>,

    /// Exact subject filter.
    #[arg(long)]
    pub subject: Option<String>,

    /// Status filter: draft, active, completed, archived.
    #[arg(long)]
    pub status: Option<String>,

    /// Sort field: updated, created, name.
    #[arg(long, default_value = "updated")]
    pub sort: String,

    /// Sort ascending instead of newest-first.
    #[arg(long)]
    pub asc: bool,
}

pub fn run(ctx: &Ctx, args: &ListArgs) -> Result<()> {
    let status = args
        .status
        .as_deref()
        .map(str::parse::<Status>)
        .transpose()?;

    let sort_field = match args.sort.as_str() {
        "updated" => SortField::UpdatedAt,
        "created" => SortField::CreatedAt,
        "name" => SortField::Name,
        other => bail!("unknown sort field '{other}' (expected updated, created, or name)"),
    };

    let criteria = FilterCriteria {
        search: args.search.clone(),
        subject: args.subject.clone(),
        status,
        sort_field,
        sort_direction: if args.asc {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        },
        ..FilterCriteria::default()
    };

    let hits = ctx.manager.filter_projects(&criteria);
    let current = ctx.manager.current_id();
    let rows: Vec<ProjectRow> = hits.iter().map(|p| ProjectRow::from_project(p)).collect();

    ctx.mode.emit(&rows, || {
        if hits.is_empty() {
            println!("No works match.");
            return;
        }
        for (project, row) in hits.iter().zip(&rows) {
            let marker = if current == Some(project.id.as_str()) {
                "*"
            } else {
                " "
            };
            println!(
                "{marker} {:<10} {:<9} {:<30} {:<12} {}",
                row.id, row.status, row.name, row.subject, row.updated
            );
        }
    })
}
