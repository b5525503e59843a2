#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use output::OutputMode;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "markbook: teacher assessment workbench",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Override the store directory.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Assume "yes" for confirmation prompts.
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Lifecycle",
        about = "Initialize the project store",
        after_help = "EXAMPLES:\n    # Initialize the default store\n    mb init\n\n    # Use an explicit store directory\n    mb init --data-dir ./store"
    )]
    Init,

    #[command(
        next_help_heading = "Lifecycle",
        about = "Create a new work and open it",
        after_help = "EXAMPLES:\n    # Create a named work\n    mb create --name \"Quarter test\" --subject math\n\n    # Emit machine-readable output\n    mb create --name \"Quarter test\" --json"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Read",
        about = "List works",
        after_help = "EXAMPLES:\n    # List everything, newest first\n    mb list\n\n    # Filter and sort\n    mb list --status active --sort name --asc"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Open a work",
        after_help = "EXAMPLES:\n    # Open by name\n    mb open \"Quarter test\"\n\n    # Open by id prefix\n    mb open 3f2a"
    )]
    Open(cmd::open::OpenArgs),

    #[command(
        next_help_heading = "Editing",
        about = "Manage the current work's task list",
        after_help = "EXAMPLES:\n    # Append a 2-point task\n    mb task add --max-score 2"
    )]
    Task(cmd::task::TaskArgs),

    #[command(
        next_help_heading = "Editing",
        about = "Manage the current work's roster",
        after_help = "EXAMPLES:\n    # Add a student\n    mb roster add \"A. Ivanov\""
    )]
    Roster(cmd::roster::RosterArgs),

    #[command(
        next_help_heading = "Editing",
        about = "Record a score in the current work",
        after_help = "EXAMPLES:\n    # Student 0, task 0, two points\n    mb record --student 0 --task 0 --score 2\n\n    # Address the student by name\n    mb record --student \"A. Ivanov\" --task 1 --score 1"
    )]
    Record(cmd::record::RecordArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Delete a work",
        after_help = "EXAMPLES:\n    # Delete with confirmation\n    mb delete \"Quarter test\"\n\n    # Skip the prompt\n    mb delete \"Quarter test\" --yes"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Duplicate a work",
        after_help = "EXAMPLES:\n    # Copy a work without opening it\n    mb dup \"Quarter test\""
    )]
    Dup(cmd::dup::DupArgs),

    #[command(
        next_help_heading = "Transfer",
        about = "Import works from export files",
        after_help = "EXAMPLES:\n    # Import one or more files\n    mb import backup.json more.json"
    )]
    Import(cmd::import::ImportArgs),

    #[command(
        next_help_heading = "Transfer",
        about = "Export works to a file",
        after_help = "EXAMPLES:\n    # Export everything\n    mb export --output backup.json\n\n    # Export one work\n    mb export \"Quarter test\" --output quarter.json"
    )]
    Export(cmd::export::ExportArgs),

    #[command(
        next_help_heading = "Diagnostics",
        about = "Show storage and current-work statistics"
    )]
    Stats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mode = cli.output_mode();
    let mut ctx = cmd::Ctx::build(cli.data_dir.as_deref(), cli.yes, mode)?;

    match &cli.command {
        Commands::Init => cmd::init::run(&ctx),
        Commands::Create(args) => cmd::create::run(&mut ctx, args),
        Commands::List(args) => cmd::list::run(&ctx, args),
        Commands::Open(args) => cmd::open::run(&mut ctx, args),
        Commands::Task(args) => cmd::task::run(&mut ctx, args),
        Commands::Roster(args) => cmd::roster::run(&mut ctx, args),
        Commands::Record(args) => cmd::record::run(&mut ctx, args),
        Commands::Delete(args) => cmd::delete::run(&mut ctx, args),
        Commands::Dup(args) => cmd::dup::run(&mut ctx, args),
        Commands::Import(args) => cmd::import::run(&mut ctx, args),
        Commands::Export(args) => cmd::export::run(&ctx, args),
        Commands::Stats => cmd::stats::run(&ctx),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("MB_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
