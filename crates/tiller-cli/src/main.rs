mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tiller",
    about = "Workflow engine for markdown planning documents",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from tiller.yaml or .git/)
    #[arg(long, global = true, env = "TILLER_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the workflow catalog
    List,

    /// Run a workflow against the planning documents
    Run {
        /// Workflow name (see `tiller list`)
        workflow: String,

        /// Apply every proposal without previewing
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Show which planning documents are present
    Status,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::List => cmd::list::run(&root, cli.json),
        Commands::Run { workflow, yes } => cmd::run::run(&root, &workflow, yes, cli.json),
        Commands::Status => cmd::status::run(&root, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
