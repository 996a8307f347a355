//! Listing tree CLI - ltree command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;
mod util;

pub use cli_lib::{store, system_config};

use cmd::plan::PlanKind;

/// ltree - Reconcile listing-group partition trees
#[derive(Parser)]
#[command(name = "ltree")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Store file (default: $DATA_DIR/ltree/store.json)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a stored tree, or list owners when none is given
    Show {
        /// Owner of the tree (e.g. customers/1/adGroups/7)
        owner: Option<String>,
    },
    /// Preview the operations a pass would submit
    #[command(subcommand)]
    Plan(PlanCommands),
    /// Exclude item ids under every terminal subdivision
    Exclude {
        owner: String,
        /// Ad group label (must be in planner.allowed_labels)
        #[arg(short, long)]
        label: String,
        /// Item ids, separated by spaces, commas, semicolons or pipes
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Restrict the tree to exactly the given item ids
    Include {
        owner: String,
        /// Item ids, separated by spaces, commas, semicolons or pipes
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Remove an owner's whole tree
    Clear {
        owner: String,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Replace an owner's tree with node records from a JSON file
    Import { owner: String, file: PathBuf },
    /// Write an owner's node records as JSON
    Export {
        owner: String,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// View and edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Preview an exclusion pass
    Exclude {
        owner: String,
        #[arg(short, long)]
        label: String,
        #[arg(required = true)]
        ids: Vec<String>,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Preview an inclusion pass
    Include {
        owner: String,
        #[arg(required = true)]
        ids: Vec<String>,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// Show the config file path
    Path {
        /// Create the file with defaults if missing
        #[arg(long)]
        create: bool,
    },
    /// Show an annotated example configuration
    Example,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = cli.store;
    match cli.command {
        Commands::Show { owner } => cmd::show::run(store, owner).await,
        Commands::Plan(plan_cmd) => match plan_cmd {
            PlanCommands::Exclude { owner, label, ids, json } => {
                cmd::plan::run(store, &owner, PlanKind::Exclude { label }, &ids, json).await
            }
            PlanCommands::Include { owner, ids, json } => {
                cmd::plan::run(store, &owner, PlanKind::Include, &ids, json).await
            }
        },
        Commands::Exclude { owner, label, ids } => {
            cmd::sync::run_exclude(store, &owner, &label, &ids).await
        }
        Commands::Include { owner, ids } => cmd::sync::run_include(store, &owner, &ids).await,
        Commands::Clear { owner, yes } => cmd::clear::run(store, &owner, yes).await,
        Commands::Import { owner, file } => cmd::import::run_import(store, &owner, &file).await,
        Commands::Export { owner, output } => {
            cmd::import::run_export(store, &owner, output.as_deref()).await
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list().await,
            ConfigCommands::Get { key } => cmd::config::run_get(&key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(&key, &value).await,
            ConfigCommands::Path { create } => cmd::config::run_path(create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
    }
}
