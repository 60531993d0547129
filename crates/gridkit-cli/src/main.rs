//! Gridkit CLI.
//!
//! Runs declarative grid requests (filter, sort, page, group, aggregate)
//! over JSON record files.
//!
//! # Quick Start
//!
//! ```bash
//! # Run a request against a record file
//! gridkit run --schema schema.toml --type Employee --records employees.json --request request.json
//!
//! # Read the request from stdin, single-line output
//! echo '{"take": 10}' | gridkit run --schema schema.toml --type Employee --records employees.json --compact
//!
//! # Show the effective configuration
//! gridkit config show
//! ```

mod commands;
mod schema;
mod style;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gridkit_config::{ConfigLoader, GridkitConfig};
use tracing_subscriber::EnvFilter;

use commands::run::RunArgs;

/// Gridkit - declarative data-grid queries over JSON records.
#[derive(Parser)]
#[command(name = "gridkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory holding gridkit.toml.
    #[arg(long, global = true, default_value = ".")]
    project: PathBuf,

    /// Use this config file instead of the layered sources.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Execute a request over a JSON array of records.
    Run {
        /// Schema file (TOML) declaring the record types.
        #[arg(long)]
        schema: PathBuf,

        /// Record type of the records.
        #[arg(long = "type")]
        record_type: String,

        /// JSON file holding an array of records.
        #[arg(long)]
        records: PathBuf,

        /// Request JSON file, or - for stdin.
        #[arg(long, default_value = "-")]
        request: String,

        /// Print single-line JSON.
        #[arg(long)]
        compact: bool,
    },

    /// Configuration commands.
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration.
    Show {
        /// Output format (toml, json, text).
        #[arg(short, long, default_value = "toml")]
        format: String,
    },

    /// Check the effective configuration.
    Validate,
}

fn load_config(cli: &Cli) -> Result<GridkitConfig> {
    match &cli.config {
        Some(path) => GridkitConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => ConfigLoader::new().with_project_dir(&cli.project).load(),
    }
}

fn init_logging(config: &GridkitConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        style::print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    style::set_no_color(cli.no_color);

    let config = load_config(&cli)?;
    init_logging(&config);

    match cli.command {
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
        Commands::Run {
            schema,
            record_type,
            records,
            request,
            compact,
        } => {
            let args = RunArgs {
                schema,
                record_type,
                records,
                request,
                compact,
            };
            commands::run::run(&config, args).await
        }
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show { format } => commands::config::show(&config, &format),
            ConfigCommands::Validate => commands::config::validate(&config),
        },
    }
}
