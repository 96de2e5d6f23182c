mod batch_file;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mnemo_config::PipelineConfig;

#[derive(Debug, Parser)]
#[command(name = "mnemo", version, about = "Semantic memory extraction pipeline")]
struct Cli {
    /// Path to the pipeline's TOML configuration file.
    #[arg(long, global = true, default_value = "config/mnemo.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a single chat turn read from a JSON batch file through the pipeline.
    Run {
        /// Path to a JSON file matching `batch_file::BatchFile`.
        path: String,
        /// Emit the full result (semantic units, proposition counts, timings) as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run a bounded worker pool over every `*.json` batch file in a directory.
    Worker {
        /// Directory to scan for batch files.
        dir: String,
        /// Overrides `worker.pool_size` from the configuration file.
        #[arg(long)]
        pool_size: Option<usize>,
    },
    /// Print archive and graph store counts.
    Stats,
    /// Look up a proposition's full lineage (message, semantic unit, proposition).
    Lineage {
        /// Proposition id (UUID).
        id: String,
    },
    /// Configuration commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Load the configuration file (applying environment overrides) and print it.
    Show,
    /// Load the configuration file and validate it, writing defaults if absent.
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = PipelineConfig::load_from(&cli.config)?;

    match cli.command {
        Commands::Run { path, json } => commands::run_batch(&config, &path, json).await?,
        Commands::Worker { dir, pool_size } => commands::run_worker(&config, &dir, pool_size).await?,
        Commands::Stats => commands::run_stats(&config).await?,
        Commands::Lineage { id } => commands::run_lineage(&config, &id)?,
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::config_show(&config)?,
            ConfigCommands::Validate => commands::config_validate(&config, &cli.config)?,
        },
    }

    Ok(())
}
