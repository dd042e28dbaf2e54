// Copyright (c) 2024 Shroud Foundation

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use shroud::{commands, config, telemetry};

#[derive(Parser)]
#[command(name = "shroud")]
#[command(about = "Validation core of a confidential-transaction ledger", long_about = None)]
struct Cli {
    /// Path to config file (default: <config dir>/shroud/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and create the ledger
    Init,

    /// Show chain state
    Status,

    /// Validate and commit blocks from a file
    Import {
        /// Bincode-encoded list of blocks
        file: PathBuf,
    },

    /// Sample a ring for a committed output
    Mixins {
        /// Global index of the real output
        index: u64,

        /// Draw every decoy from the skewed distribution
        #[arg(long)]
        uniform: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(config::default_config_path);

    // The configured level is only known once the config loads.
    let level = config::Config::load(&config_path)
        .map(|c| c.logging.level)
        .unwrap_or_else(|_| "info".to_string());
    telemetry::init_tracing(&level, cli.verbose)?;

    match cli.command {
        Commands::Init => commands::init::run(&config_path),
        Commands::Status => commands::status::run(&config_path),
        Commands::Import { file } => commands::import::run(&config_path, &file),
        Commands::Mixins { index, uniform } => commands::mixins::run(&config_path, index, uniform),
    }
}
