// Copyright (c) 2024 Shroud Foundation

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::ledger::Ledger;

/// Run the init command
pub fn run(config_path: &Path) -> Result<()> {
    if Config::exists(config_path) {
        bail!(
            "Config already exists at {}\nUse a different --config path or delete the existing config.",
            config_path.display()
        );
    }

    let config = Config::default();
    config.save(config_path)?;

    let ledger_path = config.ledger_path(config_path);
    Ledger::open_with_map_size(&ledger_path, config.map_size_bytes())
        .with_context(|| format!("Failed to create ledger at {}", ledger_path.display()))?;

    info!("Initialized at {}", config_path.display());
    println!("Config saved to: {}", config_path.display());
    println!("Ledger created at: {}", ledger_path.display());
    println!("\nNext steps:");
    println!("  1. Add authority keys under [validation] in the config");
    println!("  2. Run 'shroud import <FILE>' to load blocks");

    Ok(())
}
