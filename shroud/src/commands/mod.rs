// Copyright (c) 2024 Shroud Foundation

//! CLI command implementations.
//!
//! These modules implement the user-facing CLI commands and legitimately
//! use stdout for output.

#![allow(clippy::print_stdout)]

pub mod import;
pub mod init;
pub mod mixins;
pub mod status;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::ledger::Ledger;

/// Load the config and open the ledger it points at.
fn open_ledger(config_path: &Path) -> Result<(Config, Arc<Ledger>)> {
    let config = Config::load(config_path).context("No config found. Run 'shroud init' first.")?;
    let ledger_path = config.ledger_path(config_path);
    let ledger = Ledger::open_with_map_size(&ledger_path, config.map_size_bytes())
        .with_context(|| format!("Failed to open ledger at {}", ledger_path.display()))?;
    Ok((config, Arc::new(ledger)))
}
