// Copyright (c) 2024 Shroud Foundation

use anyhow::{Context, Result};
use std::path::Path;

use super::open_ledger;

/// Sample a ring for a committed output
pub fn run(config_path: &Path, real_index: u64, uniform: bool) -> Result<()> {
    let (_, ledger) = open_ledger(config_path)?;

    let (ring, position) = if uniform {
        ledger.select_mixins_uniform(real_index)
    } else {
        ledger.select_mixins(real_index)
    }
    .with_context(|| format!("Failed to sample a ring for output {}", real_index))?;

    println!("Real output {} at position {}", real_index, position);
    for (i, member) in ring.iter().enumerate() {
        let marker = if i == position { " *" } else { "" };
        println!("{:3}. {}{}", i, member.global_index, marker);
    }

    Ok(())
}
