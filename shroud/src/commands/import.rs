// Copyright (c) 2024 Shroud Foundation

use anyhow::{Context, Result};
use shroud_crypto_primitives::StandardVerifier;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::open_ledger;
use crate::block::Block;
use crate::consensus::ValidationCache;
use crate::mempool::new_shared_mempool;

/// Validate and commit a bincode-encoded `Vec<Block>`
pub fn run(config_path: &Path, blocks_path: &Path) -> Result<()> {
    let (config, ledger) = open_ledger(config_path)?;

    let bytes = fs::read(blocks_path)
        .with_context(|| format!("Failed to read blocks from {}", blocks_path.display()))?;
    let blocks: Vec<Block> = bincode::deserialize(&bytes)
        .with_context(|| format!("Failed to decode blocks from {}", blocks_path.display()))?;
    info!(count = blocks.len(), "Importing blocks");

    let validation = config.validation.to_validation_config()?;
    let mempool = new_shared_mempool(config.mempool, validation.limits);
    let cache = ValidationCache::new(ledger, mempool, Arc::new(StandardVerifier), validation);

    let outcome = cache.validate_and_commit_blocks(&blocks);

    println!("Committed: {} block(s)", outcome.committed_blocks.len());
    if let (Some(first), Some(last)) = (
        outcome.committed_blocks.first(),
        outcome.committed_blocks.last(),
    ) {
        println!("  Heights {}..={}", first, last);
    }
    if !outcome.ok {
        if let Some(height) = outcome.failing_height {
            println!("Failed at height {}", height);
        }
        if let Some(error) = &outcome.error {
            println!("  Reason: {}", error.source);
            if let Some(position) = error.tx_position {
                println!("  Transaction position: {}", position);
            }
        }
        println!("To refetch: {:?}", outcome.blocks_to_refetch);
    }

    let state = cache.ledger().chain_state();
    println!("Height now: {}", state.counters.height);

    Ok(())
}
