// Copyright (c) 2024 Shroud Foundation

use anyhow::Result;
use std::path::Path;

use super::open_ledger;

/// Show chain state and pool settings
pub fn run(config_path: &Path) -> Result<()> {
    let (config, ledger) = open_ledger(config_path)?;
    let state = ledger.chain_state();

    println!();
    println!("=== Shroud Status ===");
    println!();
    println!("Chain:");
    if state.counters.height < 0 {
        println!("  Height: (empty)");
    } else {
        println!("  Height: {}", state.counters.height);
        println!("  Tip hash: {}", hex::encode(state.tip_hash));
        println!("  Tip timestamp: {}", state.tip_timestamp);
        let tip = ledger.get_block(state.counters.height as u64)?;
        println!("  Tip transactions: {}", tip.transactions.len());
    }
    println!("  Transactions: {}", state.counters.tx_index);
    println!("  Outputs: {}", state.counters.output_index);
    println!();
    println!("Validation:");
    println!("  Authorities: {}", config.validation.authorities.len());
    println!(
        "  Max inputs/outputs: {}/{}",
        config.validation.max_inputs, config.validation.max_outputs
    );
    println!(
        "  Max future drift: {}s",
        config.validation.max_future_drift_secs
    );
    println!();
    println!("Mempool:");
    println!("  Max transactions: {}", config.mempool.max_transactions);
    println!("  Max orphans: {}", config.mempool.max_orphans);
    println!("  Block template bytes: {}", config.mempool.max_block_bytes);
    println!("  Max age: {}s", config.mempool.max_age_secs);
    println!();

    Ok(())
}
