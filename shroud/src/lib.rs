// Copyright (c) 2024 Shroud Foundation

//! Shroud ledger core - validation and state transition for a
//! confidential-transaction ledger.
//!
//! This library provides the transaction model, the LMDB-backed ledger, the
//! mempool and the block validator that commits blocks to the ledger.

#![deny(clippy::print_stdout)]

pub mod block;
pub mod config;
pub mod consensus;
pub mod decoy_selection;
pub mod ledger;
pub mod mempool;
pub mod telemetry;
pub mod transaction;

// Re-export commands module for CLI binary
pub mod commands;
