// Copyright (c) 2024 Shroud Foundation

//! Block validation and commit.
//!
//! This module provides:
//! - ValidationCache: validates blocks against the ledger and commits them
//! - ValidationConfig: limits, clock drift and the authority key set
//! - SyncOutcome: the result of committing a batch of blocks during sync

mod validation;

pub use validation::{BlockError, SyncOutcome, ValidationCache, ValidationConfig};
