// Copyright (c) 2024 Shroud Foundation

//! Block validation for consensus.
//!
//! Cheap header checks run first, then a sequential pass resolves every
//! transaction against a [`BlockOverlay`], and only then is the
//! cryptography verified, in parallel. Nothing is written unless the whole
//! block passes.

use rayon::prelude::*;
use shroud_crypto_primitives::ProofVerifier;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::block::{merkle_root, totals, Block, BLOCK_VERSION};
use crate::ledger::{BlockOverlay, Ledger, UpdateEntry};
use crate::mempool::{Admission, MempoolError, SharedMempool};
use crate::transaction::{
    ChainFault, DoubleSpendFault, InputSource, ResolvedInputs, StructuralError, Transaction,
    TxHash, TxLimits, ValidationError,
};

/// Maximum allowed timestamp drift from current time (2 hours)
pub const DEFAULT_MAX_FUTURE_DRIFT_SECS: u64 = 2 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationConfig {
    pub limits: TxLimits,
    pub max_future_drift_secs: u64,
    /// Ed25519 keys allowed to sign blocks. Empty rejects every block.
    pub authorities: Vec<[u8; 32]>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            limits: TxLimits::default(),
            max_future_drift_secs: DEFAULT_MAX_FUTURE_DRIFT_SECS,
            authorities: Vec::new(),
        }
    }
}

/// Why a block was rejected, and where.
#[derive(Debug, Error)]
#[error("block {height} rejected: {source}")]
pub struct BlockError {
    pub height: i64,
    /// Position of the offending transaction, if one is to blame
    pub tx_position: Option<usize>,
    pub tx_hash: Option<TxHash>,
    pub source: ValidationError,
}

impl BlockError {
    fn header(height: i64, source: impl Into<ValidationError>) -> Self {
        Self {
            height,
            tx_position: None,
            tx_hash: None,
            source: source.into(),
        }
    }

    fn at(height: i64, position: usize, tx: &Transaction, source: impl Into<ValidationError>) -> Self {
        Self {
            height,
            tx_position: Some(position),
            tx_hash: Some(tx.hash()),
            source: source.into(),
        }
    }
}

/// Result of [`ValidationCache::validate_and_commit_blocks`].
#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub ok: bool,
    pub failing_height: Option<i64>,
    pub committed_blocks: Vec<i64>,
    /// Heights from the failing block onward
    pub blocks_to_refetch: Vec<i64>,
    pub error: Option<BlockError>,
}

fn unix_now() -> u64 {
    // A clock before the epoch leaves only the drift allowance.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Validates blocks and transactions and commits them to the ledger.
///
/// Admission and commit both hold the mempool write lock, so a commit never
/// interleaves with an admission's check and record.
pub struct ValidationCache {
    ledger: Arc<Ledger>,
    mempool: SharedMempool,
    verifier: Arc<dyn ProofVerifier>,
    config: ValidationConfig,
}

impl ValidationCache {
    pub fn new(
        ledger: Arc<Ledger>,
        mempool: SharedMempool,
        verifier: Arc<dyn ProofVerifier>,
        config: ValidationConfig,
    ) -> Self {
        Self {
            ledger,
            mempool,
            verifier,
            config,
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn mempool(&self) -> &SharedMempool {
        &self.mempool
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a block against the current tip without committing it.
    pub fn validate_block(&self, block: &Block) -> Result<(), BlockError> {
        let _pool = self.mempool.read();
        self.check_block(block).map(|_| ()).map_err(log_rejection)
    }

    /// Validate a block and, if it passes, commit it and prune the mempool.
    pub fn validate_and_commit_block(&self, block: &Block) -> Result<(), BlockError> {
        let mut pool = self.mempool.write();
        let height = block.height();

        let updates = self.check_block(block).map_err(log_rejection)?;
        self.ledger
            .flush(&updates)
            .map_err(|e| log_rejection(BlockError::header(height, e)))?;

        info!(
            height,
            hash = %hex::encode(&block.hash()[0..8]),
            txs = block.transactions.len(),
            "Committed block"
        );

        pool.remove_confirmed(block, &self.ledger, self.verifier.as_ref());
        Ok(())
    }

    /// Commit blocks in order, stopping at the first that fails.
    pub fn validate_and_commit_blocks(&self, blocks: &[Block]) -> SyncOutcome {
        let mut outcome = SyncOutcome {
            ok: true,
            ..SyncOutcome::default()
        };

        for (i, block) in blocks.iter().enumerate() {
            match self.validate_and_commit_block(block) {
                Ok(()) => outcome.committed_blocks.push(block.height()),
                Err(e) => {
                    outcome.ok = false;
                    outcome.failing_height = Some(block.height());
                    outcome.blocks_to_refetch = blocks[i..].iter().map(Block::height).collect();
                    outcome.error = Some(e);
                    break;
                }
            }
        }

        debug!(
            committed = outcome.committed_blocks.len(),
            refetch = outcome.blocks_to_refetch.len(),
            "Processed block batch"
        );
        outcome
    }

    /// Submit a transaction to the mempool.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<Admission, MempoolError> {
        self.mempool
            .write()
            .submit(tx, &self.ledger, self.verifier.as_ref())
    }

    /// Pending transactions for the next block, oldest first.
    pub fn select_transactions_for_block(&self, max_bytes: u64) -> Vec<Transaction> {
        self.mempool.read().select_transactions(max_bytes)
    }

    /// Pending transactions for the next block under the mempool's
    /// configured byte budget.
    pub fn select_block_template(&self) -> Vec<Transaction> {
        self.mempool.read().select_for_block()
    }

    /// Run every check and return the updates that would commit the block.
    fn check_block(&self, block: &Block) -> Result<Vec<UpdateEntry>, BlockError> {
        let height = block.height();
        self.check_header(block)
            .map_err(|e| BlockError::header(height, e))?;

        // Sequential pass: structure, lookups and in-block spends
        let mut overlay = BlockOverlay::new(&self.ledger);
        let mut resolved: Vec<ResolvedInputs> = Vec::with_capacity(block.transactions.len());
        for (position, tx) in block.transactions.iter().enumerate() {
            tx.precheck(position == 0, &self.config.limits)
                .map_err(|e| BlockError::at(height, position, tx, e))?;
            let tx_hash = tx.hash();
            if overlay
                .knows_transaction(&tx_hash)
                .map_err(|e| BlockError::at(height, position, tx, e))?
            {
                let fault = DoubleSpendFault::TransactionReplayed(tx_hash);
                return Err(BlockError::at(height, position, tx, fault));
            }
            let inputs = tx
                .resolve_inputs(&overlay, true)
                .map_err(|e| BlockError::at(height, position, tx, e))?;
            overlay
                .apply(tx)
                .map_err(|e| BlockError::at(height, position, tx, e))?;
            resolved.push(inputs);
        }

        // Cryptography, reporting the earliest failing transaction
        let verifier = self.verifier.as_ref();
        let failure = block
            .transactions
            .par_iter()
            .zip(resolved.par_iter())
            .enumerate()
            .filter_map(|(position, (tx, inputs))| {
                tx.verify_resolved(inputs, verifier)
                    .err()
                    .map(|e| (position, e))
            })
            .min_by_key(|(position, _)| *position);
        if let Some((position, e)) = failure {
            return Err(BlockError::at(height, position, &block.transactions[position], e));
        }

        overlay
            .into_updates(&block.header)
            .map_err(|e| BlockError::header(height, e))
    }

    fn check_header(&self, block: &Block) -> Result<(), ValidationError> {
        let header = &block.header;
        let state = self.ledger.chain_state();

        if header.version != BLOCK_VERSION {
            return Err(StructuralError::UnsupportedVersion(header.version).into());
        }

        let expected = state.counters.height + 1;
        if header.height != expected {
            return Err(ChainFault::Height {
                expected,
                got: header.height,
            }
            .into());
        }
        if header.previous_block != state.tip_hash {
            return Err(ChainFault::PreviousHash.into());
        }

        let limit = unix_now().saturating_add(self.config.max_future_drift_secs);
        if header.timestamp > limit {
            return Err(ChainFault::TimestampInFuture {
                timestamp: header.timestamp,
                limit,
            }
            .into());
        }
        if state.counters.height >= 0 && header.timestamp < state.tip_timestamp {
            return Err(ChainFault::TimestampBeforeParent {
                timestamp: header.timestamp,
                parent: state.tip_timestamp,
            }
            .into());
        }

        if block.transactions.is_empty() {
            return Err(StructuralError::EmptyBlock.into());
        }
        if header.num_txs as usize != block.transactions.len() {
            return Err(StructuralError::CountMismatch {
                field: "num_txs",
                declared: header.num_txs as usize,
                actual: block.transactions.len(),
            }
            .into());
        }

        let (fee, block_size, num_outputs) = totals(&block.transactions);
        for (field, declared, actual) in [
            ("fee", header.fee, fee),
            ("block_size", u64::from(header.block_size), block_size),
            ("num_outputs", u64::from(header.num_outputs), num_outputs),
        ] {
            if declared != actual {
                return Err(ChainFault::HeaderTotals {
                    field,
                    declared,
                    actual,
                }
                .into());
            }
        }

        if header.compute_hash() != header.block_hash {
            return Err(ChainFault::BlockHash.into());
        }
        if merkle_root(&block.tx_hashes()) != header.merkle_root {
            return Err(ChainFault::MerkleRoot.into());
        }
        if !header.verify_authority(&self.config.authorities, self.verifier.as_ref()) {
            return Err(ChainFault::AuthoritySignature.into());
        }

        Ok(())
    }
}

fn log_rejection(e: BlockError) -> BlockError {
    warn!(
        height = e.height,
        tx_position = ?e.tx_position,
        tx = ?e.tx_hash.map(|h| hex::encode(&h[0..8])),
        reason = %e.source,
        "Rejected block"
    );
    e
}
