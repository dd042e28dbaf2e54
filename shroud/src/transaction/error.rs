// Copyright (c) 2024 Shroud Foundation

//! Typed validation outcomes shared by the mempool and the block validator.

use super::{OutputRef, TxHash};
use crate::ledger::LedgerError;
use shroud_crypto_primitives::KeyImage;
use thiserror::Error;

/// Malformed layout, detected before any cryptography runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("coinbase transaction outside the first block slot")]
    UnexpectedCoinbase,

    #[error("first block slot must hold a coinbase transaction")]
    ExpectedCoinbase,

    #[error("unsupported version {0}")]
    UnsupportedVersion(u8),

    #[error("{field}: declared {declared}, found {actual}")]
    CountMismatch {
        field: &'static str,
        declared: usize,
        actual: usize,
    },

    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("{field}: {count} exceeds the limit of {max}")]
    TooMany {
        field: &'static str,
        count: usize,
        max: usize,
    },

    #[error("ring has {0} members")]
    RingSize(usize),

    #[error("ring lists output {0} twice")]
    DuplicateRingMember(u64),

    #[error("private outputs need a range proof")]
    MissingRangeProof,

    #[error("both range proof kinds present")]
    ConflictingRangeProofs,

    #[error("range proof without private outputs")]
    UnexpectedRangeProof,

    #[error("transaction key must be present exactly when there are private outputs")]
    TxKeyMismatch,

    #[error("output {0} has a zero amount")]
    ZeroAmount(usize),

    #[error("output {0} commits to the identity")]
    IdentityCommitment(usize),

    #[error("key image {0} repeats within the transaction")]
    DuplicateKeyImage(KeyImage),

    #[error("input {0} repeats within the transaction")]
    DuplicateInput(OutputRef),

    #[error("cached signing hash is stale")]
    SigningHashMismatch,

    #[error("ring member {0} does not exist")]
    MissingRingMember(u64),

    #[error("block carries no transactions")]
    EmptyBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureFault {
    #[error("ring signature on input {0}")]
    Ring(usize),

    #[error("transparent signature on input {0}")]
    Transparent(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DoubleSpendFault {
    #[error("key image {0} already spent")]
    KeyImageSpent(KeyImage),

    #[error("key image {0} already used by a pooled transaction")]
    KeyImageInPool(KeyImage),

    #[error("output {0} already spent or never created")]
    TransparentOutputSpent(OutputRef),

    #[error("output {0} already used by a pooled transaction")]
    TransparentOutputInPool(OutputRef),

    #[error("transaction {} already committed or earlier in the block", hex::encode(.0))]
    TransactionReplayed(TxHash),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainFault {
    #[error("height {got}, expected {expected}")]
    Height { expected: i64, got: i64 },

    #[error("previous block hash does not match the tip")]
    PreviousHash,

    #[error("timestamp {timestamp} is beyond {limit}")]
    TimestampInFuture { timestamp: u64, limit: u64 },

    #[error("timestamp {timestamp} precedes parent timestamp {parent}")]
    TimestampBeforeParent { timestamp: u64, parent: u64 },

    #[error("block hash does not match header contents")]
    BlockHash,

    #[error("merkle root mismatch")]
    MerkleRoot,

    #[error("authority signature invalid")]
    AuthoritySignature,

    #[error("header {field} is {declared}, transactions give {actual}")]
    HeaderTotals {
        field: &'static str,
        declared: u64,
        actual: u64,
    },
}

/// Why a transaction or block was not accepted.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("structural: {0}")]
    Structural(#[from] StructuralError),

    #[error("commitments do not balance")]
    Balance,

    #[error("range proof rejected")]
    Proof,

    #[error("invalid {0}")]
    Signature(SignatureFault),

    #[error("double spend: {0}")]
    DoubleSpend(DoubleSpendFault),

    #[error("waiting on transaction {}", hex::encode(.missing))]
    OrphanPending { missing: TxHash },

    #[error("chain consistency: {0}")]
    ChainConsistency(ChainFault),

    #[error("storage: {0}")]
    Storage(#[from] LedgerError),
}

impl ValidationError {
    /// Storage faults say nothing about the transaction itself.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ValidationError::Storage(_))
    }
}

impl From<ChainFault> for ValidationError {
    fn from(fault: ChainFault) -> Self {
        ValidationError::ChainConsistency(fault)
    }
}

impl From<DoubleSpendFault> for ValidationError {
    fn from(fault: DoubleSpendFault) -> Self {
        ValidationError::DoubleSpend(fault)
    }
}
