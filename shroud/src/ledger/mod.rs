// Copyright (c) 2024 Shroud Foundation

mod overlay;
mod store;

pub use overlay::BlockOverlay;
pub use store::Ledger;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::decoy_selection::DecoyError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] lmdb::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Output not found: index {0}")]
    OutputNotFound(u64),

    #[error("Block not found: height {0}")]
    BlockNotFound(u64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflicting {rule:?} on {table} key {key}")]
    Conflict {
        table: Table,
        rule: UpdateRule,
        key: String,
    },

    #[error("Output index {0} does not fit the output table key")]
    IndexOverflow(u64),

    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    #[error("Decoy selection failed: {0}")]
    Decoy(#[from] DecoyError),
}

impl From<bincode::Error> for LedgerError {
    fn from(e: bincode::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}

/// The three counters a commit advances together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCounters {
    /// Height of the tip, -1 while the ledger is empty
    pub height: i64,

    /// Next transaction id
    pub tx_index: u64,

    /// Next output global index, also the number of committed outputs
    pub output_index: u64,
}

impl Default for LedgerCounters {
    fn default() -> Self {
        Self {
            height: -1,
            tx_index: 0,
            output_index: 0,
        }
    }
}

/// Information about the current chain state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainState {
    pub counters: LedgerCounters,

    /// Hash of the tip block, zero while empty
    pub tip_hash: [u8; 32],

    /// Timestamp of the tip block
    pub tip_timestamp: u64,
}

/// Named LMDB databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// global index (BE u32) -> PrivateOutput
    Outputs,
    /// key image -> empty
    SpentKeys,
    /// OutputRef (33 bytes) -> TransparentOutput
    TransparentOutputs,
    /// tx id (BE u64) -> Transaction
    Transactions,
    /// tx hash -> tx id (BE u64)
    TxIndex,
    /// height (BE u64) -> Block
    Blocks,
    /// height (BE u64) -> BlockHeader
    Headers,
    /// block hash -> height (BE u64)
    BlockIndex,
    /// counter name -> value
    Meta,
}

impl Table {
    pub const ALL: [Table; 9] = [
        Table::Outputs,
        Table::SpentKeys,
        Table::TransparentOutputs,
        Table::Transactions,
        Table::TxIndex,
        Table::Blocks,
        Table::Headers,
        Table::BlockIndex,
        Table::Meta,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Outputs => "outputs",
            Table::SpentKeys => "spent_keys",
            Table::TransparentOutputs => "transparent_outputs",
            Table::Transactions => "transactions",
            Table::TxIndex => "tx_index",
            Table::Blocks => "blocks",
            Table::Headers => "headers",
            Table::BlockIndex => "block_index",
            Table::Meta => "meta",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateRule {
    /// Insert; the key must not exist
    Add,
    /// Remove; the key must exist
    Del,
    /// Insert or overwrite
    Update,
}

/// One mutation in a batch applied by [`Ledger::flush`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEntry {
    pub table: Table,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub rule: UpdateRule,
}

impl UpdateEntry {
    pub fn add(table: Table, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            table,
            key: key.into(),
            value: value.into(),
            rule: UpdateRule::Add,
        }
    }

    pub fn del(table: Table, key: impl Into<Vec<u8>>) -> Self {
        Self {
            table,
            key: key.into(),
            value: Vec::new(),
            rule: UpdateRule::Del,
        }
    }

    pub fn update(table: Table, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            table,
            key: key.into(),
            value: value.into(),
            rule: UpdateRule::Update,
        }
    }
}

// Metadata keys
pub(crate) const META_HEIGHT: &[u8] = b"height";
pub(crate) const META_TX_INDEX: &[u8] = b"tx_index";
pub(crate) const META_OUTPUT_INDEX: &[u8] = b"output_index";
pub(crate) const META_TIP_HASH: &[u8] = b"tip_hash";
pub(crate) const META_TIP_TIMESTAMP: &[u8] = b"tip_timestamp";

/// Output table key: the global index as a big-endian u32.
pub fn output_key(index: u64) -> Result<[u8; 4], LedgerError> {
    u32::try_from(index)
        .map(u32::to_be_bytes)
        .map_err(|_| LedgerError::IndexOverflow(index))
}

/// Transaction, block and header table key: big-endian u64.
pub fn index_key(index: u64) -> [u8; 8] {
    index.to_be_bytes()
}

/// The counter entries a commit writes, as `Update`s on the meta table.
pub fn counter_updates(
    counters: &LedgerCounters,
    tip_hash: &[u8; 32],
    tip_timestamp: u64,
) -> [UpdateEntry; 5] {
    [
        UpdateEntry::update(Table::Meta, META_HEIGHT, counters.height.to_be_bytes()),
        UpdateEntry::update(Table::Meta, META_TX_INDEX, counters.tx_index.to_be_bytes()),
        UpdateEntry::update(Table::Meta, META_OUTPUT_INDEX, counters.output_index.to_be_bytes()),
        UpdateEntry::update(Table::Meta, META_TIP_HASH, tip_hash.to_vec()),
        UpdateEntry::update(Table::Meta, META_TIP_TIMESTAMP, tip_timestamp.to_be_bytes()),
    ]
}
