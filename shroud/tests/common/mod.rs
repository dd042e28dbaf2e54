// Copyright (c) 2024 Shroud Foundation

#![allow(dead_code)]

use ed25519_dalek::SigningKey;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use shroud::block::{Block, BlockHeader, BLOCK_VERSION};
use shroud::consensus::{ValidationCache, ValidationConfig};
use shroud::ledger::{counter_updates, index_key, output_key, Ledger, LedgerCounters, Table, UpdateEntry};
use shroud::mempool::{new_shared_mempool, MempoolConfig};
use shroud::transaction::builder::{address_of, build_coinbase, OwnedOutput};
use shroud::transaction::{Transaction, TransparentOutput};
use shroud_crypto_primitives::{ProofVerifier, RangeProofKind};
use std::sync::Arc;
use tempfile::TempDir;

/// Outputs per seeding batch
const SEED_BATCH: u64 = 100_000;

/// Distinct decoy outputs cycled through when seeding
const DECOY_POOL: usize = 256;

pub const GENESIS_TIMESTAMP: u64 = 1_000;

pub struct TestChain {
    _dir: TempDir,
    pub cache: ValidationCache,
    pub authority: SigningKey,
    pub rng: ChaCha20Rng,
}

impl TestChain {
    pub fn new(verifier: Arc<dyn ProofVerifier>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(Ledger::open(dir.path()).unwrap());
        let authority = SigningKey::from_bytes(&[42u8; 32]);
        let config = ValidationConfig {
            authorities: vec![authority.verifying_key().to_bytes()],
            ..ValidationConfig::default()
        };
        let mempool = new_shared_mempool(MempoolConfig::default(), config.limits);

        Self {
            _dir: dir,
            cache: ValidationCache::new(ledger, mempool, verifier, config),
            authority,
            rng: ChaCha20Rng::seed_from_u64(1234),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        self.cache.ledger()
    }

    /// Header of the current tip, if any.
    pub fn tip_header(&self) -> Option<BlockHeader> {
        let height = u64::try_from(self.ledger().counters().height).ok()?;
        Some(self.ledger().get_header(height).unwrap())
    }

    /// Write `count` committed outputs and a synthetic tip at `height`
    /// directly to the store. `owned` places real outputs at chosen indices.
    pub fn seed_outputs(&mut self, count: u64, height: i64, owned: &[(u64, &OwnedOutput)]) {
        let decoys: Vec<_> = (0..DECOY_POOL)
            .map(|_| OwnedOutput::random(1, &mut self.rng).output)
            .collect();

        let mut start = 0;
        while start < count {
            let end = (start + SEED_BATCH).min(count);
            let updates: Vec<UpdateEntry> = (start..end)
                .map(|index| {
                    let mut output = owned
                        .iter()
                        .find(|(at, _)| *at == index)
                        .map(|(_, o)| o.output.clone())
                        .unwrap_or_else(|| decoys[index as usize % DECOY_POOL].clone());
                    output.global_index = index;
                    UpdateEntry::add(
                        Table::Outputs,
                        output_key(index).unwrap(),
                        bincode::serialize(&output).unwrap(),
                    )
                })
                .collect();
            self.ledger().flush(&updates).unwrap();
            start = end;
        }

        let mut tip = BlockHeader {
            version: BLOCK_VERSION,
            timestamp: GENESIS_TIMESTAMP,
            height,
            fee: 0,
            previous_block: [0u8; 32],
            block_hash: [0u8; 32],
            merkle_root: [0u8; 32],
            num_txs: 0,
            block_size: 0,
            num_outputs: 0,
            extra: Vec::new(),
        };
        tip.block_hash = tip.compute_hash();

        let counters = LedgerCounters {
            height,
            tx_index: 0,
            output_index: count,
        };
        let mut updates = vec![UpdateEntry::add(
            Table::Headers,
            index_key(height as u64),
            bincode::serialize(&tip).unwrap(),
        )];
        updates.extend(counter_updates(&counters, &tip.block_hash, tip.timestamp));
        self.ledger().flush(&updates).unwrap();
    }

    /// A committed transparent output spendable by `owner`. Its producing
    /// transaction is indexed so that spends of it are not taken for orphans.
    pub fn fund_transparent(&self, owner: &SigningKey, tag: u8, amount: u64) -> TransparentOutput {
        let mut output = TransparentOutput::new(address_of(owner), amount);
        output.tx_id = [tag; 32];
        self.ledger()
            .flush(&[
                UpdateEntry::add(
                    Table::TransparentOutputs,
                    output.location().to_bytes(),
                    bincode::serialize(&output).unwrap(),
                ),
                UpdateEntry::add(Table::TxIndex, output.tx_id, index_key(u64::MAX - tag as u64)),
            ])
            .unwrap();
        output
    }

    pub fn coinbase(&mut self, amount: u64) -> Transaction {
        build_coinbase(&[amount], RangeProofKind::Plus, Vec::new(), &mut self.rng)
            .unwrap()
            .tx
    }

    /// A signed block on the tip: a fresh coinbase followed by `transactions`.
    pub fn next_block(&mut self, transactions: Vec<Transaction>) -> Block {
        let mut all = vec![self.coinbase(50)];
        all.extend(transactions);

        let parent = self.tip_header();
        let timestamp = parent.as_ref().map_or(GENESIS_TIMESTAMP, |p| p.timestamp + 1);
        let mut block = Block::new(parent.as_ref(), all, timestamp);
        block.sign(&self.authority);
        block
    }
}
