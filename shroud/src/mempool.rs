// Copyright (c) 2024 Shroud Foundation

//! Transaction mempool for storing pending transactions.
//!
//! Admission walks `Received → StructurallyChecked → {Orphaned | Rejected |
//! Admitted}`. An admitted transaction's key images, spent transparent inputs
//! and produced transparent outputs are tracked so later submissions see
//! them as consumed or available. Transactions whose transparent inputs
//! point at an unseen transaction are parked until it is admitted.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shroud_crypto_primitives::{KeyImage, ProofVerifier};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

use crate::block::Block;
use crate::ledger::{Ledger, LedgerError};
use crate::transaction::{
    DoubleSpendFault, InputSource, OutputRef, PrivateOutput, Transaction, TransparentOutput,
    TxHash, TxLimits, ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// Maximum admitted transactions
    pub max_transactions: usize,
    /// Maximum parked orphans; the oldest is dropped beyond this
    pub max_orphans: usize,
    /// Byte budget for block templates
    pub max_block_bytes: u64,
    /// Age after which pending transactions are evicted
    pub max_age_secs: u64,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 10_000,
            max_orphans: 1_000,
            max_block_bytes: 1_048_576,
            max_age_secs: 86_400,
        }
    }
}

/// A pending transaction with metadata
#[derive(Debug, Clone)]
pub struct PendingTx {
    pub tx: Transaction,
    pub hash: TxHash,
    pub received_at: Instant,
    /// Receipt order
    pub sequence: u64,
    pub size: u64,
}

#[derive(Debug, Clone)]
struct Orphan {
    tx: Transaction,
    missing: TxHash,
    sequence: u64,
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Parked until `missing` is admitted.
    Orphaned { missing: TxHash },
}

/// Mempool errors
#[derive(Debug, Error)]
pub enum MempoolError {
    #[error("Transaction already in mempool")]
    AlreadyPooled,

    #[error("Transaction already committed")]
    AlreadyCommitted,

    #[error("Mempool is full")]
    PoolFull,

    #[error("Rejected: {0}")]
    Rejected(#[from] ValidationError),
}

impl From<LedgerError> for MempoolError {
    fn from(e: LedgerError) -> Self {
        MempoolError::Rejected(ValidationError::Storage(e))
    }
}

/// Transaction mempool
pub struct Mempool {
    config: MempoolConfig,
    limits: TxLimits,
    /// Pending transactions by hash
    txs: HashMap<TxHash, PendingTx>,
    /// Receipt order
    order: BTreeMap<u64, TxHash>,
    /// Key images consumed by pooled transactions
    key_images: HashMap<KeyImage, TxHash>,
    /// Transparent outputs consumed by pooled transactions
    spent_transparent: HashMap<OutputRef, TxHash>,
    /// Transparent outputs created by pooled transactions
    produced_transparent: HashMap<OutputRef, TransparentOutput>,
    orphans: HashMap<TxHash, Orphan>,
    /// Missing transaction -> orphans waiting on it
    orphans_by_missing: HashMap<TxHash, Vec<TxHash>>,
    next_sequence: u64,
}

/// The ledger as seen from the pool: committed state plus outputs produced
/// by pooled transactions.
struct PoolView<'a> {
    ledger: &'a Ledger,
    pool: &'a Mempool,
}

impl InputSource for PoolView<'_> {
    fn ring_members(&self, offsets: &[u64]) -> Result<Vec<PrivateOutput>, LedgerError> {
        self.ledger.get_mixins(offsets)
    }

    fn is_key_image_unspent(&self, key_image: &KeyImage) -> Result<bool, LedgerError> {
        self.ledger.check_spent_key(key_image)
    }

    fn transparent_output(
        &self,
        reference: &OutputRef,
    ) -> Result<Option<TransparentOutput>, LedgerError> {
        match self.pool.produced_transparent.get(reference) {
            Some(output) => Ok(Some(output.clone())),
            None => self.ledger.get_pub_output(reference),
        }
    }

    fn knows_transaction(&self, tx_id: &TxHash) -> Result<bool, LedgerError> {
        Ok(self.pool.txs.contains_key(tx_id) || self.ledger.contains_transaction(tx_id)?)
    }
}

fn short(hash: &TxHash) -> String {
    hex::encode(&hash[0..8])
}

impl Mempool {
    /// Create a new empty mempool
    pub fn new(config: MempoolConfig, limits: TxLimits) -> Self {
        Self {
            config,
            limits,
            txs: HashMap::new(),
            order: BTreeMap::new(),
            key_images: HashMap::new(),
            spent_transparent: HashMap::new(),
            produced_transparent: HashMap::new(),
            orphans: HashMap::new(),
            orphans_by_missing: HashMap::new(),
            next_sequence: 0,
        }
    }

    pub fn config(&self) -> &MempoolConfig {
        &self.config
    }

    fn sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    /// Submit a transaction for admission.
    pub fn submit(
        &mut self,
        tx: Transaction,
        ledger: &Ledger,
        verifier: &dyn ProofVerifier,
    ) -> Result<Admission, MempoolError> {
        let tx_hash = tx.hash();

        if self.txs.contains_key(&tx_hash) || self.orphans.contains_key(&tx_hash) {
            return Err(MempoolError::AlreadyPooled);
        }
        if ledger.contains_transaction(&tx_hash)? {
            return Err(MempoolError::AlreadyCommitted);
        }
        if self.txs.len() >= self.config.max_transactions {
            return Err(MempoolError::PoolFull);
        }

        tx.precheck(false, &self.limits)
            .map_err(ValidationError::from)?;

        // Conflicts with other pooled transactions
        for key_image in tx.key_images() {
            if self.key_images.contains_key(key_image) {
                return Err(ValidationError::from(DoubleSpendFault::KeyImageInPool(*key_image)).into());
            }
        }
        for reference in tx.transparent_inputs() {
            if self.spent_transparent.contains_key(reference) {
                return Err(
                    ValidationError::from(DoubleSpendFault::TransparentOutputInPool(*reference))
                        .into(),
                );
            }
        }

        let view = PoolView { ledger, pool: self };
        let resolved = match tx.resolve_inputs(&view, false) {
            Ok(resolved) => resolved,
            Err(ValidationError::OrphanPending { missing }) => {
                self.park_orphan(tx_hash, tx, missing);
                return Ok(Admission::Orphaned { missing });
            }
            Err(e) => return Err(e.into()),
        };
        tx.verify_resolved(&resolved, verifier)?;

        self.admit(tx_hash, tx);
        self.promote_orphans(&tx_hash, ledger, verifier);
        Ok(Admission::Admitted)
    }

    fn admit(&mut self, tx_hash: TxHash, tx: Transaction) {
        for key_image in tx.key_images() {
            self.key_images.insert(*key_image, tx_hash);
        }
        for reference in tx.transparent_inputs() {
            self.spent_transparent.insert(*reference, tx_hash);
        }
        for output in tx.located_transparent_outputs() {
            self.produced_transparent.insert(output.location(), output);
        }

        let sequence = self.sequence();
        let size = tx.serialized_size();
        info!(
            tx = %short(&tx_hash),
            kind = %tx.kind(),
            fee = tx.fee(),
            size,
            "Admitted transaction"
        );
        self.order.insert(sequence, tx_hash);
        self.txs.insert(
            tx_hash,
            PendingTx {
                tx,
                hash: tx_hash,
                received_at: Instant::now(),
                sequence,
                size,
            },
        );
    }

    fn park_orphan(&mut self, tx_hash: TxHash, tx: Transaction, missing: TxHash) {
        if self.orphans.len() >= self.config.max_orphans {
            let oldest = self
                .orphans
                .iter()
                .min_by_key(|(_, orphan)| orphan.sequence)
                .map(|(hash, _)| *hash);
            if let Some(oldest) = oldest {
                self.remove_orphan(&oldest);
                debug!(tx = %short(&oldest), "Dropped oldest orphan");
            }
        }

        debug!(tx = %short(&tx_hash), missing = %short(&missing), "Parked orphan");
        let sequence = self.sequence();
        self.orphans_by_missing
            .entry(missing)
            .or_default()
            .push(tx_hash);
        self.orphans.insert(
            tx_hash,
            Orphan {
                tx,
                missing,
                sequence,
            },
        );
    }

    fn remove_orphan(&mut self, tx_hash: &TxHash) -> Option<Orphan> {
        let orphan = self.orphans.remove(tx_hash)?;
        if let Some(waiting) = self.orphans_by_missing.get_mut(&orphan.missing) {
            waiting.retain(|hash| hash != tx_hash);
            if waiting.is_empty() {
                self.orphans_by_missing.remove(&orphan.missing);
            }
        }
        Some(orphan)
    }

    /// Retry, depth-first, every orphan waiting on `parent`.
    fn promote_orphans(&mut self, parent: &TxHash, ledger: &Ledger, verifier: &dyn ProofVerifier) {
        let Some(waiting) = self.orphans_by_missing.remove(parent) else {
            return;
        };
        for child in waiting {
            let Some(orphan) = self.orphans.remove(&child) else {
                continue;
            };
            match self.submit(orphan.tx, ledger, verifier) {
                Ok(admission) => {
                    debug!(tx = %short(&child), ?admission, "Retried orphan");
                }
                Err(e) => {
                    debug!(tx = %short(&child), reason = %e, "Dropped orphan");
                }
            }
        }
    }

    /// Drop a transaction's tracking entries without touching its children.
    fn untrack(&mut self, tx_hash: &TxHash) -> Option<Transaction> {
        let pending = self.txs.remove(tx_hash)?;
        self.order.remove(&pending.sequence);
        for key_image in pending.tx.key_images() {
            self.key_images.remove(key_image);
        }
        for reference in pending.tx.transparent_inputs() {
            self.spent_transparent.remove(reference);
        }
        for output in pending.tx.located_transparent_outputs() {
            self.produced_transparent.remove(&output.location());
        }
        Some(pending.tx)
    }

    /// Remove a transaction along with every pooled descendant spending
    /// its transparent outputs, which could no longer be mined.
    pub fn remove_tx(&mut self, tx_hash: &TxHash) -> Option<Transaction> {
        let removed = self.untrack(tx_hash)?;

        let mut stack: Vec<TxHash> = self.children_of(&removed);
        while let Some(child) = stack.pop() {
            if let Some(tx) = self.untrack(&child) {
                debug!(tx = %short(&child), parent = %short(tx_hash), "Evicted descendant");
                stack.extend(self.children_of(&tx));
            }
        }
        Some(removed)
    }

    /// Pooled transactions spending outputs `tx` produced.
    fn children_of(&self, tx: &Transaction) -> Vec<TxHash> {
        tx.located_transparent_outputs()
            .iter()
            .filter_map(|output| self.spent_transparent.get(&output.location()).copied())
            .collect()
    }

    /// Oldest-first transactions whose total size fits `max_bytes`. Stops
    /// at the first transaction that does not fit. Nothing is removed.
    pub fn select_transactions(&self, max_bytes: u64) -> Vec<Transaction> {
        let mut selected = Vec::new();
        let mut total = 0u64;
        for tx_hash in self.order.values() {
            let Some(pending) = self.txs.get(tx_hash) else {
                continue;
            };
            total = total.saturating_add(pending.size);
            if total > max_bytes {
                break;
            }
            selected.push(pending.tx.clone());
        }
        selected
    }

    /// Block template under the configured byte budget.
    pub fn select_for_block(&self) -> Vec<Transaction> {
        self.select_transactions(self.config.max_block_bytes)
    }

    /// Drop what a committed block included or made invalid, then retry
    /// orphans that were waiting on its transactions.
    pub fn remove_confirmed(&mut self, block: &Block, ledger: &Ledger, verifier: &dyn ProofVerifier) {
        let committed = block.tx_hashes();
        let mut removed = 0usize;

        // Children of included transactions stay valid.
        for tx_hash in &committed {
            if self.untrack(tx_hash).is_some() {
                removed += 1;
            }
        }

        let mut conflicting = Vec::new();
        for tx in &block.transactions {
            conflicting.extend(tx.key_images().filter_map(|k| self.key_images.get(k).copied()));
            conflicting.extend(
                tx.transparent_inputs()
                    .iter()
                    .filter_map(|r| self.spent_transparent.get(r).copied()),
            );
        }
        for tx_hash in conflicting {
            if self.remove_tx(&tx_hash).is_some() {
                debug!(tx = %short(&tx_hash), "Evicted transaction conflicting with block");
            }
        }

        for tx_hash in &committed {
            self.promote_orphans(tx_hash, ledger, verifier);
        }

        let max_age = Duration::from_secs(self.config.max_age_secs);
        let expired = self.evict_expired(max_age);

        debug!(
            height = block.height(),
            removed,
            expired,
            remaining = self.txs.len(),
            "Pruned mempool"
        );
    }

    /// Evict pending transactions older than `max_age`, with their
    /// descendants. Returns how many left the pool.
    pub fn evict_expired(&mut self, max_age: Duration) -> usize {
        let before = self.txs.len();
        let expired: Vec<TxHash> = self
            .txs
            .values()
            .filter(|p| p.received_at.elapsed() >= max_age)
            .map(|p| p.hash)
            .collect();
        for tx_hash in &expired {
            if self.remove_tx(tx_hash).is_some() {
                debug!(tx = %short(tx_hash), "Evicted expired transaction");
            }
        }
        before - self.txs.len()
    }

    /// Get number of pending transactions
    pub fn len(&self) -> usize {
        self.txs.len()
    }

    /// Check if mempool is empty
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    pub fn orphan_count(&self) -> usize {
        self.orphans.len()
    }

    /// Check if a transaction is in the mempool
    pub fn contains(&self, tx_hash: &TxHash) -> bool {
        self.txs.contains_key(tx_hash)
    }

    /// Get a transaction by hash
    pub fn get(&self, tx_hash: &TxHash) -> Option<&Transaction> {
        self.txs.get(tx_hash).map(|p| &p.tx)
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new(MempoolConfig::default(), TxLimits::default())
    }
}

/// Thread-safe mempool wrapper. Its write lock also serializes block commit.
pub type SharedMempool = Arc<RwLock<Mempool>>;

/// Create a new shared mempool
pub fn new_shared_mempool(config: MempoolConfig, limits: TxLimits) -> SharedMempool {
    Arc::new(RwLock::new(Mempool::new(config, limits)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Table, UpdateEntry};
    use crate::transaction::builder::{address_of, TransactionBuilder};
    use ed25519_dalek::SigningKey;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use shroud_crypto_primitives::StandardVerifier;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        ledger: Ledger,
        owner: SigningKey,
        rng: ChaCha20Rng,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let ledger = Ledger::open(dir.path()).unwrap();
            Self {
                _dir: dir,
                ledger,
                owner: SigningKey::from_bytes(&[7u8; 32]),
                rng: ChaCha20Rng::seed_from_u64(9),
            }
        }

        /// A committed transparent output owned by `owner`.
        fn fund(&self, tag: u8, amount: u64) -> TransparentOutput {
            let mut output = TransparentOutput::new(address_of(&self.owner), amount);
            output.tx_id = [tag; 32];
            self.ledger
                .flush(&[UpdateEntry::add(
                    Table::TransparentOutputs,
                    output.location().to_bytes(),
                    bincode::serialize(&output).unwrap(),
                )])
                .unwrap();
            output
        }

        fn spend(&mut self, funding: &TransparentOutput, fee: u64) -> Transaction {
            TransactionBuilder::new()
                .transparent_input(funding.clone(), self.owner.clone())
                .transparent_output(address_of(&self.owner), funding.amount - fee)
                .fee(fee)
                .build(&mut self.rng)
                .unwrap()
                .tx
        }
    }

    #[test]
    fn test_mempool_new() {
        let mempool = Mempool::default();
        assert!(mempool.is_empty());
        assert_eq!(mempool.len(), 0);
        assert_eq!(mempool.orphan_count(), 0);
    }

    #[test]
    fn test_admit_and_reject_resubmission() {
        let mut f = Fixture::new();
        let funding = f.fund(1, 100);
        let tx = f.spend(&funding, 1);
        let mut pool = Mempool::default();

        assert_eq!(
            pool.submit(tx.clone(), &f.ledger, &StandardVerifier).unwrap(),
            Admission::Admitted
        );
        assert!(pool.contains(&tx.hash()));
        assert!(matches!(
            pool.submit(tx, &f.ledger, &StandardVerifier),
            Err(MempoolError::AlreadyPooled)
        ));
    }

    #[test]
    fn test_conflicting_spend_is_rejected_without_mutation() {
        let mut f = Fixture::new();
        let funding = f.fund(1, 100);
        let first = f.spend(&funding, 1);
        let second = f.spend(&funding, 2);
        let mut pool = Mempool::default();

        pool.submit(first, &f.ledger, &StandardVerifier).unwrap();
        assert!(matches!(
            pool.submit(second.clone(), &f.ledger, &StandardVerifier),
            Err(MempoolError::Rejected(ValidationError::DoubleSpend(
                DoubleSpendFault::TransparentOutputInPool(_)
            )))
        ));
        assert_eq!(pool.len(), 1);
        assert!(!pool.contains(&second.hash()));
    }

    #[test]
    fn test_orphan_admitted_with_its_parent() {
        let mut f = Fixture::new();
        let funding = f.fund(1, 100);
        let parent = f.spend(&funding, 1);
        let parent_output = parent.located_transparent_outputs().remove(0);
        let child = f.spend(&parent_output, 1);
        let mut pool = Mempool::default();

        assert_eq!(
            pool.submit(child.clone(), &f.ledger, &StandardVerifier).unwrap(),
            Admission::Orphaned {
                missing: parent.hash()
            }
        );
        assert_eq!(pool.orphan_count(), 1);
        assert!(pool.is_empty());

        pool.submit(parent.clone(), &f.ledger, &StandardVerifier).unwrap();
        assert_eq!(pool.orphan_count(), 0);
        assert!(pool.contains(&parent.hash()));
        assert!(pool.contains(&child.hash()));

        let selected: Vec<TxHash> = pool.select_transactions(u64::MAX).iter().map(Transaction::hash).collect();
        assert_eq!(selected, vec![parent.hash(), child.hash()]);
    }

    #[test]
    fn test_selection_stops_at_first_oversized_entry() {
        let mut f = Fixture::new();
        let (a, b) = (f.fund(1, 100), f.fund(2, 100));
        let (tx_a, tx_b) = (f.spend(&a, 1), f.spend(&b, 1));
        let mut pool = Mempool::default();
        pool.submit(tx_a.clone(), &f.ledger, &StandardVerifier).unwrap();
        pool.submit(tx_b, &f.ledger, &StandardVerifier).unwrap();

        let budget = tx_a.serialized_size();
        assert_eq!(pool.select_transactions(budget), vec![tx_a]);
        assert!(pool.select_transactions(budget - 1).is_empty());
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_pool_full() {
        let mut f = Fixture::new();
        let (a, b) = (f.fund(1, 100), f.fund(2, 100));
        let (tx_a, tx_b) = (f.spend(&a, 1), f.spend(&b, 1));
        let config = MempoolConfig {
            max_transactions: 1,
            ..MempoolConfig::default()
        };
        let mut pool = Mempool::new(config, TxLimits::default());

        pool.submit(tx_a, &f.ledger, &StandardVerifier).unwrap();
        assert!(matches!(
            pool.submit(tx_b, &f.ledger, &StandardVerifier),
            Err(MempoolError::PoolFull)
        ));
    }

    #[test]
    fn test_evict_expired_prunes_tracking() {
        let mut f = Fixture::new();
        let funding = f.fund(1, 100);
        let tx = f.spend(&funding, 1);
        let mut pool = Mempool::default();
        pool.submit(tx, &f.ledger, &StandardVerifier).unwrap();

        assert_eq!(pool.evict_expired(Duration::from_secs(3600)), 0);
        assert_eq!(pool.evict_expired(Duration::ZERO), 1);
        assert!(pool.is_empty());

        // The output is spendable from the pool again.
        let again = f.spend(&funding, 2);
        assert!(pool.submit(again, &f.ledger, &StandardVerifier).is_ok());
    }

    #[test]
    fn test_conflict_with_block_evicts_descendants() {
        let mut f = Fixture::new();
        let funding = f.fund(1, 100);
        let parent = f.spend(&funding, 1);
        let child = f.spend(&parent.located_transparent_outputs().remove(0), 1);
        let grandchild = f.spend(&child.located_transparent_outputs().remove(0), 1);
        let rival = f.spend(&funding, 2);
        let mut pool = Mempool::default();
        for tx in [&parent, &child, &grandchild] {
            pool.submit(tx.clone(), &f.ledger, &StandardVerifier).unwrap();
        }

        let block = Block::new(None, vec![rival], 1_000);
        pool.remove_confirmed(&block, &f.ledger, &StandardVerifier);

        assert!(pool.is_empty());
        assert!(pool.select_for_block().is_empty());
    }

    #[test]
    fn test_inclusion_keeps_descendants() {
        let mut f = Fixture::new();
        let funding = f.fund(1, 100);
        let parent = f.spend(&funding, 1);
        let child = f.spend(&parent.located_transparent_outputs().remove(0), 1);
        let mut pool = Mempool::default();
        pool.submit(parent.clone(), &f.ledger, &StandardVerifier).unwrap();
        pool.submit(child.clone(), &f.ledger, &StandardVerifier).unwrap();

        let block = Block::new(None, vec![parent.clone()], 1_000);
        pool.remove_confirmed(&block, &f.ledger, &StandardVerifier);

        assert!(!pool.contains(&parent.hash()));
        assert_eq!(pool.select_for_block(), vec![child]);
    }

    #[test]
    fn test_remove_tx_takes_descendants_along() {
        let mut f = Fixture::new();
        let (a, b) = (f.fund(1, 100), f.fund(2, 100));
        let parent = f.spend(&a, 1);
        let child = f.spend(&parent.located_transparent_outputs().remove(0), 1);
        let unrelated = f.spend(&b, 1);
        let mut pool = Mempool::default();
        for tx in [&parent, &child, &unrelated] {
            pool.submit(tx.clone(), &f.ledger, &StandardVerifier).unwrap();
        }

        assert_eq!(pool.remove_tx(&parent.hash()), Some(parent));
        assert!(!pool.contains(&child.hash()));
        assert_eq!(pool.select_for_block(), vec![unrelated]);

        // The parent's input is spendable from the pool again.
        let again = f.spend(&a, 3);
        assert!(pool.submit(again, &f.ledger, &StandardVerifier).is_ok());
    }

    #[test]
    fn test_remove_confirmed_applies_configured_max_age() {
        let mut f = Fixture::new();
        let funding = f.fund(1, 100);
        let tx = f.spend(&funding, 1);
        let config = MempoolConfig {
            max_age_secs: 0,
            ..MempoolConfig::default()
        };
        let mut pool = Mempool::new(config, TxLimits::default());
        pool.submit(tx, &f.ledger, &StandardVerifier).unwrap();

        let block = Block::new(None, Vec::new(), 1_000);
        pool.remove_confirmed(&block, &f.ledger, &StandardVerifier);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_select_for_block_uses_configured_budget() {
        let mut f = Fixture::new();
        let (a, b) = (f.fund(1, 100), f.fund(2, 100));
        let (tx_a, tx_b) = (f.spend(&a, 1), f.spend(&b, 1));
        let config = MempoolConfig {
            max_block_bytes: tx_a.serialized_size(),
            ..MempoolConfig::default()
        };
        let mut pool = Mempool::new(config, TxLimits::default());
        pool.submit(tx_a.clone(), &f.ledger, &StandardVerifier).unwrap();
        pool.submit(tx_b, &f.ledger, &StandardVerifier).unwrap();

        assert_eq!(pool.select_for_block(), vec![tx_a]);
    }
}
