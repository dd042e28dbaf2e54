// Copyright (c) 2024 Shroud Foundation

use lmdb::{Database, DatabaseFlags, Environment, EnvironmentFlags, Transaction, WriteFlags};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use shroud_crypto_primitives::KeyImage;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::{
    index_key, output_key, BlockOverlay, ChainState, LedgerCounters, LedgerError, Table,
    UpdateEntry, UpdateRule, META_HEIGHT, META_OUTPUT_INDEX, META_TIP_HASH, META_TIP_TIMESTAMP,
    META_TX_INDEX,
};
use crate::block::{Block, BlockHeader};
use crate::decoy_selection;
use crate::transaction::{
    InputSource, OutputRef, PrivateOutput, Transaction as ShroudTransaction, TransparentOutput,
    TxHash,
};

/// Default LMDB map size (1GB)
pub const DEFAULT_MAP_SIZE: usize = 1024 * 1024 * 1024;

/// LMDB-backed ledger storage
pub struct Ledger {
    env: Environment,
    outputs_db: Database,
    spent_keys_db: Database,
    transparent_outputs_db: Database,
    transactions_db: Database,
    tx_index_db: Database,
    blocks_db: Database,
    headers_db: Database,
    block_index_db: Database,
    meta_db: Database,
    /// Cached copy of the meta table. Written only by `flush`.
    state: Mutex<ChainState>,
}

fn get_raw<'t>(
    txn: &'t impl Transaction,
    db: Database,
    key: &[u8],
) -> Result<Option<&'t [u8]>, LedgerError> {
    match txn.get(db, &key) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(lmdb::Error::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn get_decoded<T: DeserializeOwned>(
    txn: &impl Transaction,
    db: Database,
    key: &[u8],
) -> Result<Option<T>, LedgerError> {
    get_raw(txn, db, key)?
        .map(|bytes| bincode::deserialize(bytes).map_err(LedgerError::from))
        .transpose()
}

fn get_array<const N: usize>(
    txn: &impl Transaction,
    db: Database,
    key: &[u8],
) -> Result<Option<[u8; N]>, LedgerError> {
    get_raw(txn, db, key)?
        .map(|bytes| {
            bytes.try_into().map_err(|_| {
                LedgerError::Serialization(format!(
                    "{} is {} bytes, expected {}",
                    String::from_utf8_lossy(key),
                    bytes.len(),
                    N
                ))
            })
        })
        .transpose()
}

impl Ledger {
    /// Open or create a ledger at the given path
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        Self::open_with_map_size(path, DEFAULT_MAP_SIZE)
    }

    pub fn open_with_map_size(path: &Path, map_size: usize) -> Result<Self, LedgerError> {
        fs::create_dir_all(path)?;

        let env = Environment::new()
            .set_flags(EnvironmentFlags::NO_SUB_DIR)
            .set_max_dbs(Table::ALL.len() as u32)
            .set_map_size(map_size)
            .open(path.join("ledger.mdb").as_ref())?;

        let create = |table: Table| env.create_db(Some(table.name()), DatabaseFlags::empty());
        let outputs_db = create(Table::Outputs)?;
        let spent_keys_db = create(Table::SpentKeys)?;
        let transparent_outputs_db = create(Table::TransparentOutputs)?;
        let transactions_db = create(Table::Transactions)?;
        let tx_index_db = create(Table::TxIndex)?;
        let blocks_db = create(Table::Blocks)?;
        let headers_db = create(Table::Headers)?;
        let block_index_db = create(Table::BlockIndex)?;
        let meta_db = create(Table::Meta)?;

        let state = Self::read_chain_state(&env.begin_ro_txn()?, meta_db)?;
        info!(
            path = %path.display(),
            height = state.counters.height,
            outputs = state.counters.output_index,
            "Opened ledger"
        );

        Ok(Self {
            env,
            outputs_db,
            spent_keys_db,
            transparent_outputs_db,
            transactions_db,
            tx_index_db,
            blocks_db,
            headers_db,
            block_index_db,
            meta_db,
            state: Mutex::new(state),
        })
    }

    fn db(&self, table: Table) -> Database {
        match table {
            Table::Outputs => self.outputs_db,
            Table::SpentKeys => self.spent_keys_db,
            Table::TransparentOutputs => self.transparent_outputs_db,
            Table::Transactions => self.transactions_db,
            Table::TxIndex => self.tx_index_db,
            Table::Blocks => self.blocks_db,
            Table::Headers => self.headers_db,
            Table::BlockIndex => self.block_index_db,
            Table::Meta => self.meta_db,
        }
    }

    fn read_chain_state(txn: &impl Transaction, meta_db: Database) -> Result<ChainState, LedgerError> {
        let defaults = LedgerCounters::default();
        let counters = LedgerCounters {
            height: get_array(txn, meta_db, META_HEIGHT)?
                .map_or(defaults.height, i64::from_be_bytes),
            tx_index: get_array(txn, meta_db, META_TX_INDEX)?
                .map_or(defaults.tx_index, u64::from_be_bytes),
            output_index: get_array(txn, meta_db, META_OUTPUT_INDEX)?
                .map_or(defaults.output_index, u64::from_be_bytes),
        };

        Ok(ChainState {
            counters,
            tip_hash: get_array(txn, meta_db, META_TIP_HASH)?.unwrap_or_default(),
            tip_timestamp: get_array(txn, meta_db, META_TIP_TIMESTAMP)?
                .map_or(0, u64::from_be_bytes),
        })
    }

    /// Get the current counters
    pub fn counters(&self) -> LedgerCounters {
        self.state.lock().counters
    }

    /// Get the current chain state
    pub fn chain_state(&self) -> ChainState {
        self.state.lock().clone()
    }

    /// Apply a batch of updates in one write transaction.
    ///
    /// `Add` fails on an existing key and `Del` on a missing one; either
    /// failure, like any storage error, discards the whole batch.
    pub fn flush(&self, updates: &[UpdateEntry]) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        let mut txn = self.env.begin_rw_txn()?;

        for entry in updates {
            let db = self.db(entry.table);
            let result = match entry.rule {
                UpdateRule::Add => txn.put(db, &entry.key, &entry.value, WriteFlags::NO_OVERWRITE),
                UpdateRule::Update => txn.put(db, &entry.key, &entry.value, WriteFlags::empty()),
                UpdateRule::Del => txn.del(db, &entry.key, None),
            };
            match result {
                Ok(()) => {}
                Err(lmdb::Error::KeyExist) | Err(lmdb::Error::NotFound) => {
                    return Err(LedgerError::Conflict {
                        table: entry.table,
                        rule: entry.rule,
                        key: hex::encode(&entry.key),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        txn.commit()?;
        *state = Self::read_chain_state(&self.env.begin_ro_txn()?, self.meta_db)?;

        debug!(
            entries = updates.len(),
            height = state.counters.height,
            "Flushed ledger updates"
        );
        Ok(())
    }

    /// Add a block without verifying its transactions. For trusted imports.
    pub fn add_block(&self, block: &Block) -> Result<(), LedgerError> {
        let state = self.chain_state();

        let expected_height = state.counters.height + 1;
        if block.height() != expected_height {
            return Err(LedgerError::InvalidBlock(format!(
                "Expected height {}, got {}",
                expected_height,
                block.height()
            )));
        }
        if block.header.previous_block != state.tip_hash {
            return Err(LedgerError::InvalidBlock(
                "Previous block hash mismatch".to_string(),
            ));
        }

        let mut overlay = BlockOverlay::new(self);
        for tx in &block.transactions {
            overlay.apply(tx)?;
        }
        let updates = overlay.into_updates(&block.header)?;
        self.flush(&updates)?;

        info!(
            height = block.height(),
            hash = %hex::encode(&block.hash()[0..8]),
            txs = block.transactions.len(),
            "Added block"
        );
        Ok(())
    }

    /// Get an output by global index
    pub fn get_output(&self, index: u64) -> Result<PrivateOutput, LedgerError> {
        let txn = self.env.begin_ro_txn()?;
        self.read_output(&txn, index)
    }

    fn read_output(&self, txn: &impl Transaction, index: u64) -> Result<PrivateOutput, LedgerError> {
        let Ok(key) = output_key(index) else {
            return Err(LedgerError::OutputNotFound(index));
        };
        get_decoded(txn, self.outputs_db, &key)?.ok_or(LedgerError::OutputNotFound(index))
    }

    /// Get outputs by global index, failing if any is missing
    pub fn get_mixins(&self, offsets: &[u64]) -> Result<Vec<PrivateOutput>, LedgerError> {
        let txn = self.env.begin_ro_txn()?;
        offsets
            .iter()
            .map(|index| self.read_output(&txn, *index))
            .collect()
    }

    /// Sample a ring around `real_index` and return its outputs and the real
    /// output's position.
    pub fn select_mixins(&self, real_index: u64) -> Result<(Vec<PrivateOutput>, usize), LedgerError> {
        let max = self.counters().output_index;
        let (indices, position) =
            decoy_selection::sample_ring(real_index, max, &mut rand::thread_rng())?;
        Ok((self.get_mixins(&indices)?, position))
    }

    /// [`Ledger::select_mixins`] with every decoy from the skewed draw.
    pub fn select_mixins_uniform(
        &self,
        real_index: u64,
    ) -> Result<(Vec<PrivateOutput>, usize), LedgerError> {
        let max = self.counters().output_index;
        let (indices, position) =
            decoy_selection::sample_ring_uniform(real_index, max, &mut rand::thread_rng())?;
        Ok((self.get_mixins(&indices)?, position))
    }

    /// Get an unspent transparent output
    pub fn get_pub_output(
        &self,
        reference: &OutputRef,
    ) -> Result<Option<TransparentOutput>, LedgerError> {
        let txn = self.env.begin_ro_txn()?;
        get_decoded(&txn, self.transparent_outputs_db, &reference.to_bytes())
    }

    /// True if the key image has not been spent
    pub fn check_spent_key(&self, key_image: &KeyImage) -> Result<bool, LedgerError> {
        let txn = self.env.begin_ro_txn()?;
        Ok(get_raw(&txn, self.spent_keys_db, key_image.as_bytes())?.is_none())
    }

    /// Get a block by height
    pub fn get_block(&self, height: u64) -> Result<Block, LedgerError> {
        let txn = self.env.begin_ro_txn()?;
        get_decoded(&txn, self.blocks_db, &index_key(height))?
            .ok_or(LedgerError::BlockNotFound(height))
    }

    pub fn get_header(&self, height: u64) -> Result<BlockHeader, LedgerError> {
        let txn = self.env.begin_ro_txn()?;
        get_decoded(&txn, self.headers_db, &index_key(height))?
            .ok_or(LedgerError::BlockNotFound(height))
    }

    pub fn get_block_by_hash(&self, hash: &[u8; 32]) -> Result<Option<Block>, LedgerError> {
        let txn = self.env.begin_ro_txn()?;
        let Some(height) = get_array(&txn, self.block_index_db, hash)?.map(u64::from_be_bytes)
        else {
            return Ok(None);
        };
        get_decoded(&txn, self.blocks_db, &index_key(height))
    }

    /// Get a committed transaction by hash, with its global indices filled in
    pub fn get_transaction(&self, hash: &TxHash) -> Result<Option<ShroudTransaction>, LedgerError> {
        let txn = self.env.begin_ro_txn()?;
        let Some(tx_id) = get_array(&txn, self.tx_index_db, hash)?.map(u64::from_be_bytes) else {
            return Ok(None);
        };
        match get_decoded(&txn, self.transactions_db, &index_key(tx_id))? {
            Some(tx) => Ok(Some(tx)),
            None => Err(LedgerError::NotFound(format!(
                "transaction {} indexed as {} but missing",
                hex::encode(hash),
                tx_id
            ))),
        }
    }

    pub fn contains_transaction(&self, hash: &TxHash) -> Result<bool, LedgerError> {
        let txn = self.env.begin_ro_txn()?;
        Ok(get_raw(&txn, self.tx_index_db, hash)?.is_some())
    }
}

impl InputSource for Ledger {
    fn ring_members(&self, offsets: &[u64]) -> Result<Vec<PrivateOutput>, LedgerError> {
        self.get_mixins(offsets)
    }

    fn is_key_image_unspent(&self, key_image: &KeyImage) -> Result<bool, LedgerError> {
        self.check_spent_key(key_image)
    }

    fn transparent_output(
        &self,
        reference: &OutputRef,
    ) -> Result<Option<TransparentOutput>, LedgerError> {
        self.get_pub_output(reference)
    }

    fn knows_transaction(&self, tx_id: &TxHash) -> Result<bool, LedgerError> {
        self.contains_transaction(tx_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::counter_updates;
    use crate::transaction::builder::build_coinbase;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use shroud_crypto_primitives::RangeProofKind;
    use tempfile::tempdir;

    fn output(index: u64) -> PrivateOutput {
        PrivateOutput {
            one_time_key: [index as u8; 32],
            commitment: shroud_crypto_primitives::Commitment([1u8; 32]),
            encrypted_amount: index,
            global_index: index,
        }
    }

    fn seed_outputs(ledger: &Ledger, count: u64) {
        let mut updates: Vec<UpdateEntry> = (0..count)
            .map(|i| {
                UpdateEntry::add(
                    Table::Outputs,
                    output_key(i).unwrap(),
                    bincode::serialize(&output(i)).unwrap(),
                )
            })
            .collect();
        let counters = LedgerCounters {
            height: 0,
            tx_index: 0,
            output_index: count,
        };
        updates.extend(counter_updates(&counters, &[7u8; 32], 100));
        ledger.flush(&updates).unwrap();
    }

    #[test]
    fn test_empty_ledger() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(dir.path()).unwrap();

        assert_eq!(ledger.counters(), LedgerCounters::default());
        assert_eq!(ledger.counters().height, -1);
        assert!(matches!(ledger.get_output(0), Err(LedgerError::OutputNotFound(0))));
        assert!(ledger.check_spent_key(&KeyImage::from(1)).unwrap());
    }

    #[test]
    fn test_flush_advances_counters_and_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let ledger = Ledger::open(dir.path()).unwrap();
            seed_outputs(&ledger, 10);
            assert_eq!(ledger.counters().output_index, 10);
            assert_eq!(ledger.chain_state().tip_hash, [7u8; 32]);
        }
        let ledger = Ledger::open(dir.path()).unwrap();
        assert_eq!(ledger.counters().output_index, 10);
        assert_eq!(ledger.get_output(3).unwrap(), output(3));
    }

    #[test]
    fn test_conflicting_batch_writes_nothing() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(dir.path()).unwrap();
        seed_outputs(&ledger, 2);

        let batch = vec![
            UpdateEntry::add(Table::SpentKeys, KeyImage::from(9).as_bytes().to_vec(), vec![]),
            UpdateEntry::add(Table::Outputs, output_key(1).unwrap(), vec![0u8]),
        ];
        assert!(matches!(
            ledger.flush(&batch),
            Err(LedgerError::Conflict {
                table: Table::Outputs,
                rule: UpdateRule::Add,
                ..
            })
        ));
        assert!(ledger.check_spent_key(&KeyImage::from(9)).unwrap());

        let missing = vec![UpdateEntry::del(Table::TransparentOutputs, vec![1u8; 33])];
        assert!(matches!(
            ledger.flush(&missing),
            Err(LedgerError::Conflict {
                rule: UpdateRule::Del,
                ..
            })
        ));
    }

    #[test]
    fn test_get_mixins_is_exact() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(dir.path()).unwrap();
        seed_outputs(&ledger, 5);

        let outputs = ledger.get_mixins(&[4, 0, 2]).unwrap();
        assert_eq!(
            outputs.iter().map(|o| o.global_index).collect::<Vec<_>>(),
            vec![4, 0, 2]
        );
        assert!(matches!(
            ledger.get_mixins(&[1, 5]),
            Err(LedgerError::OutputNotFound(5))
        ));
    }

    #[test]
    fn test_select_mixins() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(dir.path()).unwrap();
        seed_outputs(&ledger, 300);

        let (ring, position) = ledger.select_mixins(123).unwrap();
        assert_eq!(ring.len(), crate::transaction::RING_SIZE);
        assert_eq!(ring[position].global_index, 123);

        let (ring, position) = ledger.select_mixins_uniform(299).unwrap();
        assert_eq!(ring[position].global_index, 299);

        assert!(matches!(
            ledger.select_mixins(300),
            Err(LedgerError::Decoy(_))
        ));
    }

    #[test]
    fn test_add_block_stores_outputs_and_indexes() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(dir.path()).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(5);

        let coinbase = build_coinbase(&[10, 20], RangeProofKind::Standard, vec![], &mut rng)
            .unwrap()
            .tx;
        let block = Block::new(None, vec![coinbase.clone()], 1_000);
        ledger.add_block(&block).unwrap();

        let state = ledger.chain_state();
        assert_eq!(state.counters.height, 0);
        assert_eq!(state.counters.tx_index, 1);
        assert_eq!(state.counters.output_index, 2);
        assert_eq!(state.tip_hash, block.hash());
        assert_eq!(state.tip_timestamp, 1_000);

        assert_eq!(ledger.get_output(1).unwrap().global_index, 1);
        assert!(ledger.contains_transaction(&coinbase.hash()).unwrap());
        let stored = ledger.get_transaction(&coinbase.hash()).unwrap().unwrap();
        assert_eq!(stored.private_outputs()[1].global_index, 1);
        assert_eq!(ledger.get_header(0).unwrap(), block.header);
        let stored_block = ledger.get_block(0).unwrap();
        assert_eq!(stored_block.header, block.header);
        assert_eq!(stored_block.transactions[0].private_outputs()[1].global_index, 1);
        assert!(matches!(
            ledger.get_block(1),
            Err(LedgerError::BlockNotFound(1))
        ));
        assert_eq!(
            ledger.get_block_by_hash(&block.hash()).unwrap().map(|b| b.height()),
            Some(0)
        );

        // Same block again is out of sequence.
        assert!(matches!(
            ledger.add_block(&block),
            Err(LedgerError::InvalidBlock(_))
        ));
    }
}
