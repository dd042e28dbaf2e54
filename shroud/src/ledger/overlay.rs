// Copyright (c) 2024 Shroud Foundation

//! In-memory state of a block under validation.
//!
//! The overlay sits on top of the committed ledger: lookups see the ledger
//! plus everything earlier transactions in the block created or spent. Global
//! indices are handed out in transaction order as transactions are applied.
//! Nothing reaches the database until [`BlockOverlay::into_updates`] is
//! flushed; dropping the overlay discards the block.

use shroud_crypto_primitives::KeyImage;
use std::collections::{HashMap, HashSet};

use super::{
    counter_updates, index_key, output_key, Ledger, LedgerCounters, LedgerError, Table,
    UpdateEntry,
};
use crate::block::{Block, BlockHeader};
use crate::transaction::{
    InputSource, OutputRef, PrivateOutput, Transaction, TransparentOutput, TxHash,
};

pub struct BlockOverlay<'a> {
    ledger: &'a Ledger,
    /// Counters at the start of the block
    base: LedgerCounters,
    /// Outputs created in this block, from `base.output_index` on
    outputs: Vec<PrivateOutput>,
    spent_keys: HashSet<KeyImage>,
    created_transparent: HashMap<OutputRef, TransparentOutput>,
    /// Committed transparent outputs spent in this block
    spent_transparent: HashSet<OutputRef>,
    tx_hashes: HashSet<TxHash>,
    transactions: Vec<Transaction>,
}

impl<'a> BlockOverlay<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self {
            ledger,
            base: ledger.counters(),
            outputs: Vec::new(),
            spent_keys: HashSet::new(),
            created_transparent: HashMap::new(),
            spent_transparent: HashSet::new(),
            tx_hashes: HashSet::new(),
            transactions: Vec::new(),
        }
    }

    /// Global index the next private output will receive.
    pub fn next_output_index(&self) -> u64 {
        self.base.output_index + self.outputs.len() as u64
    }

    /// Record the effects of a transaction that has already been checked
    /// against this overlay.
    pub fn apply(&mut self, tx: &Transaction) -> Result<(), LedgerError> {
        let mut committed = tx.clone();
        let mut next_index = self.next_output_index();
        for output in committed_outputs_mut(&mut committed) {
            output_key(next_index)?;
            output.global_index = next_index;
            next_index += 1;
        }
        self.outputs.extend_from_slice(committed.private_outputs());

        self.spent_keys.extend(tx.key_images().copied());

        for reference in tx.transparent_inputs() {
            if self.created_transparent.remove(reference).is_none() {
                self.spent_transparent.insert(*reference);
            }
        }
        for output in tx.located_transparent_outputs() {
            self.created_transparent.insert(output.location(), output);
        }

        self.tx_hashes.insert(tx.hash());
        self.transactions.push(committed);
        Ok(())
    }

    /// The complete mutation log for committing the applied transactions
    /// under `header`.
    pub fn into_updates(self, header: &BlockHeader) -> Result<Vec<UpdateEntry>, LedgerError> {
        let mut updates = Vec::new();

        for output in &self.outputs {
            updates.push(UpdateEntry::add(
                Table::Outputs,
                output_key(output.global_index)?,
                bincode::serialize(output)?,
            ));
        }

        for key_image in &self.spent_keys {
            updates.push(UpdateEntry::add(
                Table::SpentKeys,
                key_image.as_bytes().to_vec(),
                Vec::new(),
            ));
        }

        for reference in &self.spent_transparent {
            updates.push(UpdateEntry::del(
                Table::TransparentOutputs,
                reference.to_bytes(),
            ));
        }
        for (reference, output) in &self.created_transparent {
            updates.push(UpdateEntry::add(
                Table::TransparentOutputs,
                reference.to_bytes(),
                bincode::serialize(output)?,
            ));
        }

        let mut tx_index = self.base.tx_index;
        for tx in &self.transactions {
            updates.push(UpdateEntry::add(
                Table::Transactions,
                index_key(tx_index),
                bincode::serialize(tx)?,
            ));
            updates.push(UpdateEntry::add(
                Table::TxIndex,
                tx.hash(),
                index_key(tx_index),
            ));
            tx_index += 1;
        }

        let height = u64::try_from(header.height)
            .map_err(|_| LedgerError::InvalidBlock(format!("negative height {}", header.height)))?;
        let block = Block {
            header: header.clone(),
            transactions: self.transactions,
        };
        updates.push(UpdateEntry::add(
            Table::Blocks,
            index_key(height),
            bincode::serialize(&block)?,
        ));
        updates.push(UpdateEntry::add(
            Table::Headers,
            index_key(height),
            bincode::serialize(header)?,
        ));
        updates.push(UpdateEntry::add(
            Table::BlockIndex,
            header.block_hash,
            index_key(height),
        ));

        let counters = LedgerCounters {
            height: header.height,
            tx_index,
            output_index: self.base.output_index + self.outputs.len() as u64,
        };
        updates.extend(counter_updates(&counters, &header.block_hash, header.timestamp));

        Ok(updates)
    }
}

fn committed_outputs_mut(tx: &mut Transaction) -> &mut [PrivateOutput] {
    match tx {
        Transaction::Coinbase(tx) => tx.outputs.as_mut_slice(),
        Transaction::Private(tx) => tx.private.outputs.as_mut_slice(),
        Transaction::Mixed(tx) => tx.private.outputs.as_mut_slice(),
        Transaction::Transparent(_) => Default::default(),
    }
}

impl InputSource for BlockOverlay<'_> {
    fn ring_members(&self, offsets: &[u64]) -> Result<Vec<PrivateOutput>, LedgerError> {
        let base = self.base.output_index;
        let committed: Vec<u64> = offsets.iter().copied().filter(|i| *i < base).collect();
        let mut from_ledger = self.ledger.get_mixins(&committed)?.into_iter();

        offsets
            .iter()
            .map(|index| {
                let found = if *index < base {
                    from_ledger.next()
                } else {
                    usize::try_from(index - base)
                        .ok()
                        .and_then(|i| self.outputs.get(i))
                        .cloned()
                };
                found.ok_or(LedgerError::OutputNotFound(*index))
            })
            .collect()
    }

    fn is_key_image_unspent(&self, key_image: &KeyImage) -> Result<bool, LedgerError> {
        if self.spent_keys.contains(key_image) {
            return Ok(false);
        }
        self.ledger.check_spent_key(key_image)
    }

    fn transparent_output(
        &self,
        reference: &OutputRef,
    ) -> Result<Option<TransparentOutput>, LedgerError> {
        if let Some(output) = self.created_transparent.get(reference) {
            return Ok(Some(output.clone()));
        }
        if self.spent_transparent.contains(reference) {
            return Ok(None);
        }
        self.ledger.get_pub_output(reference)
    }

    fn knows_transaction(&self, tx_id: &TxHash) -> Result<bool, LedgerError> {
        Ok(self.tx_hashes.contains(tx_id) || self.ledger.contains_transaction(tx_id)?)
    }
}
