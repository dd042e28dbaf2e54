// Copyright (c) 2024 Shroud Foundation

use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shroud_crypto_primitives::{Hash, ProofVerifier};

use crate::transaction::{Transaction, TxHash};

/// Current block format version.
pub const BLOCK_VERSION: u8 = 1;

/// Length of the byte layout hashed into the block hash.
pub const HEADER_HASH_LEN: usize = 93;

/// Block header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u8,

    /// Block timestamp (unix seconds)
    pub timestamp: u64,

    /// Block height; the first block is at height 0
    pub height: i64,

    /// Sum of transaction fees. Not part of the block hash.
    pub fee: u64,

    /// Hash of the previous block, zero for the first block
    pub previous_block: Hash,

    pub block_hash: Hash,

    pub merkle_root: Hash,

    pub num_txs: u32,

    /// Sum of serialized transaction sizes
    pub block_size: u32,

    /// Sum of private and transparent outputs
    pub num_outputs: u32,

    /// Authority signature over `block_hash`. Not part of the block hash.
    pub extra: Vec<u8>,
}

impl BlockHeader {
    /// The fixed layout the block hash commits to.
    pub fn hash_input(&self) -> [u8; HEADER_HASH_LEN] {
        let mut bytes = [0u8; HEADER_HASH_LEN];
        bytes[0] = self.version;
        bytes[1..9].copy_from_slice(&self.timestamp.to_le_bytes());
        bytes[9..17].copy_from_slice(&self.height.to_le_bytes());
        bytes[17..21].copy_from_slice(&self.num_txs.to_le_bytes());
        bytes[21..25].copy_from_slice(&self.block_size.to_le_bytes());
        bytes[25..29].copy_from_slice(&self.num_outputs.to_le_bytes());
        bytes[29..61].copy_from_slice(&self.previous_block);
        bytes[61..93].copy_from_slice(&self.merkle_root);
        bytes
    }

    /// Compute the hash of this header
    pub fn compute_hash(&self) -> Hash {
        Sha256::digest(self.hash_input()).into()
    }

    /// Check `extra` against the authority keys. An empty set accepts nothing.
    pub fn verify_authority(&self, authorities: &[[u8; 32]], verifier: &dyn ProofVerifier) -> bool {
        authorities
            .iter()
            .any(|key| verifier.verify_signature(key, &self.block_hash, &self.extra))
    }
}

/// Merkle root over transaction hashes. An odd node at the end of a level is
/// hashed alone rather than paired with itself.
pub fn merkle_root(leaves: &[TxHash]) -> Hash {
    if leaves.is_empty() {
        return [0u8; 32];
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let mut hasher = Sha256::new();
                for node in pair {
                    hasher.update(node);
                }
                hasher.finalize().into()
            })
            .collect();
    }
    level[0]
}

/// Header totals derived from a transaction list: `(fee, block_size, num_outputs)`.
/// Saturates rather than wrapping so an oversized list never matches a header.
pub fn totals(transactions: &[Transaction]) -> (u64, u64, u64) {
    transactions.iter().fold((0u64, 0u64, 0u64), |(fee, size, outputs), tx| {
        (
            fee.saturating_add(tx.fee()),
            size.saturating_add(tx.serialized_size()),
            outputs.saturating_add(tx.num_outputs() as u64),
        )
    })
}

/// A complete block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Assemble a block on top of `parent` (`None` for the first block) with
    /// every derived header field filled in. The block is unsigned.
    pub fn new(parent: Option<&BlockHeader>, transactions: Vec<Transaction>, timestamp: u64) -> Self {
        let (fee, block_size, num_outputs) = totals(&transactions);
        let hashes: Vec<TxHash> = transactions.iter().map(Transaction::hash).collect();

        let mut header = BlockHeader {
            version: BLOCK_VERSION,
            timestamp,
            height: parent.map_or(0, |p| p.height + 1),
            fee,
            previous_block: parent.map_or([0u8; 32], |p| p.block_hash),
            block_hash: [0u8; 32],
            merkle_root: merkle_root(&hashes),
            num_txs: transactions.len() as u32,
            block_size: u32::try_from(block_size).unwrap_or(u32::MAX),
            num_outputs: u32::try_from(num_outputs).unwrap_or(u32::MAX),
            extra: Vec::new(),
        };
        header.block_hash = header.compute_hash();

        Self {
            header,
            transactions,
        }
    }

    /// Sign the block hash with an authority key.
    pub fn sign(&mut self, key: &SigningKey) {
        self.header.extra = key.sign(&self.header.block_hash).to_bytes().to_vec();
    }

    pub fn hash(&self) -> Hash {
        self.header.block_hash
    }

    pub fn height(&self) -> i64 {
        self.header.height
    }

    pub fn tx_hashes(&self) -> Vec<TxHash> {
        self.transactions.iter().map(Transaction::hash).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_crypto_primitives::{hash_concat, StandardVerifier};

    fn leaf(byte: u8) -> TxHash {
        [byte; 32]
    }

    #[test]
    fn test_merkle_odd_node_is_hashed_alone() {
        let (a, b, c) = (leaf(1), leaf(2), leaf(3));
        let ab = hash_concat(&[a.as_slice(), b.as_slice()]);
        let c_alone = hash_concat(&[c.as_slice()]);
        let expected = hash_concat(&[ab.as_slice(), c_alone.as_slice()]);

        assert_eq!(merkle_root(&[a, b, c]), expected);
        assert_ne!(merkle_root(&[a, b, c]), merkle_root(&[a, b, c, c]));
    }

    #[test]
    fn test_merkle_edges() {
        assert_eq!(merkle_root(&[]), [0u8; 32]);
        assert_eq!(merkle_root(&[leaf(7)]), leaf(7));
        assert_ne!(merkle_root(&[leaf(1), leaf(2)]), merkle_root(&[leaf(2), leaf(1)]));
    }

    #[test]
    fn test_block_hash_excludes_fee_and_signature() {
        let block = Block::new(None, vec![], 1_700_000_000);
        assert_eq!(block.header.hash_input().len(), HEADER_HASH_LEN);

        let mut changed = block.header.clone();
        changed.fee += 1;
        changed.extra = vec![1u8; 64];
        assert_eq!(changed.compute_hash(), block.header.block_hash);

        changed.num_outputs += 1;
        assert_ne!(changed.compute_hash(), block.header.block_hash);
    }

    #[test]
    fn test_hash_input_layout() {
        let mut header = Block::new(None, vec![], 0x0102).header;
        header.height = -1;
        header.previous_block = [0xaa; 32];
        let bytes = header.hash_input();
        assert_eq!(bytes[0], BLOCK_VERSION);
        assert_eq!(&bytes[1..3], &[0x02, 0x01]);
        assert_eq!(&bytes[9..17], &[0xff; 8]);
        assert_eq!(&bytes[29..61], &[0xaa; 32]);
    }

    #[test]
    fn test_authority_signature() {
        let key = SigningKey::from_bytes(&[3u8; 32]);
        let mut block = Block::new(None, vec![], 5);
        block.sign(&key);

        let authority = key.verifying_key().to_bytes();
        assert!(block.header.verify_authority(&[authority], &StandardVerifier));
        assert!(!block.header.verify_authority(&[], &StandardVerifier));
        assert!(!block.header.verify_authority(&[[9u8; 32]], &StandardVerifier));
    }

    #[test]
    fn test_child_links_to_parent() {
        let parent = Block::new(None, vec![], 5);
        let child = Block::new(Some(&parent.header), vec![], 6);
        assert_eq!(child.height(), 1);
        assert_eq!(child.header.previous_block, parent.hash());
    }
}
