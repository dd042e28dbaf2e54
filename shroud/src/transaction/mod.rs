// Copyright (c) 2024 Shroud Foundation

//! Transaction model.
//!
//! A transaction is one of four variants sharing a small set of building
//! blocks:
//! - **Coinbase**: private outputs only, mints the block reward
//! - **Private**: ring-signed inputs, hidden amounts
//! - **Transparent**: plain inputs and outputs with ed25519 signatures
//! - **Mixed**: private and transparent parts in one transaction
//!
//! Callers never downcast: they go through projections such as
//! [`Transaction::key_images`] or [`Transaction::transparent_inputs`], which
//! return empty views for variants without that part.

pub mod builder;
mod error;
mod precheck;
mod verify;

pub use error::{ChainFault, DoubleSpendFault, SignatureFault, StructuralError, ValidationError};
pub use precheck::TxLimits;
pub use verify::{InputSource, ResolvedInputs};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shroud_crypto_primitives::{Commitment, Hash, KeyImage, RangeProofKind};
use std::fmt;

/// Current transaction format version.
pub const TX_VERSION: u8 = 1;

/// Number of members in every ring.
pub const RING_SIZE: usize = 64;

/// Version byte of transparent addresses.
pub const ADDRESS_VERSION: u8 = 1;

/// Domain separator for transaction signing.
const SIGNING_DOMAIN: &[u8] = b"shroud-tx-v1";

/// A transaction id.
pub type TxHash = Hash;

/// A transparent address: a version byte and an ed25519 public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub version: u8,
    pub public_key: [u8; 32],
}

impl Address {
    pub fn new(public_key: [u8; 32]) -> Self {
        Self {
            version: ADDRESS_VERSION,
            public_key,
        }
    }

    /// The 33-byte wire form.
    pub fn to_bytes(&self) -> [u8; 33] {
        let mut bytes = [0u8; 33];
        bytes[0] = self.version;
        bytes[1..].copy_from_slice(&self.public_key);
        bytes
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

/// Reference to a transparent output: the producing transaction and the
/// output's position within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputRef {
    pub tx_id: TxHash,
    pub offset: u8,
}

impl OutputRef {
    pub fn new(tx_id: TxHash, offset: u8) -> Self {
        Self { tx_id, offset }
    }

    /// The 33-byte wire form, also the transparent-output table key.
    pub fn to_bytes(&self) -> [u8; 33] {
        let mut bytes = [0u8; 33];
        bytes[..32].copy_from_slice(&self.tx_id);
        bytes[32] = self.offset;
        bytes
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(&self.tx_id[..8]), self.offset)
    }
}

/// An output with a hidden amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateOutput {
    /// One-time public key of the recipient.
    pub one_time_key: [u8; 32],
    /// Commitment to the amount.
    pub commitment: Commitment,
    /// Amount masked for the recipient.
    pub encrypted_amount: u64,
    /// Position in the ledger's output table. Zero until committed; not
    /// covered by any hash.
    pub global_index: u64,
}

/// An output with a public amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransparentOutput {
    pub address: Address,
    pub amount: u64,
    /// Producing transaction. Filled in by [`Transaction::located_transparent_outputs`];
    /// not covered by any hash.
    pub tx_id: TxHash,
    /// Position within the producing transaction; not covered by any hash.
    pub offset: u8,
}

impl TransparentOutput {
    pub fn new(address: Address, amount: u64) -> Self {
        Self {
            address,
            amount,
            tx_id: [0u8; 32],
            offset: 0,
        }
    }

    pub fn location(&self) -> OutputRef {
        OutputRef::new(self.tx_id, self.offset)
    }
}

/// A ring-signed input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateInput {
    pub key_image: KeyImage,
    /// Absolute global indices of the ring members.
    pub offsets: Vec<u64>,
}

/// The confidential half of a Private or Mixed transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateParts {
    pub num_inputs: u8,
    pub num_outputs: u8,
    pub tx_key: Option<[u8; 32]>,
    pub inputs: Vec<PrivateInput>,
    pub outputs: Vec<PrivateOutput>,
    /// One per input, re-blinded commitment to the spent amount.
    pub pseudo_outputs: Vec<Commitment>,
    pub range_proof: Option<Vec<u8>>,
    pub range_proof_plus: Option<Vec<u8>>,
    /// One CLSAG per input.
    pub ring_signatures: Vec<Vec<u8>>,
}

/// The public half of a Transparent or Mixed transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransparentParts {
    pub num_inputs: u8,
    pub num_outputs: u8,
    pub inputs: Vec<OutputRef>,
    pub outputs: Vec<TransparentOutput>,
    /// One ed25519 signature per input.
    pub signatures: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinbaseTx {
    pub version: u8,
    pub num_outputs: u8,
    pub tx_key: Option<[u8; 32]>,
    pub outputs: Vec<PrivateOutput>,
    pub range_proof: Option<Vec<u8>>,
    pub range_proof_plus: Option<Vec<u8>>,
    pub extra: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateTx {
    pub version: u8,
    pub fee: u64,
    pub private: PrivateParts,
    pub signing_hash: Option<Hash>,
    pub extra: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransparentTx {
    pub version: u8,
    pub fee: u64,
    pub transparent: TransparentParts,
    pub signing_hash: Option<Hash>,
    pub extra: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixedTx {
    pub version: u8,
    pub fee: u64,
    pub private: PrivateParts,
    pub transparent: TransparentParts,
    pub signing_hash: Option<Hash>,
    pub extra: Vec<u8>,
}

/// Discriminant of [`Transaction`], also its tag in hashed bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TxKind {
    Coinbase = 0,
    Private = 1,
    Transparent = 2,
    Mixed = 3,
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxKind::Coinbase => "coinbase",
            TxKind::Private => "private",
            TxKind::Transparent => "transparent",
            TxKind::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transaction {
    Coinbase(CoinbaseTx),
    Private(PrivateTx),
    Transparent(TransparentTx),
    Mixed(MixedTx),
}

impl Transaction {
    pub fn kind(&self) -> TxKind {
        match self {
            Transaction::Coinbase(_) => TxKind::Coinbase,
            Transaction::Private(_) => TxKind::Private,
            Transaction::Transparent(_) => TxKind::Transparent,
            Transaction::Mixed(_) => TxKind::Mixed,
        }
    }

    pub fn is_coinbase(&self) -> bool {
        matches!(self, Transaction::Coinbase(_))
    }

    pub fn version(&self) -> u8 {
        match self {
            Transaction::Coinbase(tx) => tx.version,
            Transaction::Private(tx) => tx.version,
            Transaction::Transparent(tx) => tx.version,
            Transaction::Mixed(tx) => tx.version,
        }
    }

    /// Fee paid to the block producer. Coinbase pays none.
    pub fn fee(&self) -> u64 {
        match self {
            Transaction::Coinbase(_) => 0,
            Transaction::Private(tx) => tx.fee,
            Transaction::Transparent(tx) => tx.fee,
            Transaction::Mixed(tx) => tx.fee,
        }
    }

    pub fn extra(&self) -> &[u8] {
        match self {
            Transaction::Coinbase(tx) => &tx.extra,
            Transaction::Private(tx) => &tx.extra,
            Transaction::Transparent(tx) => &tx.extra,
            Transaction::Mixed(tx) => &tx.extra,
        }
    }

    pub fn private_parts(&self) -> Option<&PrivateParts> {
        match self {
            Transaction::Private(tx) => Some(&tx.private),
            Transaction::Mixed(tx) => Some(&tx.private),
            _ => None,
        }
    }

    pub fn transparent_parts(&self) -> Option<&TransparentParts> {
        match self {
            Transaction::Transparent(tx) => Some(&tx.transparent),
            Transaction::Mixed(tx) => Some(&tx.transparent),
            _ => None,
        }
    }

    pub fn private_inputs(&self) -> &[PrivateInput] {
        self.private_parts()
            .map(|p| p.inputs.as_slice())
            .unwrap_or_default()
    }

    pub fn private_outputs(&self) -> &[PrivateOutput] {
        match self {
            Transaction::Coinbase(tx) => &tx.outputs,
            _ => self
                .private_parts()
                .map(|p| p.outputs.as_slice())
                .unwrap_or_default(),
        }
    }

    pub fn transparent_inputs(&self) -> &[OutputRef] {
        self.transparent_parts()
            .map(|t| t.inputs.as_slice())
            .unwrap_or_default()
    }

    /// Transparent outputs as carried, without their location filled in.
    pub fn transparent_outputs(&self) -> &[TransparentOutput] {
        self.transparent_parts()
            .map(|t| t.outputs.as_slice())
            .unwrap_or_default()
    }

    /// Transparent outputs stamped with this transaction's id and their
    /// offsets, as they are stored once committed.
    pub fn located_transparent_outputs(&self) -> Vec<TransparentOutput> {
        let tx_id = self.hash();
        self.transparent_outputs()
            .iter()
            .enumerate()
            .map(|(offset, output)| TransparentOutput {
                tx_id,
                offset: offset as u8,
                ..output.clone()
            })
            .collect()
    }

    pub fn key_images(&self) -> impl Iterator<Item = &KeyImage> {
        self.private_inputs().iter().map(|input| &input.key_image)
    }

    /// Total private plus transparent outputs.
    pub fn num_outputs(&self) -> usize {
        self.private_outputs().len() + self.transparent_outputs().len()
    }

    pub fn tx_key(&self) -> Option<&[u8; 32]> {
        match self {
            Transaction::Coinbase(tx) => tx.tx_key.as_ref(),
            _ => self.private_parts().and_then(|p| p.tx_key.as_ref()),
        }
    }

    /// The `(range proof, range proof-plus)` fields.
    pub fn range_proofs(&self) -> (Option<&[u8]>, Option<&[u8]>) {
        match self {
            Transaction::Coinbase(tx) => (tx.range_proof.as_deref(), tx.range_proof_plus.as_deref()),
            _ => self.private_parts().map_or((None, None), |p| {
                (p.range_proof.as_deref(), p.range_proof_plus.as_deref())
            }),
        }
    }

    /// The single range proof carried, if exactly one is.
    pub fn range_proof(&self) -> Option<(RangeProofKind, &[u8])> {
        match self.range_proofs() {
            (Some(proof), None) => Some((RangeProofKind::Standard, proof)),
            (None, Some(proof)) => Some((RangeProofKind::Plus, proof)),
            _ => None,
        }
    }

    pub fn cached_signing_hash(&self) -> Option<Hash> {
        match self {
            Transaction::Coinbase(_) => None,
            Transaction::Private(tx) => tx.signing_hash,
            Transaction::Transparent(tx) => tx.signing_hash,
            Transaction::Mixed(tx) => tx.signing_hash,
        }
    }

    /// Stores a freshly computed signing hash in the transaction.
    pub fn cache_signing_hash(&mut self) {
        let signing_hash = self.signing_hash();
        match self {
            Transaction::Coinbase(_) => {}
            Transaction::Private(tx) => tx.signing_hash = signing_hash,
            Transaction::Transparent(tx) => tx.signing_hash = signing_hash,
            Transaction::Mixed(tx) => tx.signing_hash = signing_hash,
        }
    }

    fn signatures(&self) -> impl Iterator<Item = &[u8]> {
        let ring = self
            .private_parts()
            .into_iter()
            .flat_map(|p| p.ring_signatures.iter());
        let transparent = self
            .transparent_parts()
            .into_iter()
            .flat_map(|t| t.signatures.iter());
        ring.chain(transparent).map(Vec::as_slice)
    }

    /// Transaction id: every field that is signed, plus the signatures.
    pub fn hash(&self) -> TxHash {
        let mut hasher = Sha256::new();
        self.write_body(&mut hasher);
        for signature in self.signatures() {
            write_bytes(&mut hasher, signature);
        }
        hasher.finalize().into()
    }

    /// The message ring and transparent signatures sign. Coinbase
    /// transactions carry no signatures and have none.
    pub fn signing_hash(&self) -> Option<Hash> {
        if self.is_coinbase() {
            return None;
        }
        let mut hasher = Sha256::new();
        hasher.update(SIGNING_DOMAIN);
        self.write_body(&mut hasher);
        Some(hasher.finalize().into())
    }

    /// Feeds every signed field to `hasher`. Signatures, the cached signing
    /// hash, global indices and transparent output locations are excluded.
    fn write_body(&self, hasher: &mut Sha256) {
        hasher.update([self.kind() as u8, self.version()]);
        hasher.update(self.fee().to_le_bytes());

        match self {
            Transaction::Coinbase(tx) => {
                hasher.update([tx.num_outputs]);
                write_optional(hasher, tx.tx_key.as_ref().map(|k| k.as_slice()));
                write_private_outputs(hasher, &tx.outputs);
                write_optional(hasher, tx.range_proof.as_deref());
                write_optional(hasher, tx.range_proof_plus.as_deref());
            }
            Transaction::Private(tx) => write_private_parts(hasher, &tx.private),
            Transaction::Transparent(tx) => write_transparent_parts(hasher, &tx.transparent),
            Transaction::Mixed(tx) => {
                write_private_parts(hasher, &tx.private);
                write_transparent_parts(hasher, &tx.transparent);
            }
        }

        write_bytes(hasher, self.extra());
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// Serialized size in bytes, used for block packing.
    pub fn serialized_size(&self) -> u64 {
        bincode::serialized_size(self).unwrap_or(u64::MAX)
    }
}

fn write_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn write_optional(hasher: &mut Sha256, bytes: Option<&[u8]>) {
    match bytes {
        Some(bytes) => {
            hasher.update([1u8]);
            write_bytes(hasher, bytes);
        }
        None => hasher.update([0u8]),
    }
}

fn write_private_outputs(hasher: &mut Sha256, outputs: &[PrivateOutput]) {
    for output in outputs {
        hasher.update(output.one_time_key);
        hasher.update(output.commitment.as_bytes());
        hasher.update(output.encrypted_amount.to_le_bytes());
    }
}

fn write_private_parts(hasher: &mut Sha256, parts: &PrivateParts) {
    hasher.update([parts.num_inputs, parts.num_outputs]);
    write_optional(hasher, parts.tx_key.as_ref().map(|k| k.as_slice()));
    for input in &parts.inputs {
        hasher.update(input.key_image.as_bytes());
        hasher.update((input.offsets.len() as u64).to_le_bytes());
        for offset in &input.offsets {
            hasher.update(offset.to_le_bytes());
        }
    }
    write_private_outputs(hasher, &parts.outputs);
    for pseudo_output in &parts.pseudo_outputs {
        hasher.update(pseudo_output.as_bytes());
    }
    write_optional(hasher, parts.range_proof.as_deref());
    write_optional(hasher, parts.range_proof_plus.as_deref());
}

fn write_transparent_parts(hasher: &mut Sha256, parts: &TransparentParts) {
    hasher.update([parts.num_inputs, parts.num_outputs]);
    for input in &parts.inputs {
        hasher.update(input.to_bytes());
    }
    for output in &parts.outputs {
        hasher.update(output.address.to_bytes());
        hasher.update(output.amount.to_le_bytes());
    }
}
