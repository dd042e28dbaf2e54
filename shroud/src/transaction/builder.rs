// Copyright (c) 2024 Shroud Foundation

//! Utility for building and signing transactions.
//!
//! The builder picks the variant from what it is given: ring inputs or
//! private outputs make a transaction private, transparent inputs or outputs
//! make it transparent, and both make it mixed. Masks are chosen so the
//! commitments balance; callers only supply amounts.

use super::{
    verify::transparent_signing_message, Address, CoinbaseTx, MixedTx, PrivateInput,
    PrivateOutput, PrivateParts, PrivateTx, Transaction, TransparentOutput, TransparentParts,
    TransparentTx, TX_VERSION,
};
use ed25519_dalek::{Signer, SigningKey};
use rand::{CryptoRng, RngCore};
use shroud_crypto_primitives::{
    clsag::{Clsag, RingMember},
    commit, hash_concat, public_key_from_private, KeyImage, RangeProof,
    RangeProofKind, Scalar,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("inputs total {inputs}, outputs plus fee total {outputs}")]
    Unbalanced { inputs: u128, outputs: u128 },

    #[error("real input {real_index} is outside a ring of {ring_size}")]
    RealIndexOutOfRange { real_index: usize, ring_size: usize },

    #[error("more than 255 {0}")]
    TooMany(&'static str),

    #[error("crypto: {0}")]
    Crypto(#[from] shroud_crypto_primitives::Error),
}

/// A private output together with the secrets that open and spend it.
#[derive(Clone, Debug)]
pub struct OwnedOutput {
    pub output: PrivateOutput,
    pub private_key: Scalar,
    pub amount: u64,
    pub mask: Scalar,
}

impl OwnedOutput {
    /// A fresh output of `amount` under a random key and mask.
    pub fn random(amount: u64, rng: &mut (impl RngCore + CryptoRng)) -> Self {
        let private_key = Scalar::random(rng);
        let mask = Scalar::random(rng);
        Self::with_mask(amount, private_key, mask)
    }

    fn with_mask(amount: u64, private_key: Scalar, mask: Scalar) -> Self {
        Self {
            output: PrivateOutput {
                one_time_key: public_key_from_private(&private_key),
                commitment: commit(&mask, amount),
                encrypted_amount: amount,
                global_index: 0,
            },
            private_key,
            amount,
            mask,
        }
    }

    pub fn key_image(&self) -> KeyImage {
        KeyImage::from_private_key(&self.private_key)
    }
}

/// A ring-signed input: the ring as stored in the ledger, and the owned
/// output hidden at `real_index`.
#[derive(Clone, Debug)]
pub struct RingInput {
    pub ring: Vec<PrivateOutput>,
    pub real_index: usize,
    pub owned: OwnedOutput,
}

/// Masks `amount` for the holder of `one_time_key`.
fn mask_amount(tx_key: &[u8; 32], one_time_key: &[u8; 32], amount: u64) -> u64 {
    let pad = hash_concat(&[tx_key.as_slice(), one_time_key.as_slice()]);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&pad[..8]);
    amount ^ u64::from_le_bytes(bytes)
}

fn count(len: usize, what: &'static str) -> Result<u8, BuilderError> {
    u8::try_from(len).map_err(|_| BuilderError::TooMany(what))
}

/// Proves and masks fresh private outputs whose masks are given.
fn make_outputs(
    amounts: &[u64],
    masks: Vec<Scalar>,
    kind: RangeProofKind,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<(Option<[u8; 32]>, Vec<OwnedOutput>, Option<Vec<u8>>), BuilderError> {
    if amounts.is_empty() {
        return Ok((None, Vec::new(), None));
    }

    let tx_private_key = Scalar::random(rng);
    let tx_key = public_key_from_private(&tx_private_key);

    let mut owned: Vec<OwnedOutput> = amounts
        .iter()
        .zip(masks)
        .map(|(amount, mask)| OwnedOutput::with_mask(*amount, Scalar::random(rng), mask))
        .collect();
    for output in owned.iter_mut() {
        output.output.encrypted_amount =
            mask_amount(&tx_key, &output.output.one_time_key, output.amount);
    }

    let openings: Vec<(u64, Scalar)> = owned.iter().map(|o| (o.amount, o.mask)).collect();
    let (proof, _) = RangeProof::prove(kind, &openings, rng)?;

    Ok((Some(tx_key), owned, Some(proof.to_bytes())))
}

fn split_proof(kind: RangeProofKind, proof: Option<Vec<u8>>) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
    match kind {
        RangeProofKind::Standard => (proof, None),
        RangeProofKind::Plus => (None, proof),
    }
}

/// A built transaction and the outputs it created.
#[derive(Clone, Debug)]
pub struct Built {
    pub tx: Transaction,
    /// Private outputs, in transaction order.
    pub outputs: Vec<OwnedOutput>,
}

/// Builds a coinbase paying `amounts` to fresh keys.
pub fn build_coinbase(
    amounts: &[u64],
    kind: RangeProofKind,
    extra: Vec<u8>,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<Built, BuilderError> {
    let masks = amounts.iter().map(|_| Scalar::random(rng)).collect();
    let (tx_key, outputs, proof) = make_outputs(amounts, masks, kind, rng)?;
    let (range_proof, range_proof_plus) = split_proof(kind, proof);

    let tx = Transaction::Coinbase(CoinbaseTx {
        version: TX_VERSION,
        num_outputs: count(outputs.len(), "outputs")?,
        tx_key,
        outputs: outputs.iter().map(|o| o.output.clone()).collect(),
        range_proof,
        range_proof_plus,
        extra,
    });
    Ok(Built { tx, outputs })
}

/// Collects the parts of a non-coinbase transaction, then signs it.
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    fee: u64,
    ring_inputs: Vec<RingInput>,
    transparent_inputs: Vec<(TransparentOutput, SigningKey)>,
    private_outputs: Vec<u64>,
    transparent_outputs: Vec<TransparentOutput>,
    range_proof_kind: RangeProofKind,
    extra: Vec<u8>,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self {
            fee: 0,
            ring_inputs: Vec::new(),
            transparent_inputs: Vec::new(),
            private_outputs: Vec::new(),
            transparent_outputs: Vec::new(),
            range_proof_kind: RangeProofKind::Standard,
            extra: Vec::new(),
        }
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    pub fn range_proof_kind(mut self, kind: RangeProofKind) -> Self {
        self.range_proof_kind = kind;
        self
    }

    pub fn extra(mut self, extra: Vec<u8>) -> Self {
        self.extra = extra;
        self
    }

    pub fn ring_input(mut self, input: RingInput) -> Self {
        self.ring_inputs.push(input);
        self
    }

    /// Spends a located transparent output owned by `signing_key`.
    pub fn transparent_input(mut self, output: TransparentOutput, signing_key: SigningKey) -> Self {
        self.transparent_inputs.push((output, signing_key));
        self
    }

    pub fn private_output(mut self, amount: u64) -> Self {
        self.private_outputs.push(amount);
        self
    }

    pub fn transparent_output(mut self, address: Address, amount: u64) -> Self {
        self.transparent_outputs
            .push(TransparentOutput::new(address, amount));
        self
    }

    fn check_balance(&self) -> Result<(), BuilderError> {
        let inputs: u128 = self
            .ring_inputs
            .iter()
            .map(|i| i.owned.amount as u128)
            .chain(self.transparent_inputs.iter().map(|(o, _)| o.amount as u128))
            .sum();
        let outputs: u128 = self
            .private_outputs
            .iter()
            .map(|a| *a as u128)
            .chain(self.transparent_outputs.iter().map(|o| o.amount as u128))
            .sum::<u128>()
            + self.fee as u128;
        if inputs == outputs {
            Ok(())
        } else {
            Err(BuilderError::Unbalanced { inputs, outputs })
        }
    }

    /// Output masks and pseudo-output masks with equal sums.
    fn choose_masks(&self, rng: &mut (impl RngCore + CryptoRng)) -> (Vec<Scalar>, Vec<Scalar>) {
        let (n_in, n_out) = (self.ring_inputs.len(), self.private_outputs.len());
        let mut output_masks: Vec<Scalar> = (0..n_out).map(|_| Scalar::random(rng)).collect();
        let mut pseudo_masks: Vec<Scalar> = (0..n_in).map(|_| Scalar::random(rng)).collect();

        // The last mask on one side absorbs the difference.
        if pseudo_masks.pop().is_some() {
            let target: Scalar = output_masks.iter().sum();
            let others: Scalar = pseudo_masks.iter().sum();
            pseudo_masks.push(target - others);
        } else if output_masks.pop().is_some() {
            let others: Scalar = output_masks.iter().sum();
            output_masks.push(-others);
        }
        (output_masks, pseudo_masks)
    }

    pub fn build(self, rng: &mut (impl RngCore + CryptoRng)) -> Result<Built, BuilderError> {
        self.check_balance()?;
        for input in &self.ring_inputs {
            if input.real_index >= input.ring.len() {
                return Err(BuilderError::RealIndexOutOfRange {
                    real_index: input.real_index,
                    ring_size: input.ring.len(),
                });
            }
        }

        let (output_masks, pseudo_masks) = self.choose_masks(rng);
        let (tx_key, outputs, proof) =
            make_outputs(&self.private_outputs, output_masks, self.range_proof_kind, rng)?;
        let (range_proof, range_proof_plus) = split_proof(self.range_proof_kind, proof);

        let has_private = !self.ring_inputs.is_empty() || !outputs.is_empty();
        let has_transparent =
            !self.transparent_inputs.is_empty() || !self.transparent_outputs.is_empty();

        let mut private = has_private
            .then(|| -> Result<PrivateParts, BuilderError> {
                Ok(PrivateParts {
                    num_inputs: count(self.ring_inputs.len(), "private inputs")?,
                    num_outputs: count(outputs.len(), "private outputs")?,
                    tx_key,
                    inputs: self
                        .ring_inputs
                        .iter()
                        .map(|input| PrivateInput {
                            key_image: input.owned.key_image(),
                            offsets: input.ring.iter().map(|o| o.global_index).collect(),
                        })
                        .collect(),
                    outputs: outputs.iter().map(|o| o.output.clone()).collect(),
                    pseudo_outputs: self
                        .ring_inputs
                        .iter()
                        .zip(&pseudo_masks)
                        .map(|(input, mask)| commit(mask, input.owned.amount))
                        .collect(),
                    range_proof,
                    range_proof_plus,
                    ring_signatures: Vec::new(),
                })
            })
            .transpose()?;

        let mut transparent = has_transparent
            .then(|| -> Result<TransparentParts, BuilderError> {
                Ok(TransparentParts {
                    num_inputs: count(self.transparent_inputs.len(), "transparent inputs")?,
                    num_outputs: count(self.transparent_outputs.len(), "transparent outputs")?,
                    inputs: self
                        .transparent_inputs
                        .iter()
                        .map(|(o, _)| o.location())
                        .collect(),
                    outputs: self.transparent_outputs.clone(),
                    signatures: Vec::new(),
                })
            })
            .transpose()?;

        let unsigned = self.assemble(private.clone(), transparent.clone());
        let signing_hash = unsigned.signing_hash().unwrap_or_default();

        if let Some(parts) = private.as_mut() {
            for (input, pseudo_mask) in self.ring_inputs.iter().zip(&pseudo_masks) {
                let ring: Vec<RingMember> = input
                    .ring
                    .iter()
                    .map(|o| RingMember {
                        target_key: o.one_time_key,
                        commitment: o.commitment,
                    })
                    .collect();
                let signature = Clsag::sign(
                    &signing_hash,
                    &ring,
                    input.real_index,
                    &input.owned.private_key,
                    input.owned.amount,
                    &input.owned.mask,
                    pseudo_mask,
                    rng,
                )?;
                parts.ring_signatures.push(signature.to_bytes());
            }
        }

        if let Some(parts) = transparent.as_mut() {
            for (output, signing_key) in &self.transparent_inputs {
                let message = transparent_signing_message(&signing_hash, &output.location(), output);
                parts
                    .signatures
                    .push(signing_key.sign(&message).to_bytes().to_vec());
            }
        }

        let mut tx = self.assemble(private, transparent);
        tx.cache_signing_hash();
        Ok(Built { tx, outputs })
    }

    fn assemble(
        &self,
        private: Option<PrivateParts>,
        transparent: Option<TransparentParts>,
    ) -> Transaction {
        let (fee, extra) = (self.fee, self.extra.clone());
        match (private, transparent) {
            (Some(private), Some(transparent)) => Transaction::Mixed(MixedTx {
                version: TX_VERSION,
                fee,
                private,
                transparent,
                signing_hash: None,
                extra,
            }),
            (None, Some(transparent)) => Transaction::Transparent(TransparentTx {
                version: TX_VERSION,
                fee,
                transparent,
                signing_hash: None,
                extra,
            }),
            (private, None) => Transaction::Private(PrivateTx {
                version: TX_VERSION,
                fee,
                private: private.unwrap_or_default(),
                signing_hash: None,
                extra,
            }),
        }
    }
}

/// The address an ed25519 key receives transparent outputs at.
pub fn address_of(signing_key: &SigningKey) -> Address {
    Address::new(signing_key.verifying_key().to_bytes())
}

/// Recovers an output's amount given the transaction key.
pub fn unmask_amount(tx_key: &[u8; 32], output: &PrivateOutput) -> u64 {
    mask_amount(tx_key, &output.one_time_key, output.encrypted_amount)
}
