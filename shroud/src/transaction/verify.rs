// Copyright (c) 2024 Shroud Foundation

//! Balance and signature verification.
//!
//! Verification is split in two: [`Transaction::resolve_inputs`] performs the
//! stateful lookups (spent keys, ring members, referenced transparent
//! outputs) and [`Transaction::verify_resolved`] runs the cryptography, which
//! needs no state and can run on any thread.

use super::{
    DoubleSpendFault, OutputRef, PrivateOutput, SignatureFault, StructuralError, Transaction,
    TransparentOutput, TxHash, ValidationError,
};
use crate::ledger::LedgerError;
use shroud_crypto_primitives::{
    add_commitments, commit, hash_concat, sum_commitments, Commitment, Hash, KeyImage,
    ProofVerifier, Scalar,
};

/// The state a transaction's inputs are checked against: the committed
/// ledger, the ledger plus the mempool, or the ledger plus a block in
/// progress.
pub trait InputSource {
    /// Outputs at the given global indices, in order. A missing index is
    /// [`LedgerError::OutputNotFound`].
    fn ring_members(&self, offsets: &[u64]) -> Result<Vec<PrivateOutput>, LedgerError>;

    /// True while `key_image` has not been spent.
    fn is_key_image_unspent(&self, key_image: &KeyImage) -> Result<bool, LedgerError>;

    /// The unspent transparent output at `reference`, if any.
    fn transparent_output(
        &self,
        reference: &OutputRef,
    ) -> Result<Option<TransparentOutput>, LedgerError>;

    /// True if the transaction has been seen, whether or not its outputs
    /// remain unspent.
    fn knows_transaction(&self, tx_id: &TxHash) -> Result<bool, LedgerError>;
}

/// Everything a transaction's inputs point at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedInputs {
    /// Ring members per private input.
    pub rings: Vec<Vec<PrivateOutput>>,
    /// Referenced output per transparent input.
    pub transparent: Vec<TransparentOutput>,
}

/// `H(signing_hash ‖ H(input ‖ referenced address))`, the message a
/// transparent input signs.
pub fn transparent_signing_message(
    signing_hash: &Hash,
    input: &OutputRef,
    referenced: &TransparentOutput,
) -> Hash {
    let datum = hash_concat(&[
        input.to_bytes().as_slice(),
        referenced.address.to_bytes().as_slice(),
    ]);
    hash_concat(&[signing_hash.as_slice(), datum.as_slice()])
}

fn checked_total<'a>(amounts: impl IntoIterator<Item = &'a u64>) -> Result<u64, ValidationError> {
    amounts
        .into_iter()
        .try_fold(0u64, |total, amount| total.checked_add(*amount))
        .ok_or(ValidationError::Balance)
}

impl Transaction {
    /// Checks every input against `source`. With `in_block` set, a
    /// reference to an unseen transaction is a double spend rather than an
    /// orphan: a block cannot wait for anything.
    pub fn resolve_inputs(
        &self,
        source: &impl InputSource,
        in_block: bool,
    ) -> Result<ResolvedInputs, ValidationError> {
        for key_image in self.key_images() {
            if !source.is_key_image_unspent(key_image)? {
                return Err(DoubleSpendFault::KeyImageSpent(*key_image).into());
            }
        }

        let rings = self
            .private_inputs()
            .iter()
            .map(|input| {
                source.ring_members(&input.offsets).map_err(|e| match e {
                    LedgerError::OutputNotFound(index) => {
                        StructuralError::MissingRingMember(index).into()
                    }
                    e => ValidationError::Storage(e),
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let mut transparent = Vec::with_capacity(self.transparent_inputs().len());
        for reference in self.transparent_inputs() {
            match source.transparent_output(reference)? {
                Some(output) => transparent.push(output),
                None if in_block || source.knows_transaction(&reference.tx_id)? => {
                    return Err(DoubleSpendFault::TransparentOutputSpent(*reference).into());
                }
                None => {
                    return Err(ValidationError::OrphanPending {
                        missing: reference.tx_id,
                    })
                }
            }
        }

        Ok(ResolvedInputs { rings, transparent })
    }

    /// Balance law, range proof, ring signatures and transparent signatures,
    /// in that order.
    pub fn verify_resolved(
        &self,
        resolved: &ResolvedInputs,
        verifier: &dyn ProofVerifier,
    ) -> Result<(), ValidationError> {
        self.check_resolved_counts(resolved)?;
        if !self.is_coinbase() {
            self.check_balance(resolved)?;
        }

        let output_commitments: Vec<Commitment> =
            self.private_outputs().iter().map(|o| o.commitment).collect();
        if !output_commitments.is_empty() {
            let (kind, proof) = self.range_proof().ok_or(ValidationError::Proof)?;
            if !verifier.verify_range_proof(kind, proof, &output_commitments) {
                return Err(ValidationError::Proof);
            }
        }

        let signing_hash = self.signing_hash().unwrap_or_default();

        if let Some(parts) = self.private_parts() {
            let inputs = parts
                .inputs
                .iter()
                .zip(&resolved.rings)
                .zip(&parts.pseudo_outputs)
                .zip(&parts.ring_signatures);
            for (i, (((input, ring), pseudo_output), signature)) in inputs.enumerate() {
                let ring_keys: Vec<[u8; 32]> = ring.iter().map(|o| o.one_time_key).collect();
                let ring_commitments: Vec<Commitment> = ring.iter().map(|o| o.commitment).collect();
                if !verifier.verify_ring_signature(
                    &ring_keys,
                    &ring_commitments,
                    pseudo_output,
                    &signing_hash,
                    &input.key_image,
                    signature,
                ) {
                    return Err(ValidationError::Signature(SignatureFault::Ring(i)));
                }
            }
        }

        if let Some(parts) = self.transparent_parts() {
            let inputs = parts
                .inputs
                .iter()
                .zip(&resolved.transparent)
                .zip(&parts.signatures);
            for (i, ((input, referenced), signature)) in inputs.enumerate() {
                let message = transparent_signing_message(&signing_hash, input, referenced);
                if !verifier.verify_signature(&referenced.address.public_key, &message, signature) {
                    return Err(ValidationError::Signature(SignatureFault::Transparent(i)));
                }
            }
        }

        Ok(())
    }

    /// Every per-input array must line up with the inputs, so no input goes
    /// unchecked when this runs on a transaction that skipped `precheck`.
    fn check_resolved_counts(&self, resolved: &ResolvedInputs) -> Result<(), StructuralError> {
        let mut counts = Vec::new();
        if let Some(parts) = self.private_parts() {
            let inputs = parts.inputs.len();
            counts.push(("rings", inputs, resolved.rings.len()));
            counts.push(("pseudo_outputs", inputs, parts.pseudo_outputs.len()));
            counts.push(("ring_signatures", inputs, parts.ring_signatures.len()));
        }
        if let Some(parts) = self.transparent_parts() {
            let inputs = parts.inputs.len();
            counts.push(("transparent_inputs", inputs, resolved.transparent.len()));
            counts.push(("signatures", inputs, parts.signatures.len()));
        }
        match counts.into_iter().find(|(_, declared, actual)| declared != actual) {
            Some((field, declared, actual)) => Err(StructuralError::CountMismatch {
                field,
                declared,
                actual,
            }),
            None => Ok(()),
        }
    }

    /// `Σ pseudo + Commit(0, Σ transparent in) ==
    ///  Σ private out + Commit(0, Σ transparent out) + Commit(0, fee)`,
    /// or the plain integer law when there is no private part.
    fn check_balance(&self, resolved: &ResolvedInputs) -> Result<(), ValidationError> {
        let transparent_in = checked_total(resolved.transparent.iter().map(|o| &o.amount))?;
        let transparent_out = checked_total(self.transparent_outputs().iter().map(|o| &o.amount))?;

        let Some(parts) = self.private_parts() else {
            let spent = transparent_out
                .checked_add(self.fee())
                .ok_or(ValidationError::Balance)?;
            return if transparent_in == spent {
                Ok(())
            } else {
                Err(ValidationError::Balance)
            };
        };

        let public = |amount: u64| commit(&Scalar::ZERO, amount);
        let balance = || -> Result<bool, shroud_crypto_primitives::Error> {
            let inputs = add_commitments(
                &sum_commitments(&parts.pseudo_outputs)?,
                &public(transparent_in),
            )?;
            let outputs = add_commitments(
                &add_commitments(
                    &sum_commitments(parts.outputs.iter().map(|o| &o.commitment))?,
                    &public(transparent_out),
                )?,
                &public(self.fee()),
            )?;
            Ok(inputs == outputs)
        };

        match balance() {
            Ok(true) => Ok(()),
            _ => Err(ValidationError::Balance),
        }
    }

    /// Resolves and verifies in one step.
    pub fn verify(
        &self,
        source: &impl InputSource,
        verifier: &dyn ProofVerifier,
        in_block: bool,
    ) -> Result<(), ValidationError> {
        let resolved = self.resolve_inputs(source, in_block)?;
        self.verify_resolved(&resolved, verifier)
    }
}
