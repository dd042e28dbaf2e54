// Copyright (c) 2024 Shroud Foundation

//! Structural checks that run before any cryptography.

use super::{
    PrivateParts, StructuralError, Transaction, TransparentParts, RING_SIZE, TX_VERSION,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Configured upper bounds on transaction shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxLimits {
    pub max_inputs: usize,
    pub max_outputs: usize,
}

impl Default for TxLimits {
    fn default() -> Self {
        Self {
            max_inputs: 255,
            max_outputs: 255,
        }
    }
}

fn check_count(field: &'static str, declared: u8, actual: usize) -> Result<(), StructuralError> {
    if declared as usize != actual {
        return Err(StructuralError::CountMismatch {
            field,
            declared: declared as usize,
            actual,
        });
    }
    Ok(())
}

fn check_derived(
    field: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), StructuralError> {
    if expected != actual {
        return Err(StructuralError::CountMismatch {
            field,
            declared: expected,
            actual,
        });
    }
    Ok(())
}

fn check_private_counts(parts: &PrivateParts) -> Result<(), StructuralError> {
    check_count("num_inputs", parts.num_inputs, parts.inputs.len())?;
    check_count("num_outputs", parts.num_outputs, parts.outputs.len())?;
    check_derived("pseudo_outputs", parts.inputs.len(), parts.pseudo_outputs.len())?;
    check_derived("ring_signatures", parts.inputs.len(), parts.ring_signatures.len())
}

fn check_transparent_counts(parts: &TransparentParts) -> Result<(), StructuralError> {
    check_count("num_inputs", parts.num_inputs, parts.inputs.len())?;
    check_count("num_outputs", parts.num_outputs, parts.outputs.len())?;
    check_derived("signatures", parts.inputs.len(), parts.signatures.len())
}

impl Transaction {
    /// Fails fast on malformed layout. `must_be_coinbase` is true only for the
    /// first transaction of a block.
    pub fn precheck(&self, must_be_coinbase: bool, limits: &TxLimits) -> Result<(), StructuralError> {
        match (must_be_coinbase, self.is_coinbase()) {
            (true, false) => return Err(StructuralError::ExpectedCoinbase),
            (false, true) => return Err(StructuralError::UnexpectedCoinbase),
            _ => {}
        }

        if self.version() != TX_VERSION {
            return Err(StructuralError::UnsupportedVersion(self.version()));
        }

        // Declared counts against actual array lengths.
        match self {
            Transaction::Coinbase(tx) => {
                check_count("num_outputs", tx.num_outputs, tx.outputs.len())?;
            }
            Transaction::Private(tx) => check_private_counts(&tx.private)?,
            Transaction::Transparent(tx) => check_transparent_counts(&tx.transparent)?,
            Transaction::Mixed(tx) => {
                check_private_counts(&tx.private)?;
                check_transparent_counts(&tx.transparent)?;
            }
        }

        let num_inputs = self.private_inputs().len() + self.transparent_inputs().len();
        let num_outputs = self.num_outputs();
        if num_outputs == 0 {
            return Err(StructuralError::NoOutputs);
        }
        if !self.is_coinbase() && num_inputs == 0 {
            return Err(StructuralError::NoInputs);
        }
        if num_inputs > limits.max_inputs {
            return Err(StructuralError::TooMany {
                field: "inputs",
                count: num_inputs,
                max: limits.max_inputs,
            });
        }
        if num_outputs > limits.max_outputs {
            return Err(StructuralError::TooMany {
                field: "outputs",
                count: num_outputs,
                max: limits.max_outputs,
            });
        }

        for input in self.private_inputs() {
            if input.offsets.len() != RING_SIZE {
                return Err(StructuralError::RingSize(input.offsets.len()));
            }
            let mut members = HashSet::with_capacity(RING_SIZE);
            for offset in &input.offsets {
                if !members.insert(*offset) {
                    return Err(StructuralError::DuplicateRingMember(*offset));
                }
            }
        }

        let has_private_outputs = !self.private_outputs().is_empty();
        match (has_private_outputs, self.range_proofs()) {
            (true, (None, None)) => return Err(StructuralError::MissingRangeProof),
            (true, (Some(_), Some(_))) => return Err(StructuralError::ConflictingRangeProofs),
            (false, (Some(_), _)) | (false, (_, Some(_))) => {
                return Err(StructuralError::UnexpectedRangeProof)
            }
            _ => {}
        }

        if has_private_outputs != self.tx_key().is_some() {
            return Err(StructuralError::TxKeyMismatch);
        }

        for (i, output) in self.private_outputs().iter().enumerate() {
            if output.commitment.is_identity() {
                return Err(StructuralError::IdentityCommitment(i));
            }
        }
        for (i, output) in self.transparent_outputs().iter().enumerate() {
            if output.amount == 0 {
                return Err(StructuralError::ZeroAmount(i));
            }
        }

        let mut key_images = HashSet::new();
        for key_image in self.key_images() {
            if !key_images.insert(key_image) {
                return Err(StructuralError::DuplicateKeyImage(*key_image));
            }
        }
        let mut references = HashSet::new();
        for reference in self.transparent_inputs() {
            if !references.insert(reference) {
                return Err(StructuralError::DuplicateInput(*reference));
            }
        }

        if let Some(cached) = self.cached_signing_hash() {
            if Some(cached) != self.signing_hash() {
                return Err(StructuralError::SigningHashMismatch);
            }
        }

        Ok(())
    }
}
