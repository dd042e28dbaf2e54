// Copyright (c) 2024 Shroud Foundation

//! The verification boundary consumed by the ledger core.

use crate::{
    clsag::{Clsag, RingMember},
    range_proof::{RangeProof, RangeProofKind},
    Commitment, Hash, KeyImage,
};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

#[cfg(any(test, feature = "test_utils"))]
use mockall::automock;

/// Proof and signature checks the ledger delegates.
///
/// Every method answers a yes/no question; malformed encodings are a "no".
#[cfg_attr(any(test, feature = "test_utils"), automock)]
pub trait ProofVerifier: Send + Sync {
    /// Checks a range proof of the given kind over `commitments`.
    fn verify_range_proof(
        &self,
        kind: RangeProofKind,
        proof: &[u8],
        commitments: &[Commitment],
    ) -> bool;

    /// Checks a ring signature binding `key_image` and `pseudo_output` to one
    /// member of the ring described by `ring_keys` and `ring_commitments`.
    fn verify_ring_signature(
        &self,
        ring_keys: &[[u8; 32]],
        ring_commitments: &[Commitment],
        pseudo_output: &Commitment,
        message: &Hash,
        key_image: &KeyImage,
        signature: &[u8],
    ) -> bool;

    /// Checks an ed25519 signature.
    fn verify_signature(&self, public_key: &[u8; 32], message: &Hash, signature: &[u8]) -> bool;
}

/// [`ProofVerifier`] backed by this crate's CLSAG, range proof and ed25519
/// implementations.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardVerifier;

impl ProofVerifier for StandardVerifier {
    fn verify_range_proof(
        &self,
        kind: RangeProofKind,
        proof: &[u8],
        commitments: &[Commitment],
    ) -> bool {
        RangeProof::from_bytes(proof)
            .and_then(|proof| proof.verify(kind, commitments))
            .is_ok()
    }

    fn verify_ring_signature(
        &self,
        ring_keys: &[[u8; 32]],
        ring_commitments: &[Commitment],
        pseudo_output: &Commitment,
        message: &Hash,
        key_image: &KeyImage,
        signature: &[u8],
    ) -> bool {
        if ring_keys.len() != ring_commitments.len() {
            return false;
        }
        let Ok(clsag) = Clsag::from_bytes(signature) else {
            return false;
        };
        if clsag.key_image != *key_image {
            return false;
        }
        let ring: Vec<RingMember> = ring_keys
            .iter()
            .zip(ring_commitments)
            .map(|(target_key, commitment)| RingMember {
                target_key: *target_key,
                commitment: *commitment,
            })
            .collect();
        clsag.verify(message, &ring, pseudo_output).is_ok()
    }

    fn verify_signature(&self, public_key: &[u8; 32], message: &Hash, signature: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(public_key) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify(message, &signature).is_ok()
    }
}
