// Copyright (c) 2024 Shroud Foundation

//! Cryptographic primitives for the Shroud ledger.
//!
//! Everything the ledger core needs from elliptic-curve cryptography lives
//! here: Pedersen commitments over Ristretto, key images, CLSAG ring
//! signatures, Bulletproofs range proofs and ed25519 transparent
//! signatures. The core consumes verification through [`ProofVerifier`] and
//! never touches curve arithmetic directly.

pub mod clsag;
pub mod range_proof;

mod commitment;
mod domain_separators;
mod error;
mod key_image;
mod verifier;

pub use crate::{
    commitment::{
        add_commitments, blinding_generator, commit, sum_commitments, value_generator, Commitment,
    },
    error::Error,
    key_image::KeyImage,
    range_proof::{RangeProof, RangeProofKind},
    verifier::{ProofVerifier, StandardVerifier},
};
pub use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};

#[cfg(any(test, feature = "test_utils"))]
pub use crate::verifier::MockProofVerifier;

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use sha2::{Digest, Sha256, Sha512};

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// SHA-256 of `bytes`.
pub fn hash(bytes: &[u8]) -> Hash {
    Sha256::digest(bytes).into()
}

/// SHA-256 over the concatenation of `parts`, without allocating.
pub fn hash_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Hashes a public key to a curve point, `Hp(P)`.
pub fn hash_to_point(public_key: &[u8; 32]) -> RistrettoPoint {
    let mut input = Vec::with_capacity(domain_separators::HASH_TO_POINT_DOMAIN_TAG.len() + 32);
    input.extend_from_slice(domain_separators::HASH_TO_POINT_DOMAIN_TAG);
    input.extend_from_slice(public_key);
    RistrettoPoint::hash_from_bytes::<Sha512>(&input)
}

/// The one-time public key `x * G` of a one-time private key.
pub fn public_key_from_private(private_key: &Scalar) -> [u8; 32] {
    (private_key * RISTRETTO_BASEPOINT_POINT).compress().to_bytes()
}
