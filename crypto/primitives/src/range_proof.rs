// Copyright (c) 2024 Shroud Foundation

//! Aggregated Bulletproofs range proofs over amount commitments.
//!
//! Proofs are built on the ledger's own Pedersen generators, so the value
//! commitment a bulletproof covers is exactly [`Commitment::new`]. Aggregation
//! needs a power-of-two commitment count; shorter sets are padded with
//! zero-value, zero-mask commitments on both the proving and verifying side.
//!
//! Two transcript flavours exist. [`RangeProofKind::Standard`] starts from
//! its own label. [`RangeProofKind::Plus`] starts from a different label and
//! binds the number of real commitments before any proof data, so neither
//! kind verifies as the other.

use bulletproofs::{BulletproofGens, PedersenGens, RangeProof as Bulletproof};
use curve25519_dalek::{ristretto::CompressedRistretto, scalar::Scalar};
use merlin::Transcript;
use once_cell::sync::Lazy;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{
    commitment::{blinding_generator, value_generator},
    domain_separators::{RANGE_PROOF_DOMAIN_TAG, RANGE_PROOF_PLUS_DOMAIN_TAG},
    Commitment, Error,
};

/// Number of bits proven per amount.
pub const AMOUNT_BITS: usize = 64;

/// Most commitments one proof can cover.
pub const MAX_COMMITMENTS: usize = 256;

static BULLETPROOF_GENS: Lazy<BulletproofGens> =
    Lazy::new(|| BulletproofGens::new(AMOUNT_BITS, MAX_COMMITMENTS));

fn pedersen_gens() -> PedersenGens {
    PedersenGens {
        B: value_generator(),
        B_blinding: blinding_generator(),
    }
}

/// Which transcript a range proof was produced under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeProofKind {
    /// The plain range proof transcript.
    Standard,
    /// Transcript that also binds the commitment count.
    Plus,
}

impl RangeProofKind {
    fn transcript(self, count: usize) -> Transcript {
        match self {
            RangeProofKind::Standard => Transcript::new(RANGE_PROOF_DOMAIN_TAG),
            RangeProofKind::Plus => {
                let mut transcript = Transcript::new(RANGE_PROOF_PLUS_DOMAIN_TAG);
                transcript.append_u64(b"commitments", count as u64);
                transcript
            }
        }
    }
}

fn check_count(count: usize) -> Result<usize, Error> {
    match count {
        0 => Err(Error::EmptyProof),
        n if n > MAX_COMMITMENTS => Err(Error::LengthMismatch(n, MAX_COMMITMENTS)),
        n => Ok(n.next_power_of_two()),
    }
}

/// An aggregated range proof over one or more amount commitments.
#[derive(Clone, Debug)]
pub struct RangeProof(Bulletproof);

impl RangeProof {
    /// Proves that each `(amount, mask)` opening commits to a 64-bit amount.
    ///
    /// Returns the proof along with the commitments it covers, in order.
    pub fn prove<R: RngCore + CryptoRng>(
        kind: RangeProofKind,
        openings: &[(u64, Scalar)],
        rng: &mut R,
    ) -> Result<(Self, Vec<Commitment>), Error> {
        let padded = check_count(openings.len())?;

        let mut values: Vec<u64> = openings.iter().map(|(amount, _)| *amount).collect();
        let mut blindings: Vec<Scalar> = openings.iter().map(|(_, mask)| *mask).collect();
        values.resize(padded, 0);
        blindings.resize(padded, Scalar::ZERO);

        let mut transcript = kind.transcript(openings.len());
        let (proof, _) = Bulletproof::prove_multiple_with_rng(
            &BULLETPROOF_GENS,
            &pedersen_gens(),
            &mut transcript,
            &values,
            &blindings,
            AMOUNT_BITS,
            rng,
        )
        .map_err(|_| Error::InvalidRangeProof)?;

        let commitments = openings
            .iter()
            .map(|(amount, mask)| Commitment::new(*amount, mask))
            .collect();
        Ok((Self(proof), commitments))
    }

    /// Verifies the proof against the commitments it claims to cover.
    pub fn verify(&self, kind: RangeProofKind, commitments: &[Commitment]) -> Result<(), Error> {
        let padded = check_count(commitments.len())?;

        let mut points: Vec<CompressedRistretto> = commitments
            .iter()
            .map(|commitment| CompressedRistretto(commitment.0))
            .collect();
        points.resize(padded, CompressedRistretto(Commitment::identity().0));

        let mut transcript = kind.transcript(commitments.len());
        self.0
            .verify_multiple(
                &BULLETPROOF_GENS,
                &pedersen_gens(),
                &mut transcript,
                &points,
                AMOUNT_BITS,
            )
            .map_err(|_| Error::InvalidRangeProof)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    /// Parses the encoding produced by [`RangeProof::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Bulletproof::from_bytes(bytes)
            .map(Self)
            .map_err(|_| Error::InvalidRangeProof)
    }
}
