// Copyright (c) 2024 Shroud Foundation

//! Pedersen commitments `amount * H + mask * G` over Ristretto.

use crate::{domain_separators::VALUE_GENERATOR_DOMAIN_TAG, Error};
use core::fmt;
use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
    traits::Identity,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use sha2::Sha512;

static VALUE_GENERATOR: Lazy<RistrettoPoint> =
    Lazy::new(|| RistrettoPoint::hash_from_bytes::<Sha512>(VALUE_GENERATOR_DOMAIN_TAG));

/// The generator `H` that amounts are committed on.
pub fn value_generator() -> RistrettoPoint {
    *VALUE_GENERATOR
}

/// The generator `G` that blinding masks are committed on.
pub fn blinding_generator() -> RistrettoPoint {
    RISTRETTO_BASEPOINT_POINT
}

/// A compressed Pedersen commitment.
///
/// The identity element (a commitment to zero with a zero mask) compresses to
/// 32 zero bytes.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Commitment(pub [u8; 32]);

impl Commitment {
    /// Commits to `amount` under `mask`.
    pub fn new(amount: u64, mask: &Scalar) -> Self {
        Self::from_point(&(Scalar::from(amount) * value_generator() + mask * blinding_generator()))
    }

    /// The identity commitment.
    pub fn identity() -> Self {
        Self::from_point(&RistrettoPoint::identity())
    }

    /// Compresses a curve point into a commitment.
    pub fn from_point(point: &RistrettoPoint) -> Self {
        Self(point.compress().to_bytes())
    }

    /// True for the identity element.
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// View the commitment as bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Decompresses into a curve point.
    pub fn decompress(&self) -> Result<RistrettoPoint, Error> {
        CompressedRistretto(self.0)
            .decompress()
            .ok_or(Error::InvalidCurvePoint)
    }
}

impl AsRef<[u8]> for Commitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", hex::encode(self.0))
    }
}

/// `Commit(mask, amount)`.
pub fn commit(mask: &Scalar, amount: u64) -> Commitment {
    Commitment::new(amount, mask)
}

/// Homomorphic sum of two commitments.
pub fn add_commitments(a: &Commitment, b: &Commitment) -> Result<Commitment, Error> {
    Ok(Commitment::from_point(&(a.decompress()? + b.decompress()?)))
}

/// Homomorphic sum of any number of commitments; the empty sum is the
/// identity.
pub fn sum_commitments<'a>(
    commitments: impl IntoIterator<Item = &'a Commitment>,
) -> Result<Commitment, Error> {
    let mut total = RistrettoPoint::identity();
    for commitment in commitments {
        total += commitment.decompress()?;
    }
    Ok(Commitment::from_point(&total))
}
