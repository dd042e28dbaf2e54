// Copyright (c) 2024 Shroud Foundation

use crate::{hash_to_point, public_key_from_private, Error};
use core::fmt;
use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// The "image" of a private key `x`: I = x * Hp(x * G) = x * Hp(P).
///
/// Spending the same output twice always yields the same key image, which is
/// what the ledger's spent-key set detects.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Zeroize,
)]
pub struct KeyImage(pub [u8; 32]);

impl KeyImage {
    /// Derives the key image of a one-time private key.
    pub fn from_private_key(private_key: &Scalar) -> Self {
        let public_key = public_key_from_private(private_key);
        Self::from_point(&(private_key * hash_to_point(&public_key)))
    }

    /// Compresses a curve point into a key image.
    pub fn from_point(point: &RistrettoPoint) -> Self {
        Self(point.compress().to_bytes())
    }

    /// View the key image as bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Decompresses into a curve point.
    pub fn decompress(&self) -> Result<RistrettoPoint, Error> {
        CompressedRistretto(self.0)
            .decompress()
            .ok_or(Error::InvalidKeyImage)
    }
}

// Many tests use this
impl From<u64> for KeyImage {
    fn from(n: u64) -> Self {
        Self::from_private_key(&Scalar::from(n))
    }
}

impl AsRef<[u8]> for KeyImage {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for KeyImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyImage({})", hex::encode(self.0))
    }
}

impl fmt::Display for KeyImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
