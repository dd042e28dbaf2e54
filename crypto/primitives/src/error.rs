// Copyright (c) 2024 Shroud Foundation

//! Errors which can occur when building or checking proofs

use displaydoc::Display;
use serde::{Deserialize, Serialize};

/// An error which can occur when signing, proving or verifying
#[derive(Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
pub enum Error {
    /// Incorrect length, provided `{0}`, required `{1}`.
    LengthMismatch(usize, usize),

    /// Index out of bounds
    IndexOutOfBounds,

    /// Invalid curve point
    InvalidCurvePoint,

    /// Non-canonical scalar encoding
    InvalidScalar,

    /// The signature was not able to be validated
    InvalidSignature,

    /// Failed to decompress a KeyImage
    InvalidKeyImage,

    /// Value not conserved
    ValueNotConserved,

    /// The range proof was not able to be validated
    InvalidRangeProof,

    /// Nothing to prove
    EmptyProof,
}

impl std::error::Error for Error {}
