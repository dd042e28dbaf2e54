// Copyright (c) 2024 Shroud Foundation

//! CLSAG (Concise Linkable Spontaneous Anonymous Group) signatures.
//!
//! Private inputs are signed with a CLSAG over a ring of
//! `(one-time key, commitment)` pairs. The signature proves knowledge of the
//! one-time private key of one ring member and that the pseudo-output commits
//! to the same amount as that member, without revealing which member it is.
//!
//! Reference: "Concise Linkable Ring Signatures and Forgery Against Adversarial
//! Keys" https://eprint.iacr.org/2019/654

#![allow(non_snake_case)]

use blake2::{Blake2b512, Digest};
use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use rand_core::CryptoRngCore;

use crate::{
    domain_separators::{
        CLSAG_AGG_COEFF_C_DOMAIN_TAG, CLSAG_AGG_COEFF_P_DOMAIN_TAG, CLSAG_ROUND_HASH_DOMAIN_TAG,
    },
    hash_to_point, public_key_from_private, Commitment, Error, KeyImage,
};

/// One member of a ring: a one-time public key and its amount commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RingMember {
    /// The output's one-time public key.
    pub target_key: [u8; 32],
    /// The output's amount commitment.
    pub commitment: Commitment,
}

/// CLSAG signature for a ring of public keys and amount commitments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clsag {
    /// The initial challenge `c[0]`.
    pub c_zero: Scalar,

    /// Responses `s[0], s[1], ..., s[ring_size-1]`.
    pub responses: Vec<Scalar>,

    /// Key image "spent" by this signature.
    pub key_image: KeyImage,

    /// Auxiliary key image D = z * Hp(P) for the commitment component.
    pub commitment_key_image: KeyImage,
}

impl Clsag {
    /// Sign a ring of input addresses and amount commitments using CLSAG.
    ///
    /// # Arguments
    /// * `message` - Message to be signed.
    /// * `ring` - The ring, including the real input.
    /// * `real_index` - The index in the ring of the real input.
    /// * `onetime_private_key` - The real input's private key.
    /// * `value` - Value of the real input.
    /// * `blinding` - Blinding of the real input's commitment.
    /// * `pseudo_output_blinding` - Blinding of the pseudo-output.
    /// * `rng` - Cryptographic RNG.
    #[allow(clippy::too_many_arguments)]
    pub fn sign(
        message: &[u8],
        ring: &[RingMember],
        real_index: usize,
        onetime_private_key: &Scalar,
        value: u64,
        blinding: &Scalar,
        pseudo_output_blinding: &Scalar,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<Self, Error> {
        let ring_size = ring.len();

        if ring_size == 0 || real_index >= ring_size {
            return Err(Error::IndexOutOfBounds);
        }

        let G = RISTRETTO_BASEPOINT_POINT;

        let decompressed_ring = decompress_ring(ring)?;

        let pseudo_output = Commitment::new(value, pseudo_output_blinding).decompress()?;

        // Z[i] = pseudo_output - input_commitment[i]
        let z_points: Vec<RistrettoPoint> = decompressed_ring
            .iter()
            .map(|(_, commitment)| pseudo_output - commitment)
            .collect();

        // The secret commitment difference for the real input
        let z: Scalar = pseudo_output_blinding - blinding;

        if z_points[real_index] != z * G {
            return Err(Error::ValueNotConserved);
        }

        let x = *onetime_private_key;
        let real_pubkey = ring[real_index].target_key;
        if public_key_from_private(&x) != real_pubkey {
            return Err(Error::InvalidSignature);
        }

        let key_image = KeyImage::from_private_key(&x);
        let I = key_image.decompress()?;

        let Hp_real = hash_to_point(&real_pubkey);
        let D = z * Hp_real;
        let commitment_key_image = KeyImage::from_point(&D);

        let (mu_P, mu_C) =
            compute_aggregation_coefficients(ring, &key_image, &commitment_key_image);

        let mut responses = vec![Scalar::ZERO; ring_size];
        for (i, response) in responses.iter_mut().enumerate() {
            if i != real_index {
                *response = Scalar::random(rng);
            }
        }

        let alpha = Scalar::random(rng);

        // L = alpha * G, R = alpha * Hp(P_real)
        let mut challenges = vec![Scalar::ZERO; ring_size];
        challenges[(real_index + 1) % ring_size] = compute_round_hash(
            message,
            &key_image,
            &commitment_key_image,
            &(alpha * G),
            &(alpha * Hp_real),
        );

        // Go around the ring from real_index + 1 back to real_index
        for n in 1..ring_size {
            let i = (real_index + n) % ring_size;
            let (L_i, R_i) = round_points(
                &decompressed_ring[i].0,
                &ring[i].target_key,
                &z_points[i],
                &challenges[i],
                &responses[i],
                &mu_P,
                &mu_C,
                &I,
                &D,
            );
            challenges[(i + 1) % ring_size] =
                compute_round_hash(message, &key_image, &commitment_key_image, &L_i, &R_i);
        }

        // s = alpha - c * (mu_P * x + mu_C * z)
        let c_real = challenges[real_index];
        responses[real_index] = alpha - c_real * (mu_P * x + mu_C * z);

        Ok(Clsag {
            c_zero: challenges[0],
            responses,
            key_image,
            commitment_key_image,
        })
    }

    /// Verify a CLSAG signature against a ring and pseudo-output.
    pub fn verify(
        &self,
        message: &[u8],
        ring: &[RingMember],
        pseudo_output: &Commitment,
    ) -> Result<(), Error> {
        let ring_size = ring.len();

        if self.responses.len() != ring_size {
            return Err(Error::LengthMismatch(self.responses.len(), ring_size));
        }

        if ring_size == 0 {
            return Err(Error::IndexOutOfBounds);
        }

        let I = self.key_image.decompress()?;
        let D = self.commitment_key_image.decompress()?;
        let pseudo_output = pseudo_output.decompress()?;

        let decompressed_ring = decompress_ring(ring)?;

        let (mu_P, mu_C) =
            compute_aggregation_coefficients(ring, &self.key_image, &self.commitment_key_image);

        let mut c = self.c_zero;
        for (i, (P_i, commitment)) in decompressed_ring.iter().enumerate() {
            let (L_i, R_i) = round_points(
                P_i,
                &ring[i].target_key,
                &(pseudo_output - commitment),
                &c,
                &self.responses[i],
                &mu_P,
                &mu_C,
                &I,
                &D,
            );
            c = compute_round_hash(
                message,
                &self.key_image,
                &self.commitment_key_image,
                &L_i,
                &R_i,
            );
        }

        if c == self.c_zero {
            Ok(())
        } else {
            Err(Error::InvalidSignature)
        }
    }

    /// Serializes as `c0 ‖ I ‖ D ‖ s[0..n]`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(96 + 32 * self.responses.len());
        bytes.extend_from_slice(self.c_zero.as_bytes());
        bytes.extend_from_slice(self.key_image.as_bytes());
        bytes.extend_from_slice(self.commitment_key_image.as_bytes());
        for response in &self.responses {
            bytes.extend_from_slice(response.as_bytes());
        }
        bytes
    }

    /// Parses the encoding produced by [`Clsag::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < 128 || bytes.len() % 32 != 0 {
            return Err(Error::LengthMismatch(bytes.len(), 128));
        }
        let mut chunks = bytes.chunks_exact(32).map(to_array);

        let c_zero = chunks.next().map(scalar_from_bytes).ok_or(Error::InvalidScalar)??;
        let key_image = chunks.next().map(KeyImage).ok_or(Error::InvalidKeyImage)?;
        let commitment_key_image = chunks.next().map(KeyImage).ok_or(Error::InvalidKeyImage)?;
        let responses = chunks.map(scalar_from_bytes).collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            c_zero,
            responses,
            key_image,
            commitment_key_image,
        })
    }
}

fn decompress_ring(ring: &[RingMember]) -> Result<Vec<(RistrettoPoint, RistrettoPoint)>, Error> {
    ring.iter()
        .map(|member| {
            let key = CompressedRistretto(member.target_key)
                .decompress()
                .ok_or(Error::InvalidCurvePoint)?;
            Ok((key, member.commitment.decompress()?))
        })
        .collect()
}

/// One step around the ring:
/// L = s * G + c * (mu_P * P + mu_C * Z),
/// R = s * Hp(P) + c * (mu_P * I + mu_C * D).
#[allow(clippy::too_many_arguments)]
fn round_points(
    P: &RistrettoPoint,
    P_bytes: &[u8; 32],
    Z: &RistrettoPoint,
    c: &Scalar,
    s: &Scalar,
    mu_P: &Scalar,
    mu_C: &Scalar,
    I: &RistrettoPoint,
    D: &RistrettoPoint,
) -> (RistrettoPoint, RistrettoPoint) {
    let W = mu_P * P + mu_C * Z;
    let L = s * RISTRETTO_BASEPOINT_POINT + c * W;
    let R = s * hash_to_point(P_bytes) + c * (mu_P * I + mu_C * D);
    (L, R)
}

/// Compute the aggregation coefficients mu_P and mu_C.
fn compute_aggregation_coefficients(
    ring: &[RingMember],
    key_image: &KeyImage,
    commitment_key_image: &KeyImage,
) -> (Scalar, Scalar) {
    let coefficient = |domain_tag: &[u8]| {
        let mut hasher = Blake2b512::new();
        hasher.update(domain_tag);
        for member in ring {
            hasher.update(member.target_key);
            hasher.update(member.commitment.as_bytes());
        }
        hasher.update(key_image.as_bytes());
        hasher.update(commitment_key_image.as_bytes());
        Scalar::from_hash(hasher)
    };

    (
        coefficient(CLSAG_AGG_COEFF_P_DOMAIN_TAG),
        coefficient(CLSAG_AGG_COEFF_C_DOMAIN_TAG),
    )
}

/// Compute the round hash for challenge derivation.
fn compute_round_hash(
    message: &[u8],
    key_image: &KeyImage,
    commitment_key_image: &KeyImage,
    L: &RistrettoPoint,
    R: &RistrettoPoint,
) -> Scalar {
    let mut hasher = Blake2b512::new();
    hasher.update(CLSAG_ROUND_HASH_DOMAIN_TAG);
    hasher.update(message);
    hasher.update(key_image.as_bytes());
    hasher.update(commitment_key_image.as_bytes());
    hasher.update(L.compress().as_bytes());
    hasher.update(R.compress().as_bytes());
    Scalar::from_hash(hasher)
}

fn to_array(chunk: &[u8]) -> [u8; 32] {
    let mut array = [0u8; 32];
    array.copy_from_slice(chunk);
    array
}

pub(crate) fn scalar_from_bytes(bytes: [u8; 32]) -> Result<Scalar, Error> {
    Option::from(Scalar::from_canonical_bytes(bytes)).ok_or(Error::InvalidScalar)
}
