// Copyright (c) 2024 Shroud Foundation

//! Domain separation tags for every hash used in this crate.

/// Hash-to-point for key images and ring members.
pub const HASH_TO_POINT_DOMAIN_TAG: &[u8] = b"shroud_hash_to_point";

/// Derivation of the Pedersen value generator `H`.
pub const VALUE_GENERATOR_DOMAIN_TAG: &[u8] = b"shroud_value_generator";

/// CLSAG aggregation coefficient for the key component.
pub const CLSAG_AGG_COEFF_P_DOMAIN_TAG: &[u8] = b"shroud_clsag_agg_p";

/// CLSAG aggregation coefficient for the commitment component.
pub const CLSAG_AGG_COEFF_C_DOMAIN_TAG: &[u8] = b"shroud_clsag_agg_c";

/// CLSAG round challenge.
pub const CLSAG_ROUND_HASH_DOMAIN_TAG: &[u8] = b"shroud_clsag_round";

/// Range proof challenges, one commitment per transcript.
pub const RANGE_PROOF_DOMAIN_TAG: &[u8] = b"shroud_range_proof";

/// Range proof challenges bound to the whole commitment set.
pub const RANGE_PROOF_PLUS_DOMAIN_TAG: &[u8] = b"shroud_range_proof_plus";
