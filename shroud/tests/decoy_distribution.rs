// Copyright (c) 2024 Shroud Foundation

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use shroud::decoy_selection::sample_ring;
use shroud::transaction::RING_SIZE;
use statrs::distribution::{ChiSquared, ContinuousCDF};

const TRIALS: usize = 10_000;

#[test]
fn test_real_position_is_uniform() {
    let mut rng = ChaCha20Rng::seed_from_u64(2024);
    let mut buckets = [0u64; RING_SIZE];

    for trial in 0..TRIALS {
        let real_index = (trial as u64 * 7_919) % 1_000_000;
        let (ring, position) = sample_ring(real_index, 1_000_000, &mut rng).unwrap();
        assert_eq!(ring[position], real_index);
        buckets[position] += 1;
    }

    let expected = TRIALS as f64 / RING_SIZE as f64;
    let statistic: f64 = buckets
        .iter()
        .map(|observed| (*observed as f64 - expected).powi(2) / expected)
        .sum();
    let dist = ChiSquared::new((RING_SIZE - 1) as f64).unwrap();
    let p_value = 1.0 - dist.cdf(statistic);

    assert!(p_value > 1e-4, "chi-square {statistic}, p = {p_value}");
}

#[test]
fn test_decoys_favor_the_low_end() {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let max = 1_000_000u64;
    let (ring, position) = sample_ring(max - 1, max, &mut rng).unwrap();

    let low = ring
        .iter()
        .enumerate()
        .filter(|(i, index)| *i != position && **index <= max * 3 / 8)
        .count();
    // At least the skewed half lands in the lowest 3/8.
    assert!(low >= RING_SIZE - 1 - 32);
}
