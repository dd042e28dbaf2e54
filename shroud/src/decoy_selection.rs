// Copyright (c) 2024 Shroud Foundation

//! Ring member selection.
//!
//! A ring is the real output plus 63 decoys drawn from the committed output
//! index, shuffled so the real member's position is uniform.
//!
//! ## Distribution
//!
//! The default sampler draws half of the decoys uniformly over `[1, max)` and
//! the rest from `floor(max · 3/4 · sqrt(u/4))` with `u` uniform in `[0, 1)`.
//! The second draw only reaches the lowest 3/8 of the index and favors its
//! low end. Rings must be reproducible across implementations, so the
//! formula is kept exactly as is.

use rand::{seq::SliceRandom, Rng};
use std::collections::HashSet;
use thiserror::Error;

use crate::transaction::RING_SIZE;

/// Decoys drawn uniformly before switching to the skewed draw.
pub const UNIFORM_DECOYS: usize = 32;

/// Smallest output count a ring may be sampled from.
pub const MIN_OUTPUTS_FOR_RING: u64 = 256;

/// Draw budget per ring before giving up.
const MAX_DRAWS: usize = RING_SIZE * 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecoyError {
    #[error("{available} outputs committed, rings need at least {required}")]
    InsufficientOutputs { available: u64, required: u64 },

    #[error("real output {real_index} is beyond the {max} committed outputs")]
    RealIndexOutOfRange { real_index: u64, max: u64 },

    #[error("no distinct decoys found after {0} draws")]
    Exhausted(usize),
}

// ============================================================================
// Draws
// ============================================================================

fn uniform_index(max: u64, rng: &mut impl Rng) -> u64 {
    rng.gen_range(1..max)
}

fn skewed_index(max: u64, rng: &mut impl Rng) -> u64 {
    let u: f64 = rng.gen();
    (max as f64 * 3.0 / 4.0 * (u / 4.0).sqrt()).floor() as u64
}

struct RingDraw {
    real_index: u64,
    chosen: HashSet<u64>,
    members: Vec<u64>,
    draws: usize,
}

impl RingDraw {
    fn new(real_index: u64, max: u64) -> Result<Self, DecoyError> {
        if max < MIN_OUTPUTS_FOR_RING {
            return Err(DecoyError::InsufficientOutputs {
                available: max,
                required: MIN_OUTPUTS_FOR_RING,
            });
        }
        if real_index >= max {
            return Err(DecoyError::RealIndexOutOfRange { real_index, max });
        }
        let mut chosen = HashSet::with_capacity(RING_SIZE);
        chosen.insert(real_index);
        Ok(Self {
            real_index,
            chosen,
            members: Vec::with_capacity(RING_SIZE),
            draws: 0,
        })
    }

    /// Adds decoys from `draw` until `count` are held.
    fn fill(&mut self, count: usize, mut draw: impl FnMut() -> u64) -> Result<(), DecoyError> {
        while self.members.len() < count {
            if self.draws == MAX_DRAWS {
                return Err(DecoyError::Exhausted(MAX_DRAWS));
            }
            self.draws += 1;

            let candidate = draw();
            if candidate != 0 && self.chosen.insert(candidate) {
                self.members.push(candidate);
            }
        }
        Ok(())
    }

    fn finish(mut self, rng: &mut impl Rng) -> (Vec<u64>, usize) {
        self.members.push(self.real_index);
        self.members.shuffle(rng);
        let position = self
            .members
            .iter()
            .position(|i| *i == self.real_index)
            .unwrap_or_default();
        (self.members, position)
    }
}

// ============================================================================
// Samplers
// ============================================================================

/// Sample a ring for `real_index` from `max` committed outputs.
///
/// Returns the member indices in ring order and the real member's position.
pub fn sample_ring(
    real_index: u64,
    max: u64,
    rng: &mut impl Rng,
) -> Result<(Vec<u64>, usize), DecoyError> {
    let mut ring = RingDraw::new(real_index, max)?;
    ring.fill(UNIFORM_DECOYS, || uniform_index(max, rng))?;
    ring.fill(RING_SIZE - 1, || skewed_index(max, rng))?;
    Ok(ring.finish(rng))
}

/// Like [`sample_ring`], with every decoy from the skewed draw.
pub fn sample_ring_uniform(
    real_index: u64,
    max: u64,
    rng: &mut impl Rng,
) -> Result<(Vec<u64>, usize), DecoyError> {
    let mut ring = RingDraw::new(real_index, max)?;
    ring.fill(RING_SIZE - 1, || skewed_index(max, rng))?;
    Ok(ring.finish(rng))
}
