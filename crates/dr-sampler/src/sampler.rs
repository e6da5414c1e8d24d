use rand::distributions::{Distribution as _, WeightedIndex};
use rand::Rng;

use crate::error::{Result, SamplerError};
use crate::processor::{Distribution, Processed};

/// Draws token ids from processed distributions.
///
/// Randomness comes from the caller, so a seeded `StdRng` or a mock RNG can
/// stand in for deterministic runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenSampler;

impl TokenSampler {
    pub fn new() -> Self {
        Self
    }

    /// Categorical draw: token `i` is chosen with probability `probs[i]`.
    ///
    /// A distribution with a single viable token returns it without touching
    /// the RNG.
    pub fn sample<R: Rng + ?Sized>(&self, dist: &Distribution, rng: &mut R) -> Result<u32> {
        if let Some(id) = dist.single_candidate() {
            return Ok(id);
        }

        let index = WeightedIndex::<f32>::new(dist.probs())
            .map_err(|_| SamplerError::EmptyDistribution)?;
        Ok(index.sample(rng) as u32)
    }

    /// Resolve a processed step to a token id.
    pub fn select<R: Rng + ?Sized>(&self, processed: &Processed, rng: &mut R) -> Result<u32> {
        match processed {
            Processed::Greedy(id) => Ok(*id),
            Processed::Distribution(dist) => self.sample(dist, rng),
        }
    }
}
