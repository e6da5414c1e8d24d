use crate::config::SamplingConfig;
use crate::error::{Result, SamplerError};
use crate::filter::FilterChain;
use crate::temperature::TemperatureFilter;
use crate::top_k::TopKFilter;
use crate::top_p::TopPFilter;

/// A normalized probability distribution over vocabulary ids.
///
/// Index `i` holds the probability of token `i`. Masked tokens hold `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    probs: Vec<f32>,
}

impl Distribution {
    pub fn probs(&self) -> &[f32] {
        &self.probs
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// Number of tokens with non-zero probability.
    pub fn support(&self) -> usize {
        self.probs.iter().filter(|&&p| p > 0.0).count()
    }

    /// The only viable token, if exactly one remains.
    pub fn single_candidate(&self) -> Option<u32> {
        let mut candidates = self
            .probs
            .iter()
            .enumerate()
            .filter(|(_, &p)| p > 0.0)
            .map(|(i, _)| i as u32);
        match (candidates.next(), candidates.next()) {
            (Some(id), None) => Some(id),
            _ => None,
        }
    }

}

/// Result of processing one step's logits.
#[derive(Debug, Clone, PartialEq)]
pub enum Processed {
    /// Temperature was zero; the argmax token, no sampling needed.
    Greedy(u32),
    /// A distribution ready for [`crate::TokenSampler`].
    Distribution(Distribution),
}

/// Turns a raw logit vector into either an argmax choice or a distribution.
///
/// The filter order is fixed: temperature, then top-k, then top-p. Top-p
/// measures its cumulative mass over whatever top-k left standing.
pub struct LogitProcessor {
    greedy: bool,
    chain: FilterChain,
}

impl LogitProcessor {
    pub fn new(config: &SamplingConfig) -> Self {
        let greedy = config.is_greedy();
        let chain = if greedy {
            FilterChain::new()
        } else {
            FilterChain::new()
                .with(Box::new(TemperatureFilter::new(config.temperature())))
                .with(Box::new(TopKFilter::new(config.top_k())))
                .with(Box::new(TopPFilter::new(config.top_p())))
        };

        Self { greedy, chain }
    }

    /// Filter names in the order they run. Empty on the greedy path.
    pub fn stages(&self) -> Vec<&str> {
        self.chain.names()
    }

    pub fn process(&self, logits: &[f32]) -> Result<Processed> {
        if self.greedy {
            return argmax(logits)
                .map(Processed::Greedy)
                .ok_or(SamplerError::EmptyDistribution);
        }

        let mut scaled = logits.to_vec();
        self.chain.apply(&mut scaled);
        softmax(&scaled).map(Processed::Distribution)
    }
}

/// Index of the largest logit. Ties resolve to the lowest index.
pub fn argmax(logits: &[f32]) -> Option<u32> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &logit) in logits.iter().enumerate() {
        if logit.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| logit > b) {
            best = Some((i, logit));
        }
    }
    best.map(|(i, _)| i as u32)
}

/// Numerically stable softmax. `-inf` entries get probability zero.
pub fn softmax(logits: &[f32]) -> Result<Distribution> {
    let max_logit = logits
        .iter()
        .copied()
        .filter(|l| l.is_finite())
        .fold(f32::NEG_INFINITY, f32::max);
    if !max_logit.is_finite() {
        return Err(SamplerError::EmptyDistribution);
    }

    let exps: Vec<f32> = logits
        .iter()
        .map(|&l| if l.is_finite() { (l - max_logit).exp() } else { 0.0 })
        .collect();
    // Accumulate in f64 so large vocabularies still normalize to 1.
    let sum: f64 = exps.iter().map(|&e| f64::from(e)).sum();
    if sum <= 0.0 {
        return Err(SamplerError::EmptyDistribution);
    }

    Ok(Distribution {
        probs: exps
            .into_iter()
            .map(|e| (f64::from(e) / sum) as f32)
            .collect(),
    })
}
