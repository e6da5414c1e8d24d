use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SamplerError};

pub const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.0..=2.0;
pub const TOP_P_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const TOP_K_RANGE: RangeInclusive<usize> = 1..=100;
pub const MAX_LENGTH_RANGE: RangeInclusive<usize> = 1..=512;
pub const NUM_RETURN_SEQUENCES_RANGE: RangeInclusive<usize> = 1..=3;

/// Immutable sampling parameters shared by every sequence of one request.
///
/// A `SamplingConfig` can only be built through [`SamplingConfig::new`],
/// which rejects out-of-range values, or [`SamplingConfig::clamped`], which
/// forces every field into range. Deserialization goes through `new`, so a
/// value of this type is always in range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSamplingConfig")]
pub struct SamplingConfig {
    temperature: f32,
    top_p: f32,
    top_k: usize,
    max_length: usize,
    num_return_sequences: usize,
}

#[derive(Deserialize)]
struct RawSamplingConfig {
    temperature: f32,
    top_p: f32,
    top_k: usize,
    max_length: usize,
    num_return_sequences: usize,
}

impl TryFrom<RawSamplingConfig> for SamplingConfig {
    type Error = SamplerError;

    fn try_from(raw: RawSamplingConfig) -> Result<Self> {
        SamplingConfig::new(
            raw.temperature,
            raw.top_p,
            raw.top_k,
            raw.max_length,
            raw.num_return_sequences,
        )
    }
}

impl SamplingConfig {
    /// Build a config, failing if any field lies outside its documented range.
    pub fn new(
        temperature: f32,
        top_p: f32,
        top_k: usize,
        max_length: usize,
        num_return_sequences: usize,
    ) -> Result<Self> {
        check("temperature", &TEMPERATURE_RANGE, temperature)?;
        check("top_p", &TOP_P_RANGE, top_p)?;
        check("top_k", &TOP_K_RANGE, top_k)?;
        check("max_length", &MAX_LENGTH_RANGE, max_length)?;
        check(
            "num_return_sequences",
            &NUM_RETURN_SEQUENCES_RANGE,
            num_return_sequences,
        )?;

        Ok(Self {
            temperature,
            top_p,
            top_k,
            max_length,
            num_return_sequences,
        })
    }

    /// Build a config by clamping every field into its range.
    ///
    /// NaN floats clamp to the lower bound.
    pub fn clamped(
        temperature: f32,
        top_p: f32,
        top_k: usize,
        max_length: usize,
        num_return_sequences: usize,
    ) -> Self {
        Self {
            temperature: clamp_f32(temperature, &TEMPERATURE_RANGE),
            top_p: clamp_f32(top_p, &TOP_P_RANGE),
            top_k: top_k.clamp(*TOP_K_RANGE.start(), *TOP_K_RANGE.end()),
            max_length: max_length.clamp(*MAX_LENGTH_RANGE.start(), *MAX_LENGTH_RANGE.end()),
            num_return_sequences: num_return_sequences.clamp(
                *NUM_RETURN_SEQUENCES_RANGE.start(),
                *NUM_RETURN_SEQUENCES_RANGE.end(),
            ),
        }
    }

    /// Greedy decoding configuration (temperature 0).
    pub fn greedy(max_length: usize) -> Result<Self> {
        Self::new(0.0, 1.0, *TOP_K_RANGE.end(), max_length, 1)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn top_p(&self) -> f32 {
        self.top_p
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn num_return_sequences(&self) -> usize {
        self.num_return_sequences
    }

    /// True when decoding takes the argmax path and never consumes randomness.
    pub fn is_greedy(&self) -> bool {
        self.temperature == 0.0
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 50,
            max_length: 128,
            num_return_sequences: 1,
        }
    }
}

fn check<T>(field: &'static str, range: &RangeInclusive<T>, value: T) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(SamplerError::InvalidConfig {
            field,
            value: value.to_string(),
        })
    }
}

fn clamp_f32(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        *range.start()
    } else {
        value.clamp(*range.start(), *range.end())
    }
}
