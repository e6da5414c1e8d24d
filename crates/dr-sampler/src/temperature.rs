use crate::filter::LogitFilter;

/// Smallest divisor used for temperature scaling.
pub const MIN_TEMPERATURE: f32 = 1e-8;

/// Scales all logits by dividing by a temperature value.
///
/// Higher temperatures produce more uniform distributions (more random),
/// while lower temperatures sharpen the distribution (more deterministic).
pub struct TemperatureFilter {
    temperature: f32,
}

impl TemperatureFilter {
    /// Create a new temperature filter with the given temperature.
    pub fn new(temperature: f32) -> Self {
        Self { temperature }
    }
}

impl LogitFilter for TemperatureFilter {
    fn name(&self) -> &str {
        "temperature"
    }

    /// Logits are shifted so the largest finite one is 0 before dividing.
    /// The softmax is unchanged, and a small temperature cannot overflow the
    /// best token to `+inf`.
    fn apply(&self, logits: &mut [f32]) {
        let temp = self.temperature.max(MIN_TEMPERATURE);
        let max = logits
            .iter()
            .copied()
            .filter(|l| l.is_finite())
            .fold(f32::NEG_INFINITY, f32::max);
        if max == f32::NEG_INFINITY {
            return;
        }

        for logit in logits.iter_mut() {
            *logit = (*logit - max) / temp;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scales_by_temperature() {
        let mut logits = vec![1.0, -2.0, 4.0];
        TemperatureFilter::new(0.5).apply(&mut logits);
        assert_relative_eq!(logits[0], -6.0);
        assert_relative_eq!(logits[1], -12.0);
        assert_relative_eq!(logits[2], 0.0);
    }

    #[test]
    fn test_zero_temperature_uses_floor() {
        let mut logits = vec![0.0, -1e-8, f32::NEG_INFINITY];
        TemperatureFilter::new(0.0).apply(&mut logits);
        assert_relative_eq!(logits[0], 0.0);
        assert_relative_eq!(logits[1], -1.0);
        assert_eq!(logits[2], f32::NEG_INFINITY);
    }

    #[test]
    fn test_huge_logits_do_not_overflow() {
        let mut logits = vec![1e33, 0.0, -1.0];
        TemperatureFilter::new(1e-6).apply(&mut logits);
        assert_eq!(logits[0], 0.0);
        assert!(logits[1] < 0.0);
        assert!(logits[2] <= logits[1]);
    }

    #[test]
    fn test_all_masked_left_alone() {
        let mut logits = vec![f32::NEG_INFINITY; 3];
        TemperatureFilter::new(0.7).apply(&mut logits);
        assert!(logits.iter().all(|&l| l == f32::NEG_INFINITY));
    }
}
