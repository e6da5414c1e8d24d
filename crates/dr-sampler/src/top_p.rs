use crate::filter::{descending_finite, LogitFilter};

/// Nucleus filtering: keeps the smallest set of tokens whose cumulative
/// probability exceeds the threshold `p`.
///
/// Probabilities are computed over the candidates still standing, so running
/// this after top-k gives a different nucleus than running it before.
pub struct TopPFilter {
    p: f32,
}

impl TopPFilter {
    /// Create a new top-p (nucleus) filter with the given probability threshold.
    pub fn new(p: f32) -> Self {
        Self { p }
    }
}

impl LogitFilter for TopPFilter {
    fn name(&self) -> &str {
        "top_p"
    }

    fn apply(&self, logits: &mut [f32]) {
        if self.p <= 0.0 || self.p >= 1.0 {
            return;
        }

        let order = descending_finite(logits);
        if order.is_empty() {
            return;
        }

        // Softmax over the sorted survivors.
        let max_logit = logits[order[0]];
        let exps: Vec<f32> = order.iter().map(|&i| (logits[i] - max_logit).exp()).collect();
        let sum: f32 = exps.iter().sum();

        // Keep tokens until cumulative probability exceeds p. The top token
        // is always kept.
        let mut cumulative = 0.0f32;
        let mut cutoff = order.len();
        for (rank, &e) in exps.iter().enumerate() {
            cumulative += e / sum;
            if cumulative > self.p {
                cutoff = rank + 1;
                break;
            }
        }

        for &i in &order[cutoff..] {
            logits[i] = f32::NEG_INFINITY;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_probs(probs: &[f32]) -> Vec<f32> {
        probs.iter().map(|p| p.ln()).collect()
    }

    fn survivors(logits: &[f32]) -> Vec<usize> {
        (0..logits.len()).filter(|&i| logits[i].is_finite()).collect()
    }

    #[test]
    fn test_keeps_nucleus() {
        // Cumulative: 0.5, 0.8, 0.95, 1.0
        let mut logits = log_probs(&[0.3, 0.5, 0.05, 0.15]);
        TopPFilter::new(0.75).apply(&mut logits);
        assert_eq!(survivors(&logits), vec![0, 1]);
    }

    #[test]
    fn test_position_crossing_threshold_is_kept() {
        let mut logits = log_probs(&[0.4, 0.3, 0.2, 0.1]);
        TopPFilter::new(0.5).apply(&mut logits);
        assert_eq!(survivors(&logits), vec![0, 1]);
    }

    #[test]
    fn test_tiny_p_keeps_top_token() {
        let mut logits = log_probs(&[0.1, 0.6, 0.3]);
        TopPFilter::new(0.01).apply(&mut logits);
        assert_eq!(survivors(&logits), vec![1]);
    }

    #[test]
    fn test_disabled_outside_open_interval() {
        let original = log_probs(&[0.4, 0.3, 0.2, 0.1]);
        for p in [0.0, 1.0] {
            let mut logits = original.clone();
            TopPFilter::new(p).apply(&mut logits);
            assert_eq!(logits, original);
        }
    }

    #[test]
    fn test_ignores_masked_positions() {
        let mut logits = vec![f32::NEG_INFINITY, 0.0, f32::NEG_INFINITY, 0.0];
        TopPFilter::new(0.9).apply(&mut logits);
        assert_eq!(survivors(&logits), vec![1, 3]);
    }
}
