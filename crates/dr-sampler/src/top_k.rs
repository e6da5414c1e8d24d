use crate::filter::{descending_finite, LogitFilter};

/// Keeps only the top K tokens by logit value, masking the rest.
///
/// When several tokens tie at the boundary, the lower ids survive.
pub struct TopKFilter {
    k: usize,
}

impl TopKFilter {
    /// Create a new top-K filter that retains the `k` highest-logit tokens.
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl LogitFilter for TopKFilter {
    fn name(&self) -> &str {
        "top_k"
    }

    fn apply(&self, logits: &mut [f32]) {
        if self.k == 0 || self.k >= logits.len() {
            return;
        }

        let order = descending_finite(logits);
        if order.len() <= self.k {
            return;
        }

        for &i in &order[self.k..] {
            logits[i] = f32::NEG_INFINITY;
        }
    }
}
