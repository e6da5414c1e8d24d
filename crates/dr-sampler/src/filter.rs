/// A stage that rewrites one step's logits in place.
///
/// Filters never shrink the vector: a removed candidate is set to
/// `f32::NEG_INFINITY` so that indices keep meaning token ids.
pub trait LogitFilter: Send + Sync {
    /// Returns the name of this filter.
    fn name(&self) -> &str;

    /// Scale or mask logits in place.
    fn apply(&self, logits: &mut [f32]);
}

/// Runs filters in insertion order.
pub struct FilterChain {
    filters: Vec<Box<dyn LogitFilter>>,
}

impl FilterChain {
    /// Create a new empty filter chain.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the end of the chain. Returns self for builder-style usage.
    pub fn with(mut self, filter: Box<dyn LogitFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn apply(&self, logits: &mut [f32]) {
        for filter in &self.filters {
            filter.apply(logits);
        }
    }

    /// Filter names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Indices of the finite logits, highest score first.
///
/// The sort is stable, so equal scores keep ascending index order.
pub(crate) fn descending_finite(logits: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..logits.len())
        .filter(|&i| logits[i].is_finite())
        .collect();
    order.sort_by(|&a, &b| logits[b].total_cmp(&logits[a]));
    order
}
