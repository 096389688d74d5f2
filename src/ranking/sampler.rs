use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::domain::ScoredCandidate;

#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    /// Added to every weight so zero-scored posts keep a nonzero chance.
    pub epsilon: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { epsilon: 0.01 }
    }
}

#[derive(Debug, Clone)]
pub struct SampleResult {
    /// Selected candidates in draw order.
    pub items: Vec<ScoredCandidate>,
    /// Seed that produced this draw; pass it back to replay the session.
    pub seed: u64,
}

/// Weighted sampling without replacement, proportional to `max(score, 0) + epsilon`.
#[derive(Debug, Clone, Default)]
pub struct ProbabilityCloudSampler {
    config: SamplerConfig,
}

impl ProbabilityCloudSampler {
    #[must_use]
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    /// Draw up to `page_size` candidates. Never fails; short input yields a short page.
    #[must_use]
    pub fn sample(
        &self,
        scored: Vec<ScoredCandidate>,
        page_size: usize,
        seed: Option<u64>,
    ) -> SampleResult {
        let seed = seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);

        let epsilon = self.config.epsilon;
        let mut weights: Vec<f64> = scored
            .iter()
            .map(|c| sampling_weight(c.composite_score, epsilon))
            .collect();
        let mut pool = scored;
        let mut items = Vec::with_capacity(page_size.min(pool.len()));

        while items.len() < page_size && !pool.is_empty() {
            let total: f64 = weights.iter().sum();
            let idx = if total > 0.0 && total.is_finite() {
                pick(&weights, rng.random::<f64>() * total)
            } else {
                rng.random_range(0..pool.len())
            };
            // Order of the remaining pool is irrelevant to the distribution.
            weights.swap_remove(idx);
            items.push(pool.swap_remove(idx));
        }

        SampleResult { items, seed }
    }
}

fn sampling_weight(score: f64, epsilon: f64) -> f64 {
    let score = if score.is_finite() { score.max(0.0) } else { 0.0 };
    score + epsilon
}

/// Index whose cumulative weight range contains `target`.
fn pick(weights: &[f64], target: f64) -> usize {
    let mut cumulative = 0.0;
    for (idx, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if target < cumulative {
            return idx;
        }
    }
    // Rounding can leave target at the very top of the range.
    weights.len() - 1
}
