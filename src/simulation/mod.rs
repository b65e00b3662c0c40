pub mod engine;
pub mod sampling;
pub mod stats;

/// Base seed for a run: the configured one, or fresh entropy.
#[inline]
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(rand::random)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::simulation::engine::MonteCarloEngine;
    use crate::state::ReturnSample;

    #[test]
    fn test_fixed_seed_passes_through() {
        assert_eq!(resolve_seed(Some(17)), 17);
    }

    #[test]
    fn test_unseeded_runs_draw_fresh_seeds() {
        let cfg = SimulationConfig {
            num_paths: 200,
            num_periods: 24,
            seed: None,
            ..SimulationConfig::default()
        };
        let a = MonteCarloEngine::from_config(&cfg).unwrap();
        let b = MonteCarloEngine::from_config(&cfg).unwrap();
        assert_ne!(a.seed, b.seed);

        let sample = ReturnSample::new(vec![-0.04, 0.0, 0.01, 0.03]).unwrap();
        let stats = a.simulate(&sample).unwrap();
        assert!(stats.median_cagr.is_finite());
        assert!(stats.percentile5_cagr <= stats.median_cagr);
        assert!((0.0..=1.0).contains(&stats.probability_negative_cagr));
    }
}
