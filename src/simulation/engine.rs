use crate::config::SimulationConfig;
use crate::errors::{invalid, EngineResult};
use crate::simulation::resolve_seed;
use crate::simulation::stats::summarize_terminal_factors;
use crate::state::{PathStatistics, ReturnSample};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Stride between per-path seeds.
const PATH_SEED_STRIDE: u64 = 7_919;

/// Bootstrap Monte Carlo over an empirical return sample.
///
/// Each path draws `num_periods` returns with replacement and compounds them
/// into a terminal wealth factor. Path `i` owns its own generator seeded from
/// `seed + i * 7919`, so results do not depend on thread scheduling.
#[derive(Debug, Clone)]
pub struct MonteCarloEngine {
    pub num_paths: usize,
    pub num_periods: usize,
    pub periods_per_year: u32,
    pub seed: u64,
}

impl MonteCarloEngine {
    pub fn new(
        num_paths: usize,
        num_periods: usize,
        periods_per_year: u32,
        seed: u64,
    ) -> EngineResult<Self> {
        if num_paths == 0 {
            return invalid("num_paths must be at least 1");
        }
        if num_periods == 0 {
            return invalid("num_periods must be at least 1");
        }
        if periods_per_year == 0 {
            return invalid("periods_per_year must be at least 1");
        }
        Ok(Self {
            num_paths,
            num_periods,
            periods_per_year,
            seed,
        })
    }

    /// Engine for a validated config; a missing seed is drawn once here.
    pub fn from_config(config: &SimulationConfig) -> EngineResult<Self> {
        config.validate()?;
        Self::new(
            config.num_paths,
            config.num_periods,
            config.periods_per_year(),
            resolve_seed(config.seed),
        )
    }

    #[inline]
    pub fn horizon_years(&self) -> f64 {
        self.num_periods as f64 / self.periods_per_year as f64
    }

    /// Terminal wealth factor of every path, in path order.
    /// A path that loses everything stays at zero.
    pub fn terminal_factors(&self, sample: &ReturnSample) -> Vec<f64> {
        let returns = sample.as_slice();
        let simulate_path = |i: usize| -> f64 {
            let path_seed = self.seed.wrapping_add((i as u64).wrapping_mul(PATH_SEED_STRIDE));
            let mut rng = StdRng::seed_from_u64(path_seed);
            let mut factor = 1.0;
            for _ in 0..self.num_periods {
                factor *= 1.0 + returns[rng.gen_range(0..returns.len())];
                if factor <= 0.0 {
                    return 0.0;
                }
            }
            factor
        };

        #[cfg(feature = "parallel")]
        let factors = (0..self.num_paths)
            .into_par_iter()
            .map(simulate_path)
            .collect::<Vec<_>>();
        #[cfg(not(feature = "parallel"))]
        let factors = (0..self.num_paths).map(simulate_path).collect::<Vec<_>>();

        factors
    }

    pub fn simulate(&self, sample: &ReturnSample) -> EngineResult<PathStatistics> {
        let mut factors = self.terminal_factors(sample);
        let wiped_out = factors.iter().filter(|f| **f == 0.0).count();
        let stats = summarize_terminal_factors(&mut factors, self.horizon_years())?;

        tracing::info!(
            paths = self.num_paths,
            periods = self.num_periods,
            years = self.horizon_years(),
            wiped_out,
            median_cagr = stats.median_cagr,
            mean_cagr = stats.mean_cagr,
            p5_cagr = stats.percentile5_cagr,
            prob_negative = stats.probability_negative_cagr,
            "monte carlo complete"
        );

        Ok(stats)
    }
}
