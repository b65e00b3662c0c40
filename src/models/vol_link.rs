use crate::errors::{invalid, EngineResult};
use crate::models::VolatilityLink;
use rand::RngCore;
use rand_distr::{Distribution, Normal};

/// Default lower bound on any shifted implied volatility.
pub const DEFAULT_MIN_IV: f64 = 0.01;

/// Ceiling on any shifted implied volatility (1000%).
pub const MAX_IV: f64 = 10.0;

/// Default sensitivity of log-volatility to the underlying return.
/// A -10% move lifts volatility by exp(0.3) ~ 35%.
pub const DEFAULT_LEVERAGE_K: f64 = 3.0;

/// Smooth leverage link: iv' = max(iv * exp(-k * r), min_iv).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialVolLink {
    k: f64,
    min_iv: f64,
}

impl ExponentialVolLink {
    pub fn new(k: f64, min_iv: f64) -> EngineResult<Self> {
        if !k.is_finite() || k < 0.0 {
            return invalid(format!("leverage constant k must be non-negative, got {k}"));
        }
        check_floor(min_iv)?;
        Ok(Self { k, min_iv })
    }

    #[inline]
    pub fn k(&self) -> f64 {
        self.k
    }
}

impl Default for ExponentialVolLink {
    fn default() -> Self {
        Self {
            k: DEFAULT_LEVERAGE_K,
            min_iv: DEFAULT_MIN_IV,
        }
    }
}

impl VolatilityLink for ExponentialVolLink {
    #[inline]
    fn name(&self) -> &'static str {
        "exponential"
    }

    #[inline]
    fn min_iv(&self) -> f64 {
        self.min_iv
    }

    #[inline]
    fn shifted_iv(&self, base_iv: f64, underlying_return: f64, _rng: &mut dyn RngCore) -> f64 {
        // NaN or inf from extreme returns still lands on a usable volatility
        bounded(base_iv * (-self.k * underlying_return).exp(), self.min_iv)
    }
}

/// One return range and the additive volatility shift observed in it.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VolBucket {
    /// Inclusive lower bound on the underlying return.
    pub lower: f64,
    /// Exclusive upper bound on the underlying return.
    pub upper: f64,
    pub mean_shift: f64,
    pub std_shift: f64,
}

/// Empirical leverage link: the underlying return selects a bucket, and the
/// volatility shift is drawn from that bucket's normal distribution.
///
/// Returns below the first bucket use the first bucket, returns above the
/// last use the last. Bucket means must not increase with the return range.
#[derive(Debug, Clone)]
pub struct PiecewiseVolLink {
    buckets: Vec<VolBucket>,
    shifts: Vec<Normal<f64>>,
    min_iv: f64,
}

impl PiecewiseVolLink {
    pub fn new(buckets: Vec<VolBucket>, min_iv: f64) -> EngineResult<Self> {
        check_floor(min_iv)?;
        if buckets.is_empty() {
            return invalid("piecewise volatility link needs at least one bucket");
        }

        for (i, b) in buckets.iter().enumerate() {
            if b.lower.is_nan() || b.upper.is_nan() || b.lower >= b.upper {
                return invalid(format!("bucket {i}: lower bound must be below upper bound"));
            }
            if !b.mean_shift.is_finite() || !b.std_shift.is_finite() || b.std_shift < 0.0 {
                return invalid(format!("bucket {i}: shift mean/std must be finite, std >= 0"));
            }
        }

        for (i, pair) in buckets.windows(2).enumerate() {
            if pair[1].lower < pair[0].upper {
                return invalid(format!("buckets {i} and {} overlap or are unordered", i + 1));
            }
            if pair[1].mean_shift > pair[0].mean_shift {
                return invalid(format!(
                    "bucket {} raises volatility more than the lower-return bucket {i}",
                    i + 1
                ));
            }
        }

        let shifts = buckets
            .iter()
            .map(|b| Normal::new(b.mean_shift, b.std_shift))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            buckets,
            shifts,
            min_iv,
        })
    }

    pub fn buckets(&self) -> &[VolBucket] {
        &self.buckets
    }

    /// Index of the bucket an underlying return falls into.
    pub fn bucket_index(&self, underlying_return: f64) -> usize {
        let last = self.buckets.len() - 1;
        if underlying_return.is_nan() {
            return last;
        }
        if underlying_return < self.buckets[0].lower {
            return 0;
        }
        self.buckets
            .iter()
            .position(|b| underlying_return < b.upper)
            .unwrap_or(last)
    }
}

impl VolatilityLink for PiecewiseVolLink {
    #[inline]
    fn name(&self) -> &'static str {
        "piecewise"
    }

    #[inline]
    fn min_iv(&self) -> f64 {
        self.min_iv
    }

    fn shifted_iv(&self, base_iv: f64, underlying_return: f64, rng: &mut dyn RngCore) -> f64 {
        let idx = self.bucket_index(underlying_return);
        bounded(base_iv + self.shifts[idx].sample(rng), self.min_iv)
    }
}

fn check_floor(min_iv: f64) -> EngineResult<()> {
    if !min_iv.is_finite() || min_iv < 0.0 || min_iv > MAX_IV {
        return invalid(format!("min_iv must be in [0, {MAX_IV}], got {min_iv}"));
    }
    Ok(())
}

#[inline]
fn bounded(iv: f64, min_iv: f64) -> f64 {
    if iv.is_nan() {
        min_iv
    } else {
        iv.clamp(min_iv, MAX_IV)
    }
}
