//! Extreme-value diagnostics for one side of a return distribution.
//!
//! Every estimator takes a sample that is entirely positive or entirely
//! negative (gains or losses) and works on magnitudes |x|.
//!
//! Hill:      alpha = 1 / mean_{i<k}(ln x_(i) - ln x_(k)), x descending, 0-based
//! Pickands:  xi = ln((x_k - x_2k) / (x_2k - x_4k)) / ln 2, 1-based ranks
//! Mean excess: e(u) = mean(x - u | x > u) on a threshold grid
//! Max-to-sum: R_n = max_{i<=n} |x_i|^p / sum_{i<=n} |x_i|^p

use crate::errors::{invalid, EngineResult};
use crate::simulation::stats::quantile_sorted;

/// Survival probabilities are clipped to this floor before taking logs.
const SURVIVAL_FLOOR: f64 = 1e-10;

/// True when every element is > 0 or every element is < 0.
pub fn check_same_sign(sample: &[f64]) -> bool {
    sample.iter().all(|x| *x > 0.0) || sample.iter().all(|x| *x < 0.0)
}

fn magnitudes(sample: &[f64]) -> EngineResult<Vec<f64>> {
    if sample.is_empty() {
        return invalid("tail sample is empty");
    }
    if !check_same_sign(sample) {
        return invalid("tail sample must be all positive or all negative");
    }
    Ok(sample.iter().map(|x| x.abs()).collect())
}

fn sorted_descending(sample: &[f64]) -> EngineResult<Vec<f64>> {
    let mut data = magnitudes(sample)?;
    data.sort_by(|a, b| b.total_cmp(a));
    Ok(data)
}

// ── Hill ──

/// Tail index from the `k` largest magnitudes. NaN when the top `k + 1`
/// order statistics are all equal.
pub fn hill_estimator(sample: &[f64], k: usize) -> EngineResult<f64> {
    let data = sorted_descending(sample)?;
    if k == 0 || k >= data.len() {
        return invalid(format!(
            "hill order statistic k must be in 1..{}, got {k}",
            data.len()
        ));
    }

    let threshold = data[k].ln();
    let mean_excess = data[..k].iter().map(|x| x.ln() - threshold).sum::<f64>() / k as f64;
    if mean_excess == 0.0 {
        return Ok(f64::NAN);
    }
    Ok(1.0 / mean_excess)
}

// ── Pickands ──

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PickandsEstimate {
    pub ks: Vec<usize>,
    /// One entry per k; NaN where the estimator is undefined.
    pub estimates: Vec<f64>,
}

/// Extreme-value index for each `k`. Defaults to `k = 5 .. n/4`.
pub fn pickands_estimator(sample: &[f64], ks: Option<&[usize]>) -> EngineResult<PickandsEstimate> {
    let data = sorted_descending(sample)?;
    let n = data.len();
    let ks: Vec<usize> = match ks {
        Some(ks) => ks.to_vec(),
        None => (5..n / 4).collect(),
    };

    let estimates = ks
        .iter()
        .map(|&k| {
            if k == 0 || k.checked_mul(4).map_or(true, |k4| k4 >= n) {
                return f64::NAN;
            }
            let (x_k, x_2k, x_4k) = (data[k - 1], data[2 * k - 1], data[4 * k - 1]);
            let denominator = x_2k - x_4k;
            if denominator <= 0.0 {
                return f64::NAN;
            }
            let xi = ((x_k - x_2k) / denominator).ln() / std::f64::consts::LN_2;
            if xi.is_finite() {
                xi
            } else {
                f64::NAN
            }
        })
        .collect();

    Ok(PickandsEstimate { ks, estimates })
}

// ── Mean excess ──

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MeanExcess {
    pub thresholds: Vec<f64>,
    /// NaN where no observation exceeds the threshold.
    pub mean_excesses: Vec<f64>,
}

/// Mean excess over `thresholds` evenly spaced levels between `min` and
/// `max` (default: the 5th and 95th percentiles of |x|).
pub fn mean_excess_function(
    sample: &[f64],
    thresholds: usize,
    min: Option<f64>,
    max: Option<f64>,
) -> EngineResult<MeanExcess> {
    if thresholds == 0 {
        return invalid("mean excess needs at least one threshold");
    }
    let mut data = magnitudes(sample)?;
    data.sort_by(f64::total_cmp);

    let lo = min.unwrap_or_else(|| quantile_sorted(&data, 0.05));
    let hi = max.unwrap_or_else(|| quantile_sorted(&data, 0.95));
    if !lo.is_finite() || !hi.is_finite() {
        return invalid("mean excess threshold bounds must be finite");
    }

    let grid = linspace(lo, hi, thresholds);
    let mean_excesses = grid
        .iter()
        .map(|&u| {
            let above = data.partition_point(|x| *x <= u);
            let excesses = &data[above..];
            if excesses.is_empty() {
                f64::NAN
            } else {
                excesses.iter().map(|x| x - u).sum::<f64>() / excesses.len() as f64
            }
        })
        .collect();

    Ok(MeanExcess {
        thresholds: grid,
        mean_excesses,
    })
}

fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    if num == 1 {
        return vec![start];
    }
    let step = (stop - start) / (num - 1) as f64;
    (0..num).map(|i| start + step * i as f64).collect()
}

// ── Maximum-to-sum ──

/// Running ratio of the largest `|x|^moment` to the partial sum, in sample
/// order. Converges to zero only if the `moment`-th moment is finite.
pub fn maximum_to_sum_ratio(sample: &[f64], moment: u32) -> EngineResult<Vec<f64>> {
    let data = magnitudes(sample)?;
    let mut running_max = f64::NEG_INFINITY;
    let mut running_sum = 0.0;
    Ok(data
        .iter()
        .map(|x| {
            let p = x.powi(moment as i32);
            running_max = running_max.max(p);
            running_sum += p;
            running_max / running_sum
        })
        .collect())
}

// ── Zipf ──

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ZipfPlot {
    /// ln |x|, ascending.
    pub log_data: Vec<f64>,
    /// ln P(|X| > x) at each point.
    pub log_survival: Vec<f64>,
}

/// Log-log survival plot. A straight line indicates a power-law tail.
pub fn zipf_plot(sample: &[f64]) -> EngineResult<ZipfPlot> {
    let mut data = magnitudes(sample)?;
    data.sort_by(f64::total_cmp);
    let n = data.len() as f64;

    let log_survival = data
        .iter()
        .map(|&x| {
            let above = data.len() - data.partition_point(|v| *v <= x);
            (above as f64 / n).clamp(SURVIVAL_FLOOR, 1.0).ln()
        })
        .collect();

    Ok(ZipfPlot {
        log_data: data.iter().map(|x| x.ln()).collect(),
        log_survival,
    })
}
