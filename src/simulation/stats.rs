use crate::errors::{invalid, EngineResult};
use crate::state::PathStatistics;

/// Linear-interpolation quantile of an ascending slice (numpy's default).
/// `q` is clamped to [0, 1]; an empty slice yields NaN.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }
    let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let w = pos - lo as f64;
    sorted[lo] * (1.0 - w) + sorted[hi] * w
}

/// Compound annual growth implied by a terminal wealth factor.
#[inline]
pub fn annualise(factor: f64, years: f64) -> f64 {
    factor.powf(1.0 / years) - 1.0
}

/// Summary of terminal wealth factors over a horizon of `years`.
/// The slice is sorted in place.
pub fn summarize_terminal_factors(factors: &mut [f64], years: f64) -> EngineResult<PathStatistics> {
    if factors.is_empty() {
        return invalid("no terminal factors to summarize");
    }
    if !years.is_finite() || years <= 0.0 {
        return invalid(format!("horizon must be positive, got {years} years"));
    }
    if factors.iter().any(|f| f.is_nan()) {
        return invalid("terminal factors contain NaN");
    }

    factors.sort_by(f64::total_cmp);
    let n = factors.len() as f64;
    let mean = factors.iter().sum::<f64>() / n;
    let losing = factors.iter().filter(|f| **f < 1.0).count() as f64;

    Ok(PathStatistics {
        median_cagr: annualise(quantile_sorted(factors, 0.5), years),
        mean_cagr: annualise(mean, years),
        percentile5_cagr: annualise(quantile_sorted(factors, 0.05), years),
        probability_negative_cagr: losing / n,
    })
}

/// Per-period geometric growth: exp(mean(ln(1 + r))) - 1.
pub fn bayes_expected_value(returns: &[f64]) -> EngineResult<f64> {
    if returns.is_empty() {
        return invalid("cannot take the geometric mean of no returns");
    }
    if let Some(r) = returns.iter().find(|r| !r.is_finite() || **r <= -1.0) {
        return invalid(format!("return {r} has no log growth"));
    }
    let mean_log = returns.iter().map(|r| r.ln_1p()).sum::<f64>() / returns.len() as f64;
    Ok(mean_log.exp_m1())
}
