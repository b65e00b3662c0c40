use crate::errors::{invalid, EngineResult};
use rand::Rng;
use rand_distr::Distribution;

// ── Contract descriptors ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionKind {
    Call,
    Put,
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for positions we paid for (closed by selling), -1 for written positions.
    #[inline]
    pub fn sign(&self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

// ── Option sensitivities (stack-allocated) ──

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
#[repr(C)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    /// Per 1.00 change in volatility.
    pub vega: f64,
    /// Per calendar day.
    pub theta: f64,
}

impl Greeks {
    #[inline]
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            vega: self.vega * factor,
            theta: self.theta * factor,
        }
    }
}

impl std::ops::Add for Greeks {
    type Output = Greeks;

    fn add(self, rhs: Greeks) -> Greeks {
        Greeks {
            delta: self.delta + rhs.delta,
            gamma: self.gamma + rhs.gamma,
            vega: self.vega + rhs.vega,
            theta: self.theta + rhs.theta,
        }
    }
}

// ── Return samples ──

/// Ordered single-period returns. Non-empty and finite by construction.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ReturnSample {
    returns: Vec<f64>,
}

impl ReturnSample {
    pub fn new(returns: Vec<f64>) -> EngineResult<Self> {
        if returns.is_empty() {
            return invalid("return sample is empty");
        }
        if let Some(i) = returns.iter().position(|r| !r.is_finite()) {
            return invalid(format!("return sample has a non-finite value at index {i}"));
        }
        Ok(Self { returns })
    }

    /// Simple returns over `step` observations: p_t / p_{t-step} - 1.
    pub fn from_prices(prices: &[f64], step: usize) -> EngineResult<Self> {
        if step == 0 {
            return invalid("price step must be at least 1");
        }
        if prices.len() <= step {
            return invalid(format!(
                "need more than {step} prices to build returns, got {}",
                prices.len()
            ));
        }
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return invalid("prices must be positive and finite");
        }

        let returns = prices
            .windows(step + 1)
            .map(|w| w[step] / w[0] - 1.0)
            .collect();
        Self::new(returns)
    }

    /// Parametric draw from any return distribution.
    pub fn draw<D, R>(distribution: &D, size: usize, rng: &mut R) -> EngineResult<Self>
    where
        D: Distribution<f64>,
        R: Rng + ?Sized,
    {
        let returns = (0..size).map(|_| distribution.sample(rng)).collect();
        Self::new(returns)
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.returns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.returns.iter()
    }

    pub fn mean(&self) -> f64 {
        self.returns.iter().sum::<f64>() / self.returns.len() as f64
    }

    /// Strictly negative observations (the loss tail), if any.
    pub fn losses(&self) -> Vec<f64> {
        self.returns.iter().copied().filter(|r| *r < 0.0).collect()
    }

    /// Strictly positive observations (the gain tail), if any.
    pub fn gains(&self) -> Vec<f64> {
        self.returns.iter().copied().filter(|r| *r > 0.0).collect()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.returns
    }
}

// ── Pipeline outputs ──

/// One-period sample before and after applying the hedge overlay.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SimulationResult {
    pub original_returns: ReturnSample,
    pub hedged_returns: ReturnSample,
}

/// Terminal record of a Monte Carlo run. All growth rates are annualised.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PathStatistics {
    pub median_cagr: f64,
    pub mean_cagr: f64,
    pub percentile5_cagr: f64,
    pub probability_negative_cagr: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_empty_and_non_finite() {
        assert!(ReturnSample::new(vec![]).is_err());
        assert!(ReturnSample::new(vec![0.01, f64::NAN]).is_err());
        assert!(ReturnSample::new(vec![0.01, f64::INFINITY]).is_err());
    }

    #[test]
    fn test_from_prices_single_step() {
        let sample = ReturnSample::from_prices(&[100.0, 110.0, 120.0, 130.0, 140.0, 150.0], 1).unwrap();
        let expected = [0.1, 1.0 / 11.0, 1.0 / 12.0, 1.0 / 13.0, 1.0 / 14.0];
        assert_eq!(sample.len(), expected.len());
        for (got, want) in sample.iter().zip(expected.iter()) {
            assert_relative_eq!(*got, *want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_from_prices_multi_step() {
        let sample = ReturnSample::from_prices(&[100.0, 105.0, 120.0, 90.0], 2).unwrap();
        assert_eq!(sample.len(), 2);
        assert_relative_eq!(sample.as_slice()[0], 0.2, epsilon = 1e-12);
        assert_relative_eq!(sample.as_slice()[1], 90.0 / 105.0 - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_prices_needs_enough_data() {
        assert!(ReturnSample::from_prices(&[100.0], 1).is_err());
        assert!(ReturnSample::from_prices(&[100.0, 101.0], 0).is_err());
        assert!(ReturnSample::from_prices(&[100.0, -1.0], 1).is_err());
    }

    #[test]
    fn test_loss_and_gain_split() {
        let sample = ReturnSample::new(vec![-0.1, 0.0, 0.2, -0.05]).unwrap();
        assert_eq!(sample.losses(), vec![-0.1, -0.05]);
        assert_eq!(sample.gains(), vec![0.2]);
    }

    #[test]
    fn test_direction_sign() {
        assert_eq!(Direction::Long.sign(), 1.0);
        assert_eq!(Direction::Short.sign(), -1.0);
    }
}
