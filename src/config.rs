use crate::errors::{invalid, EngineError, EngineResult};
use crate::models::vol_link::{DEFAULT_LEVERAGE_K, DEFAULT_MIN_IV};
use std::path::PathBuf;

/// Calendar days used to count periods in a year (floor(365 / frequency)).
pub const CALENDAR_DAYS: u32 = 365;

/// How hedge legs are valued at the end of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepricingMode {
    /// Black-Scholes with remaining life and a volatility shifted by the link model.
    BlackScholes,
    /// Every leg is settled at intrinsic value.
    IntrinsicAtExpiry,
}

impl std::str::FromStr for RepricingMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "black_scholes" | "bs" => Ok(Self::BlackScholes),
            "intrinsic" | "intrinsic_at_expiry" => Ok(Self::IntrinsicAtExpiry),
            other => Err(EngineError::Configuration(format!("unknown repricing mode: {other}"))),
        }
    }
}

/// Parameters of one simulation run. Validate once, then share read-only.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SimulationConfig {
    pub portfolio_value: f64,
    pub periodic_contribution: f64,
    /// Days per return period (30 = monthly returns).
    pub returns_frequency: u32,
    /// Periods elapsed per step when aging hedge legs.
    pub dte_change: u32,
    pub num_paths: usize,
    /// Horizon length in periods.
    pub num_periods: usize,
    /// Sensitivity of the portfolio to the hedged underlying.
    pub portfolio_beta: f64,
    /// Fixed seed for reproducible runs; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            portfolio_value: 100_000.0,
            periodic_contribution: 0.0,
            returns_frequency: 30,
            dte_change: 1,
            num_paths: 10_000,
            num_periods: 12 * 10,
            portfolio_beta: 1.0,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if !self.portfolio_value.is_finite() || self.portfolio_value <= 0.0 {
            return invalid(format!(
                "portfolio_value must be positive, got {}",
                self.portfolio_value
            ));
        }
        if !self.periodic_contribution.is_finite() || self.periodic_contribution < 0.0 {
            return invalid(format!(
                "periodic_contribution must be non-negative, got {}",
                self.periodic_contribution
            ));
        }
        if self.returns_frequency == 0 {
            return invalid("returns_frequency must be at least one day");
        }
        if self.returns_frequency > CALENDAR_DAYS {
            return invalid(format!(
                "returns_frequency must not exceed {CALENDAR_DAYS} days, got {}",
                self.returns_frequency
            ));
        }
        if self.num_paths == 0 {
            return invalid("num_paths must be at least 1");
        }
        if self.num_periods == 0 {
            return invalid("num_periods must be at least 1");
        }
        if !self.portfolio_beta.is_finite() {
            return invalid("portfolio_beta must be finite");
        }
        Ok(())
    }

    /// Capital committed at the start of a period, before paying for the hedge.
    #[inline]
    pub fn gross_capital(&self) -> f64 {
        self.portfolio_value + self.periodic_contribution
    }

    #[inline]
    pub fn periods_per_year(&self) -> u32 {
        periods_per_year(self.returns_frequency)
    }

    /// Horizon expressed in years.
    #[inline]
    pub fn horizon_years(&self) -> f64 {
        self.num_periods as f64 / self.periods_per_year() as f64
    }

    /// Days a hedge leg ages over one step.
    #[inline]
    pub fn days_elapsed_per_step(&self) -> f64 {
        (self.dte_change as f64) * (self.returns_frequency as f64)
    }

    /// Number of periods covering `years` whole years.
    #[inline]
    pub fn periods_for_years(&self, years: u32) -> usize {
        self.periods_per_year() as usize * years as usize
    }
}

#[inline]
pub fn periods_per_year(returns_frequency: u32) -> u32 {
    CALENDAR_DAYS / returns_frequency.max(1)
}

/// Binary-level configuration: the simulation plus where its inputs live.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    pub underlying_price: f64,
    pub returns_path: PathBuf,
    /// Treat `returns_path` as a price series and difference it first.
    pub returns_are_prices: bool,
    /// JSON array of option legs. Absent means an unhedged run.
    pub hedge_path: Option<PathBuf>,
    pub repricing_mode: RepricingMode,
    pub vol_link_k: f64,
    pub min_iv: f64,
    /// Order statistic used by the Hill diagnostic.
    pub tail_k: usize,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let returns_frequency = parse_env("RETURNS_FREQUENCY", "30")?;
        let num_years: u32 = parse_env("NUM_YEARS", "10")?;

        let mut simulation = SimulationConfig {
            portfolio_value: parse_env("PORTFOLIO_VALUE", "100000")?,
            periodic_contribution: parse_env("PERIODIC_CONTRIBUTION", "0")?,
            returns_frequency,
            dte_change: parse_env("DTE_CHANGE", "1")?,
            num_paths: parse_env("NUM_PATHS", "10000")?,
            num_periods: 0,
            portfolio_beta: parse_env("PORTFOLIO_BETA", "1.0")?,
            seed: match std::env::var("SEED") {
                Ok(s) => Some(
                    s.parse::<u64>()
                        .map_err(|e| EngineError::Configuration(format!("SEED: {e}")))?,
                ),
                Err(_) => None,
            },
        };
        simulation.num_periods = simulation.periods_for_years(num_years);
        simulation.validate()?;

        let repricing_mode = env_var_or("REPRICING_MODE", "black_scholes").parse()?;
        let returns_are_prices = parse_env("RETURNS_ARE_PRICES", "false")?;

        Ok(Self {
            simulation,
            underlying_price: parse_env("UNDERLYING_PRICE", "100")?,
            returns_path: PathBuf::from(env_var("RETURNS_PATH")?),
            returns_are_prices,
            hedge_path: std::env::var("HEDGE_PATH").ok().map(PathBuf::from),
            repricing_mode,
            vol_link_k: parse_env("VOL_LINK_K", &DEFAULT_LEVERAGE_K.to_string())?,
            min_iv: parse_env("MIN_IV", &DEFAULT_MIN_IV.to_string())?,
            tail_k: parse_env("TAIL_K", "10")?,
        })
    }
}

fn env_var(key: &str) -> EngineResult<String> {
    std::env::var(key).map_err(|_| EngineError::Configuration(format!("missing env var: {key}")))
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> EngineResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_var_or(key, default)
        .parse::<T>()
        .map_err(|e| EngineError::Configuration(format!("{key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_periods_per_year_floors() {
        assert_eq!(periods_per_year(1), 365);
        assert_eq!(periods_per_year(7), 52);
        assert_eq!(periods_per_year(30), 12);
        assert_eq!(periods_per_year(365), 1);
    }

    #[test]
    fn test_horizon_and_aging() {
        let cfg = SimulationConfig {
            returns_frequency: 30,
            dte_change: 2,
            num_periods: 36,
            ..SimulationConfig::default()
        };
        assert_eq!(cfg.horizon_years(), 3.0);
        assert_eq!(cfg.days_elapsed_per_step(), 60.0);
        assert_eq!(cfg.periods_for_years(5), 60);
    }

    #[test]
    fn test_validation_failures() {
        let base = SimulationConfig::default();
        let bad = [
            SimulationConfig { portfolio_value: 0.0, ..base.clone() },
            SimulationConfig { periodic_contribution: -1.0, ..base.clone() },
            SimulationConfig { returns_frequency: 0, ..base.clone() },
            SimulationConfig { returns_frequency: 400, ..base.clone() },
            SimulationConfig { num_paths: 0, ..base.clone() },
            SimulationConfig { num_periods: 0, ..base.clone() },
            SimulationConfig { portfolio_beta: f64::NAN, ..base.clone() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?} should be rejected");
        }
    }

    #[test]
    fn test_repricing_mode_parse() {
        assert_eq!("black_scholes".parse::<RepricingMode>().unwrap(), RepricingMode::BlackScholes);
        assert_eq!("Intrinsic".parse::<RepricingMode>().unwrap(), RepricingMode::IntrinsicAtExpiry);
        assert!("binomial".parse::<RepricingMode>().is_err());
    }
}
