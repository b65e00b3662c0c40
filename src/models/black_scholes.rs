use crate::errors::{EngineError, EngineResult};
use crate::models::contract::OptionContract;
use crate::state::{Greeks, OptionKind};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Calendar days per year used to turn days-to-expiry into T.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Black-Scholes valuation of European options.
///
/// call = S*Phi(d1) - K*e^{-rT}*Phi(d2)
/// put  = K*e^{-rT}*Phi(-d2) - S*Phi(-d1)
///
/// where d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma*sqrt(T)), d2 = d1 - sigma*sqrt(T)
/// and T = days / 365.
///
/// Prices are per unit of underlying; the `position_*` helpers scale by
/// contracts * 100. Expired contracts (T <= 0) are valued intrinsically.
pub struct BlackScholes {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

/// Resolved inputs for one valuation. Stack-allocated.
#[derive(Debug, Clone, Copy)]
struct Inputs {
    spot: f64,
    strike: f64,
    rate: f64,
    sigma: f64,
    sqrt_t: f64,
    discount: f64,
    d1: f64,
    d2: f64,
}

/// What the pricer should do for a given state.
enum Regime {
    /// T <= 0: payoff only.
    Expired,
    /// S <= 0: the underlying is worthless, closed-form limits apply.
    Worthless { discount: f64 },
    Live(Inputs),
}

impl BlackScholes {
    pub fn new() -> Self {
        let normal = Normal::new(0.0, 1.0).unwrap_or(Normal::standard());
        Self { normal }
    }

    /// Per-unit value. `iv` and `days_to_expiry` override the contract's own
    /// values without touching it.
    pub fn price(
        &self,
        option: &OptionContract,
        underlying: f64,
        iv: Option<f64>,
        days_to_expiry: Option<f64>,
    ) -> EngineResult<f64> {
        let value = match resolve(option, underlying, iv, days_to_expiry)? {
            Regime::Expired => intrinsic_value(option, underlying),
            Regime::Worthless { discount } => match option.kind() {
                OptionKind::Call => 0.0,
                OptionKind::Put => option.strike() * discount,
            },
            Regime::Live(p) => match option.kind() {
                OptionKind::Call => {
                    p.spot * self.normal.cdf(p.d1) - p.strike * p.discount * self.normal.cdf(p.d2)
                }
                OptionKind::Put => {
                    p.strike * p.discount * self.normal.cdf(-p.d2) - p.spot * self.normal.cdf(-p.d1)
                }
            },
        };
        Ok(value)
    }

    /// Per-unit sensitivities of a LONG position.
    pub fn greeks(
        &self,
        option: &OptionContract,
        underlying: f64,
        iv: Option<f64>,
        days_to_expiry: Option<f64>,
    ) -> EngineResult<Greeks> {
        let p = match resolve(option, underlying, iv, days_to_expiry)? {
            Regime::Expired => {
                let itm = match option.kind() {
                    OptionKind::Call => underlying > option.strike(),
                    OptionKind::Put => underlying < option.strike(),
                };
                let delta = match (option.kind(), itm) {
                    (OptionKind::Call, true) => 1.0,
                    (OptionKind::Put, true) => -1.0,
                    _ => 0.0,
                };
                return Ok(Greeks { delta, ..Greeks::default() });
            }
            Regime::Worthless { .. } => {
                let delta = match option.kind() {
                    OptionKind::Call => 0.0,
                    OptionKind::Put => -1.0,
                };
                return Ok(Greeks { delta, ..Greeks::default() });
            }
            Regime::Live(p) => p,
        };

        let pdf_d1 = self.normal.pdf(p.d1);
        let decay = -p.spot * pdf_d1 * p.sigma / (2.0 * p.sqrt_t);
        let carry = p.rate * p.strike * p.discount;

        let (delta, theta_annual) = match option.kind() {
            OptionKind::Call => (
                self.normal.cdf(p.d1),
                decay - carry * self.normal.cdf(p.d2),
            ),
            OptionKind::Put => (
                self.normal.cdf(p.d1) - 1.0,
                decay + carry * self.normal.cdf(-p.d2),
            ),
        };

        Ok(Greeks {
            delta,
            gamma: pdf_d1 / (p.spot * p.sigma * p.sqrt_t),
            vega: p.spot * pdf_d1 * p.sqrt_t,
            theta: theta_annual / DAYS_PER_YEAR,
        })
    }

    #[inline]
    pub fn intrinsic_value(&self, option: &OptionContract, underlying: f64) -> f64 {
        intrinsic_value(option, underlying)
    }

    /// Unsigned value of the whole leg (price * contracts * 100).
    pub fn position_value(
        &self,
        option: &OptionContract,
        underlying: f64,
        iv: Option<f64>,
        days_to_expiry: Option<f64>,
    ) -> EngineResult<f64> {
        Ok(self.price(option, underlying, iv, days_to_expiry)? * option.notional_units())
    }

    #[inline]
    pub fn intrinsic_position_value(&self, option: &OptionContract, underlying: f64) -> f64 {
        intrinsic_value(option, underlying) * option.notional_units()
    }

    /// Greeks of the leg as held: scaled by contracts * 100 and signed by direction.
    pub fn position_greeks(
        &self,
        option: &OptionContract,
        underlying: f64,
        iv: Option<f64>,
        days_to_expiry: Option<f64>,
    ) -> EngineResult<Greeks> {
        let unit = self.greeks(option, underlying, iv, days_to_expiry)?;
        Ok(unit.scaled(option.direction().sign() * option.notional_units()))
    }
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::new()
    }
}

/// Payoff at expiry per unit of underlying.
#[inline]
pub fn intrinsic_value(option: &OptionContract, underlying: f64) -> f64 {
    match option.kind() {
        OptionKind::Call => (underlying - option.strike()).max(0.0),
        OptionKind::Put => (option.strike() - underlying).max(0.0),
    }
}

fn resolve(
    option: &OptionContract,
    underlying: f64,
    iv: Option<f64>,
    days_to_expiry: Option<f64>,
) -> EngineResult<Regime> {
    if !underlying.is_finite() {
        return Err(EngineError::NumericDegeneracy(format!(
            "underlying price is not finite: {underlying}"
        )));
    }

    let days = days_to_expiry.unwrap_or(option.days_to_expiry());
    if days.is_nan() {
        return Err(EngineError::NumericDegeneracy("days to expiry is NaN".into()));
    }
    if days <= 0.0 {
        return Ok(Regime::Expired);
    }

    let sigma = iv.unwrap_or(option.implied_volatility());
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(EngineError::NumericDegeneracy(format!(
            "closed form needs a positive volatility, got {sigma}"
        )));
    }

    let ttl_years = days / DAYS_PER_YEAR;
    let rate = option.risk_free_rate();
    let discount = (-rate * ttl_years).exp();

    if underlying <= 0.0 {
        return Ok(Regime::Worthless { discount });
    }

    let strike = option.strike();
    let sqrt_t = ttl_years.sqrt();
    let sigma_sqrt_t = sigma * sqrt_t;
    let d1 = ((underlying / strike).ln() + (rate + 0.5 * sigma * sigma) * ttl_years) / sigma_sqrt_t;
    let d2 = d1 - sigma_sqrt_t;

    Ok(Regime::Live(Inputs {
        spot: underlying,
        strike,
        rate,
        sigma,
        sqrt_t,
        discount,
        d1,
        d2,
    }))
}
