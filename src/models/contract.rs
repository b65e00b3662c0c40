use crate::errors::{invalid, EngineResult};
use crate::state::{Direction, OptionKind};
use chrono::NaiveDate;

/// Units of underlying controlled by one contract.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

/// Option leg as supplied by an option-chain or config collaborator.
/// Either `expiry_date` (YYYY-MM-DD) or `days_to_expiry` must be present.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OptionLeg {
    pub strike: f64,
    pub premium: f64,
    pub implied_volatility: f64,
    pub risk_free_rate: f64,
    #[serde(rename = "type")]
    pub kind: OptionKind,
    pub direction: Direction,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub days_to_expiry: Option<f64>,
    pub contracts: f64,
}

/// A validated option contract. Immutable: repricing under different
/// volatility or remaining time produces a new value.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct OptionContract {
    kind: OptionKind,
    direction: Direction,
    strike: f64,
    premium: f64,
    implied_volatility: f64,
    risk_free_rate: f64,
    days_to_expiry: f64,
    contracts: f64,
}

impl OptionContract {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: OptionKind,
        direction: Direction,
        strike: f64,
        premium: f64,
        implied_volatility: f64,
        risk_free_rate: f64,
        days_to_expiry: f64,
        contracts: f64,
    ) -> EngineResult<Self> {
        check_positive("strike", strike)?;
        check_positive("premium", premium)?;
        check_positive("implied volatility", implied_volatility)?;
        check_positive("contracts", contracts)?;
        if !risk_free_rate.is_finite() || risk_free_rate < 0.0 {
            return invalid(format!("risk-free rate must be non-negative, got {risk_free_rate}"));
        }
        if !days_to_expiry.is_finite() {
            return invalid("days to expiry must be finite");
        }

        Ok(Self {
            kind,
            direction,
            strike,
            premium,
            implied_volatility,
            risk_free_rate,
            days_to_expiry,
            contracts,
        })
    }

    /// Build from a collaborator record. `today` anchors an expiry date;
    /// an explicit `days_to_expiry` wins over the date when both are given.
    pub fn from_leg(leg: &OptionLeg, today: NaiveDate) -> EngineResult<Self> {
        let days = match (leg.days_to_expiry, leg.expiry_date.as_deref()) {
            (Some(days), _) => days,
            (None, Some(date)) => days_until(date, today)?,
            (None, None) => return invalid("option leg needs expiry_date or days_to_expiry"),
        };

        Self::new(
            leg.kind,
            leg.direction,
            leg.strike,
            leg.premium,
            leg.implied_volatility,
            leg.risk_free_rate,
            days,
            leg.contracts,
        )
    }

    /// Same contract, different implied volatility.
    pub fn with_implied_volatility(&self, implied_volatility: f64) -> EngineResult<Self> {
        check_positive("implied volatility", implied_volatility)?;
        Ok(Self { implied_volatility, ..*self })
    }

    /// Same contract, different remaining life. Negative values are kept and
    /// mean "already expired" to the pricer.
    pub fn with_days_to_expiry(&self, days_to_expiry: f64) -> Self {
        Self { days_to_expiry, ..*self }
    }

    #[inline]
    pub fn kind(&self) -> OptionKind {
        self.kind
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn strike(&self) -> f64 {
        self.strike
    }

    #[inline]
    pub fn premium(&self) -> f64 {
        self.premium
    }

    #[inline]
    pub fn implied_volatility(&self) -> f64 {
        self.implied_volatility
    }

    #[inline]
    pub fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    #[inline]
    pub fn days_to_expiry(&self) -> f64 {
        self.days_to_expiry
    }

    #[inline]
    pub fn contracts(&self) -> f64 {
        self.contracts
    }

    /// Units of underlying covered by this leg.
    #[inline]
    pub fn notional_units(&self) -> f64 {
        self.contracts * CONTRACT_MULTIPLIER
    }

    /// Signed cash flow at inception: a debit (+) for LONG, a credit (-) for SHORT.
    #[inline]
    pub fn inception_cost(&self) -> f64 {
        self.direction.sign() * self.premium * self.notional_units()
    }
}

impl std::fmt::Display for OptionContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} x{} K={} premium={} dte={} iv={} r={}",
            self.direction,
            self.kind,
            self.contracts,
            self.strike,
            self.premium,
            self.days_to_expiry,
            self.implied_volatility,
            self.risk_free_rate
        )
    }
}

fn check_positive(name: &str, value: f64) -> EngineResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return invalid(format!("{name} must be positive, got {value}"));
    }
    Ok(())
}

fn days_until(expiry: &str, today: NaiveDate) -> EngineResult<f64> {
    let expiry = NaiveDate::parse_from_str(expiry, "%Y-%m-%d")?;
    Ok((expiry - today).num_days() as f64)
}
