pub mod composer;
pub mod roll;

use crate::errors::{invalid, EngineResult};
use crate::models::black_scholes::BlackScholes;
use crate::models::contract::{OptionContract, OptionLeg};
use crate::state::Greeks;
use chrono::NaiveDate;
use smallvec::SmallVec;

/// Legs of one hedge strategy, in the order they were supplied.
/// Most strategies are one to four legs, so they live inline.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct HedgePositions {
    legs: SmallVec<[OptionContract; 4]>,
}

impl HedgePositions {
    pub fn new(legs: impl IntoIterator<Item = OptionContract>) -> Self {
        Self {
            legs: legs.into_iter().collect(),
        }
    }

    /// Validate every collaborator record; the first bad leg fails the set.
    pub fn from_legs(legs: &[OptionLeg], today: NaiveDate) -> EngineResult<Self> {
        let mut out = SmallVec::with_capacity(legs.len());
        for (i, leg) in legs.iter().enumerate() {
            match OptionContract::from_leg(leg, today) {
                Ok(contract) => out.push(contract),
                Err(e) => return invalid(format!("leg {i}: {e}")),
            }
        }
        Ok(Self { legs: out })
    }

    #[inline]
    pub fn legs(&self) -> &[OptionContract] {
        &self.legs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.legs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// Net cash paid to open the strategy (negative for a net credit).
    pub fn net_inception_cost(&self) -> f64 {
        self.legs.iter().map(OptionContract::inception_cost).sum()
    }

    /// Share of the portfolio spent on the hedge.
    pub fn hedge_allocation(&self, portfolio_value: f64) -> EngineResult<f64> {
        if !portfolio_value.is_finite() || portfolio_value <= 0.0 {
            return invalid(format!("portfolio value must be positive, got {portfolio_value}"));
        }
        Ok(self.net_inception_cost() / portfolio_value)
    }

    /// Aggregate sensitivities of the strategy as held.
    pub fn net_greeks(&self, pricer: &BlackScholes, underlying: f64) -> EngineResult<Greeks> {
        let mut total = Greeks::default();
        for leg in &self.legs {
            total = total + pricer.position_greeks(leg, underlying, None, None)?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Direction, OptionKind};
    use approx::assert_abs_diff_eq;

    fn put(strike: f64, premium: f64, direction: Direction, contracts: f64) -> OptionContract {
        OptionContract::new(OptionKind::Put, direction, strike, premium, 0.01, 0.01, 30.0, contracts).unwrap()
    }

    #[test]
    fn test_net_cost_single_long() {
        let hedge = HedgePositions::new([put(100.0, 1.5, Direction::Long, 1.0)]);
        assert_eq!(hedge.net_inception_cost(), 150.0);
    }

    #[test]
    fn test_net_cost_single_short() {
        let hedge = HedgePositions::new([put(100.0, 1.5, Direction::Short, 1.0)]);
        assert_eq!(hedge.net_inception_cost(), -150.0);
    }

    #[test]
    fn test_net_cost_two_contracts() {
        let hedge = HedgePositions::new([put(100.0, 1.5, Direction::Long, 2.0)]);
        assert_eq!(hedge.net_inception_cost(), 300.0);
    }

    #[test]
    fn test_net_cost_put_spread() {
        let hedge = HedgePositions::new([
            put(100.0, 1.5, Direction::Long, 2.0),
            put(90.0, 0.5, Direction::Short, 2.0),
        ]);
        assert_eq!(hedge.len(), 2);
        assert_eq!(hedge.net_inception_cost(), 200.0);
        assert_abs_diff_eq!(hedge.hedge_allocation(10_000.0).unwrap(), 0.02, epsilon = 1e-15);
        assert!(hedge.hedge_allocation(0.0).is_err());
    }

    #[test]
    fn test_from_legs_reports_bad_leg() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let good = OptionLeg {
            strike: 100.0,
            premium: 1.5,
            implied_volatility: 0.2,
            risk_free_rate: 0.01,
            kind: OptionKind::Put,
            direction: Direction::Long,
            expiry_date: Some("2024-02-01".into()),
            days_to_expiry: None,
            contracts: 1.0,
        };
        let bad = OptionLeg { premium: -1.0, ..good.clone() };
        assert_eq!(HedgePositions::from_legs(&[good.clone()], today).unwrap().len(), 1);
        let err = HedgePositions::from_legs(&[good, bad], today).unwrap_err();
        assert!(err.to_string().contains("leg 1"));
    }

    #[test]
    fn test_spread_greeks_net_out() {
        let pricer = BlackScholes::new();
        let long = put(100.0, 1.5, Direction::Long, 1.0);
        let short = put(100.0, 1.5, Direction::Short, 1.0);
        let hedge = HedgePositions::new([long, short]);
        let g = hedge.net_greeks(&pricer, 100.0).unwrap();
        assert_abs_diff_eq!(g.delta, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g.vega, 0.0, epsilon = 1e-12);
    }
}
