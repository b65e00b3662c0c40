pub mod black_scholes;
pub mod contract;
pub mod vol_link;

use rand::RngCore;

/// Maps an underlying move to the implied volatility a hedge leg should be
/// repriced at (the leverage effect: drops raise volatility).
///
/// Implementations must return a value `>= min_iv()` for every input and
/// must not increase (in expectation) as `underlying_return` rises.
/// Send + Sync required so one link can serve parallel repricing.
pub trait VolatilityLink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Floor applied to every shifted volatility.
    fn min_iv(&self) -> f64;

    /// Volatility after a one-period underlying return. Deterministic links
    /// ignore `rng`; stochastic links draw from it.
    fn shifted_iv(&self, base_iv: f64, underlying_return: f64, rng: &mut dyn RngCore) -> f64;
}
