//! Short-put roll arithmetic.
//!
//! Rolling closes the current short put (buying it back) and sells a new
//! put at a candidate strike. With m = contracts * 100:
//!
//!   current_pnl     = (received - to_close) * m
//!   net_credit      = (candidate + received - to_close) * m
//!   breakeven       = candidate + received - to_close
//!   margin(K, prem) = (max(0.2 * S - max(S - K, 0), 0.1 * K) + prem) * m
//!
//! Pure function over stack-allocated inputs.

use crate::errors::{invalid, EngineResult};
use crate::models::contract::CONTRACT_MULTIPLIER;

/// Quote for one roll candidate. Stack-allocated.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[repr(C)]
pub struct RollQuote {
    pub current_strike: f64,
    pub current_premium_received: f64, // Credit taken when the put was sold
    pub current_premium_to_close: f64, // Debit to buy it back now
    pub contracts: f64,
    pub candidate_strike: f64,
    pub candidate_premium: f64, // Credit for the new put
    pub underlying_price: f64,
}

/// Outcome of rolling to one candidate. Stack-allocated.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[repr(C)]
pub struct RollDetails {
    pub current_pnl: f64,
    pub post_roll_net_credit: f64,
    pub post_roll_premium_breakeven: f64, // Per-unit value the new put may reach at break-even
    pub pre_roll_margin: f64,
    pub post_roll_margin: f64,
    pub post_roll_margin_change: f64, // Positive = margin released
}

/// Cash and margin consequences of rolling a short put to a new strike.
pub fn roll_details(quote: &RollQuote) -> EngineResult<RollDetails> {
    let fields = [
        ("current_strike", quote.current_strike),
        ("contracts", quote.contracts),
        ("candidate_strike", quote.candidate_strike),
        ("underlying_price", quote.underlying_price),
    ];
    for (name, value) in fields {
        if !value.is_finite() || value <= 0.0 {
            return invalid(format!("{name} must be positive, got {value}"));
        }
    }
    let premiums = [
        ("current_premium_received", quote.current_premium_received),
        ("current_premium_to_close", quote.current_premium_to_close),
        ("candidate_premium", quote.candidate_premium),
    ];
    for (name, value) in premiums {
        if !value.is_finite() || value < 0.0 {
            return invalid(format!("{name} must be non-negative, got {value}"));
        }
    }

    let m = quote.contracts * CONTRACT_MULTIPLIER;
    let realised = quote.current_premium_received - quote.current_premium_to_close;
    let breakeven = quote.candidate_premium + realised;

    let s = quote.underlying_price;
    let pre = short_put_margin(s, quote.current_strike, quote.current_premium_received) * m;
    let post = short_put_margin(s, quote.candidate_strike, quote.candidate_premium) * m;

    Ok(RollDetails {
        current_pnl: realised * m,
        post_roll_net_credit: breakeven * m,
        post_roll_premium_breakeven: breakeven,
        pre_roll_margin: pre,
        post_roll_margin: post,
        post_roll_margin_change: pre - post,
    })
}

/// Per-unit Reg-T style requirement for a naked short put.
#[inline]
fn short_put_margin(underlying: f64, strike: f64, premium: f64) -> f64 {
    let otm = (underlying - strike).max(0.0);
    (0.20 * underlying - otm).max(0.10 * strike) + premium
}
