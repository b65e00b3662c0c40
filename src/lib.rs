//! Hedged portfolio growth simulator.
//!
//! Single-period underlying returns are turned into hedged strategy returns
//! by repricing an option overlay, then bootstrapped into multi-year growth
//! paths. Tail diagnostics characterise the loss side of either sample.

pub mod config;
pub mod errors;
pub mod hedge;
pub mod models;
pub mod risk;
pub mod simulation;
pub mod state;
