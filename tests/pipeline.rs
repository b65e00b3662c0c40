use chrono::NaiveDate;
use hedgesim::config::{RepricingMode, SimulationConfig};
use hedgesim::errors::EngineError;
use hedgesim::hedge::composer::HedgeComposer;
use hedgesim::hedge::HedgePositions;
use hedgesim::models::black_scholes::BlackScholes;
use hedgesim::models::contract::OptionLeg;
use hedgesim::models::vol_link::ExponentialVolLink;
use hedgesim::risk::tail;
use hedgesim::simulation::engine::MonteCarloEngine;
use hedgesim::state::ReturnSample;

const HEDGE_JSON: &str = r#"[
    {
        "strike": 95.0,
        "premium": 0.5,
        "implied_volatility": 0.2,
        "risk_free_rate": 0.02,
        "type": "PUT",
        "direction": "LONG",
        "expiry_date": "2024-01-31",
        "contracts": 10
    }
]"#;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Monthly returns with a crash one month in ten.
fn crash_prone_sample() -> ReturnSample {
    let mut returns = vec![0.015; 18];
    returns.extend([-0.20, -0.12]);
    ReturnSample::new(returns).unwrap()
}

fn config() -> SimulationConfig {
    SimulationConfig {
        portfolio_value: 100_000.0,
        periodic_contribution: 0.0,
        returns_frequency: 30,
        dte_change: 1,
        num_paths: 4_000,
        num_periods: 120,
        portfolio_beta: 1.0,
        seed: Some(2024),
    }
}

#[test]
fn test_protective_put_lifts_left_tail() {
    let legs: Vec<OptionLeg> = serde_json::from_str(HEDGE_JSON).unwrap();
    let positions = HedgePositions::from_legs(&legs, today()).unwrap();
    assert_eq!(positions.legs()[0].days_to_expiry(), 30.0);
    assert_eq!(positions.net_inception_cost(), 500.0);

    let pricer = BlackScholes::new();
    let link = ExponentialVolLink::default();
    let composer = HedgeComposer::new(&pricer, &link, RepricingMode::BlackScholes);
    let sample = crash_prone_sample();
    let cfg = config();

    let hedged = composer.compose(&sample, 100.0, &positions, &cfg).unwrap();
    let unhedged = composer.compose_unhedged(&sample, &cfg).unwrap();
    assert_eq!(hedged.original_returns, sample);

    // worst month is the -12% one: 99_500 * 0.88 + 7 * 1_000 payoff
    let worst = hedged
        .hedged_returns
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    assert!((worst - (-0.0544)).abs() < 1e-9, "worst={worst}");

    let engine = MonteCarloEngine::from_config(&cfg).unwrap();
    let with_hedge = engine.simulate(&hedged.hedged_returns).unwrap();
    let without = engine.simulate(&unhedged.hedged_returns).unwrap();

    assert!(
        with_hedge.percentile5_cagr > without.percentile5_cagr,
        "hedged p5={} unhedged p5={}",
        with_hedge.percentile5_cagr,
        without.percentile5_cagr
    );
    assert!(with_hedge.probability_negative_cagr <= without.probability_negative_cagr);

    let again = engine.simulate(&hedged.hedged_returns).unwrap();
    assert_eq!(with_hedge, again);

    let json = serde_json::to_value(with_hedge).unwrap();
    assert!(json.get("median_cagr").is_some());
    assert!(json.get("probability_negative_cagr").is_some());
}

#[test]
fn test_hedge_thins_loss_tail() {
    let legs: Vec<OptionLeg> = serde_json::from_str(HEDGE_JSON).unwrap();
    let positions = HedgePositions::from_legs(&legs, today()).unwrap();
    let pricer = BlackScholes::new();
    let link = ExponentialVolLink::default();
    let composer = HedgeComposer::new(&pricer, &link, RepricingMode::IntrinsicAtExpiry);

    let sample = crash_prone_sample();
    let hedged = composer.compose(&sample, 100.0, &positions, &config()).unwrap();

    let raw_losses = sample.losses();
    let hedged_losses = hedged.hedged_returns.losses();
    let ratios = tail::maximum_to_sum_ratio(&raw_losses, 1).unwrap();
    assert_eq!(ratios.len(), raw_losses.len());
    let raw_max = raw_losses.iter().map(|x| x.abs()).fold(0.0, f64::max);
    let hedged_max = hedged_losses.iter().map(|x| x.abs()).fold(0.0, f64::max);
    assert!(hedged_max < raw_max);
}

#[test]
fn test_empty_hedge_file_is_rejected() {
    let legs: Vec<OptionLeg> = serde_json::from_str("[]").unwrap();
    let positions = HedgePositions::from_legs(&legs, today()).unwrap();
    let pricer = BlackScholes::new();
    let link = ExponentialVolLink::default();
    let composer = HedgeComposer::new(&pricer, &link, RepricingMode::BlackScholes);
    let err = composer
        .compose(&crash_prone_sample(), 100.0, &positions, &config())
        .unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));
}

#[test]
fn test_prices_file_feeds_pipeline() {
    let prices = [100.0, 101.0, 99.0, 102.0, 90.0, 95.0];
    let sample = ReturnSample::from_prices(&prices, 1).unwrap();
    assert_eq!(sample.len(), 5);
    let engine = MonteCarloEngine::new(200, 12, 12, 1).unwrap();
    let stats = engine.simulate(&sample).unwrap();
    assert!(stats.percentile5_cagr <= stats.median_cagr);
}
