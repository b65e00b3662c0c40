use chrono::Local;
use hedgesim::config::AppConfig;
use hedgesim::errors::{EngineError, EngineResult};
use hedgesim::hedge::composer::HedgeComposer;
use hedgesim::hedge::HedgePositions;
use hedgesim::models::black_scholes::BlackScholes;
use hedgesim::models::contract::OptionLeg;
use hedgesim::models::vol_link::ExponentialVolLink;
use hedgesim::risk::tail;
use hedgesim::simulation::engine::MonteCarloEngine;
use hedgesim::state::ReturnSample;
use std::path::Path;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&cfg) {
        tracing::error!("simulation failed: {e}");
        std::process::exit(1);
    }
}

fn run(cfg: &AppConfig) -> EngineResult<()> {
    let sample = read_returns(&cfg.returns_path, cfg.returns_are_prices)?;
    tracing::info!(
        path = %cfg.returns_path.display(),
        observations = sample.len(),
        mean = sample.mean(),
        "return sample loaded"
    );

    let pricer = BlackScholes::new();
    let vol_link = ExponentialVolLink::new(cfg.vol_link_k, cfg.min_iv)?;
    let composer = HedgeComposer::new(&pricer, &vol_link, cfg.repricing_mode);

    let result = match &cfg.hedge_path {
        Some(path) => {
            let positions = read_positions(path)?;
            let greeks = positions.net_greeks(&pricer, cfg.underlying_price)?;
            tracing::info!(
                legs = positions.len(),
                net_cost = positions.net_inception_cost(),
                allocation = positions.hedge_allocation(cfg.simulation.portfolio_value)?,
                delta = greeks.delta,
                gamma = greeks.gamma,
                vega = greeks.vega,
                theta = greeks.theta,
                "hedge loaded"
            );
            composer.compose(&sample, cfg.underlying_price, &positions, &cfg.simulation)?
        }
        None => {
            tracing::info!("no hedge configured, running unhedged");
            composer.compose_unhedged(&sample, &cfg.simulation)?
        }
    };

    log_tail_diagnostics("original", &result.original_returns, cfg.tail_k);
    log_tail_diagnostics("hedged", &result.hedged_returns, cfg.tail_k);

    let engine = MonteCarloEngine::from_config(&cfg.simulation)?;
    tracing::info!(seed = engine.seed, "starting monte carlo");
    let stats = engine.simulate(&result.hedged_returns)?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// One value per line. Blank lines and `#` comments are skipped.
fn read_returns(path: &Path, are_prices: bool) -> EngineResult<ReturnSample> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| EngineError::Io(format!("{}: {e}", path.display())))?;

    let mut values = Vec::new();
    for (i, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let v = line
            .parse::<f64>()
            .map_err(|e| EngineError::Parse(format!("{} line {}: {e}", path.display(), i + 1)))?;
        values.push(v);
    }

    if are_prices {
        ReturnSample::from_prices(&values, 1)
    } else {
        ReturnSample::new(values)
    }
}

fn read_positions(path: &Path) -> EngineResult<HedgePositions> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| EngineError::Io(format!("{}: {e}", path.display())))?;
    let legs: Vec<OptionLeg> = serde_json::from_str(&raw)?;
    HedgePositions::from_legs(&legs, Local::now().date_naive())
}

/// Loss-side tail diagnostics. Failures are logged, never fatal.
fn log_tail_diagnostics(label: &str, sample: &ReturnSample, k: usize) {
    let losses = sample.losses();
    if losses.len() <= k {
        tracing::warn!(label, losses = losses.len(), k, "too few losses for tail diagnostics");
        return;
    }

    let hill = tail::hill_estimator(&losses, k);
    let max_to_sum =
        tail::maximum_to_sum_ratio(&losses, 2).map(|r| r.last().copied().unwrap_or(f64::NAN));
    match (hill, max_to_sum) {
        (Ok(alpha), Ok(ratio)) => {
            tracing::info!(
                label,
                losses = losses.len(),
                hill_alpha = alpha,
                max_to_sum_2 = ratio,
                "loss tail"
            );
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(label, error = %e, "tail diagnostics failed");
        }
    }
}
