//! Backtest runner: wires together loading, the simulator and metrics.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads data per the config, then runs. Used by CLI.
//! - `run_backtest_from_data()`: takes pre-loaded bars and ticks. Used by the sweep.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tickfill_core::domain::{Bar, Tick};
use tickfill_core::engine::{
    ExecutionSimulator, SimulationError, SimulatorConfig, TickCursor, TracingObserver,
};
use tickfill_core::fingerprint::RunFingerprint;
use tickfill_core::ledger::TradeLedger;

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_data, LoadError, LoadOptions};
use crate::metrics::LedgerSummary;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
    #[error("fingerprint error: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub config: SimulatorConfig,
    pub summary: LedgerSummary,
    pub ledger: TradeLedger,
    pub fingerprint: RunFingerprint,
    pub initial_capital: f64,
    pub has_synthetic: bool,
    pub bar_count: usize,
    pub tick_count: usize,
    #[serde(default)]
    pub data_quality_warnings: Vec<String>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run a single replay from a `BacktestConfig` (loads data from disk).
pub fn run_single_backtest(
    config: &BacktestConfig,
    opts: &LoadOptions,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let loaded = load_data(&config.data, opts)?;

    let mut result = run_backtest_from_data(
        &config.simulator_config(),
        &loaded.bars,
        &loaded.ticks,
        &config.data.symbol,
        config.output.initial_capital,
        loaded.has_synthetic,
    )?;

    if loaded.rejected_bar_rows > 0 {
        result.data_quality_warnings.push(format!(
            "{} bar rows rejected (non-numeric or missing fields)",
            loaded.rejected_bar_rows
        ));
    }
    if loaded.rejected_tick_rows > 0 {
        result.data_quality_warnings.push(format!(
            "{} tick rows rejected (non-numeric or missing fields)",
            loaded.rejected_tick_rows
        ));
    }
    Ok(result)
}

/// Run a replay with pre-loaded data: no I/O.
pub fn run_backtest_from_data(
    config: &SimulatorConfig,
    bars: &[Bar],
    ticks: &[Tick],
    symbol: &str,
    initial_capital: f64,
    has_synthetic: bool,
) -> Result<BacktestResult, RunError> {
    let simulator = ExecutionSimulator::from_config(config.clone(), TickCursor::new(ticks.to_vec()))?
        .with_observer(TracingObserver);
    let ledger = simulator.run(bars)?;

    let summary = LedgerSummary::compute(&ledger, initial_capital);
    let fingerprint = RunFingerprint::new(config, bars, ticks, &ledger)?;

    tracing::info!(
        symbol,
        policy = config.exit_policy.name(),
        round_trips = summary.round_trips,
        net_pnl = summary.total_net_pnl,
        open = summary.has_open_position,
        "replay finished"
    );

    let mut data_quality_warnings = Vec::new();
    if has_synthetic {
        data_quality_warnings.push("synthetic data: results are not from market data".into());
    }
    if config.exit_policy.requires_volatility() {
        let missing = bars.iter().filter(|b| b.usable_volatility().is_none()).count();
        if missing > 0 {
            tracing::warn!(missing, "bars without volatility were skipped");
            data_quality_warnings.push(format!("{missing} bars skipped for missing volatility"));
        }
    }

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        symbol: symbol.to_string(),
        config: config.clone(),
        summary,
        ledger,
        fingerprint,
        initial_capital,
        has_synthetic,
        bar_count: bars.len(),
        tick_count: ticks.len(),
        data_quality_warnings,
    })
}
