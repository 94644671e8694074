//! Parameter sweep over band exit multipliers.
//!
//! Every grid point replays the same bars and ticks with an independent
//! simulator, so points run in parallel on the rayon pool with no shared
//! state. Results are sorted by total net PnL (descending), ties broken by
//! the multipliers, so output order does not depend on scheduling.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use tickfill_core::domain::{Bar, Tick};
use tickfill_core::engine::{ExitPolicyConfig, SimulatorConfig};

use crate::metrics::LedgerSummary;
use crate::runner::{run_backtest_from_data, RunError};

/// Take-profit and stop-loss multipliers to combine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandGrid {
    pub take_profit_mults: Vec<f64>,
    pub stop_loss_mults: Vec<f64>,
}

impl BandGrid {
    pub fn new(take_profit_mults: Vec<f64>, stop_loss_mults: Vec<f64>) -> Self {
        Self {
            take_profit_mults,
            stop_loss_mults,
        }
    }

    /// Returns the total number of configurations in this grid.
    pub fn size(&self) -> usize {
        self.take_profit_mults.len() * self.stop_loss_mults.len()
    }

    /// All `(take_profit, stop_loss)` pairs in row-major order.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.take_profit_mults
            .iter()
            .flat_map(|&tp| self.stop_loss_mults.iter().map(move |&sl| (tp, sl)))
            .collect()
    }
}

impl Default for BandGrid {
    fn default() -> Self {
        Self::new(vec![3.0, 6.0, 9.0, 12.0], vec![1.0, 2.0, 3.0, 4.0])
    }
}

/// Outcome of one grid point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepPoint {
    pub take_profit_mult: f64,
    pub stop_loss_mult: f64,
    pub summary: LedgerSummary,
    pub ledger_digest: String,
}

/// Replay `bars`/`ticks` once per grid point. `base` supplies everything
/// except the exit policy.
pub fn run_band_sweep(
    base: &SimulatorConfig,
    grid: &BandGrid,
    bars: &[Bar],
    ticks: &[Tick],
    symbol: &str,
    initial_capital: f64,
) -> Result<Vec<SweepPoint>, RunError> {
    let points = grid.points();
    tracing::info!(points = points.len(), symbol, "starting band sweep");

    let mut results = points
        .par_iter()
        .map(|&(tp, sl)| {
            let config = SimulatorConfig {
                exit_policy: ExitPolicyConfig::Band {
                    take_profit_mult: tp,
                    stop_loss_mult: sl,
                },
                ..base.clone()
            };
            let result = run_backtest_from_data(&config, bars, ticks, symbol, initial_capital, false)?;
            Ok(SweepPoint {
                take_profit_mult: tp,
                stop_loss_mult: sl,
                summary: result.summary,
                ledger_digest: result.fingerprint.ledger_digest,
            })
        })
        .collect::<Result<Vec<_>, RunError>>()?;

    results.sort_by(|a, b| {
        b.summary
            .total_net_pnl
            .total_cmp(&a.summary.total_net_pnl)
            .then(a.take_profit_mult.total_cmp(&b.take_profit_mult))
            .then(a.stop_loss_mult.total_cmp(&b.stop_loss_mult))
    });
    Ok(results)
}
