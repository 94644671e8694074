//! Ledger summary metrics: pure functions over a finished trade ledger.
//!
//! Every metric is a pure function: ledger or equity curve in, scalar out.
//! Equity is `initial_capital + cumulative net PnL`, sampled after each
//! ledger record, so entry fees under the per-leg rule show up immediately.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tickfill_core::domain::{TradeReason, TradeRecord};
use tickfill_core::ledger::{RoundTrip, TradeLedger};

/// Aggregate statistics for one replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub entries: usize,
    pub exits: usize,
    pub round_trips: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    /// Exit counts keyed by reason label (`TakeProfit`, `StopLoss`, ...).
    pub exits_by_reason: BTreeMap<String, usize>,
    pub total_gross_pnl: f64,
    pub total_fees: f64,
    pub total_net_pnl: f64,
    pub total_turnover: f64,
    pub profit_factor: f64,
    pub max_consecutive_losses: usize,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub has_open_position: bool,
}

impl LedgerSummary {
    pub fn compute(ledger: &TradeLedger, initial_capital: f64) -> Self {
        let trips = ledger.round_trips();
        let wins = trips.iter().filter(|t| t.is_winner()).count();
        let equity = equity_curve(ledger.records(), initial_capital);

        let mut exits_by_reason = BTreeMap::new();
        for record in ledger.iter().filter(|r| r.is_exit()) {
            *exits_by_reason
                .entry(record.reason.as_str().to_string())
                .or_insert(0) += 1;
        }

        Self {
            entries: ledger.entry_count(),
            exits: ledger.exit_count(),
            round_trips: trips.len(),
            wins,
            losses: trips.len() - wins,
            win_rate: win_rate(&trips),
            exits_by_reason,
            total_gross_pnl: ledger.iter().map(|r| r.gross_pnl).sum(),
            total_fees: ledger.iter().map(|r| r.fee).sum(),
            total_net_pnl: ledger.iter().map(|r| r.net_pnl).sum(),
            total_turnover: ledger.iter().map(|r| r.turnover).sum(),
            profit_factor: profit_factor(&trips),
            max_consecutive_losses: max_consecutive_losses(&trips),
            total_return: total_return(&equity),
            max_drawdown: max_drawdown(&equity),
            has_open_position: ledger.has_open_position(),
        }
    }

    pub fn exits_for(&self, reason: TradeReason) -> usize {
        self.exits_by_reason
            .get(reason.as_str())
            .copied()
            .unwrap_or(0)
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Equity after each record, starting with `initial_capital`.
pub fn equity_curve(records: &[TradeRecord], initial_capital: f64) -> Vec<f64> {
    let mut equity = initial_capital;
    std::iter::once(initial_capital)
        .chain(records.iter().map(|r| {
            equity += r.net_pnl;
            equity
        }))
        .collect()
}

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&initial), Some(&last)) if equity_curve.len() >= 2 && initial > 0.0 => {
            (last - initial) / initial
        }
        _ => 0.0,
    }
}

/// Maximum peak-to-trough decline as a negative fraction (0.0 if none).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Fraction of round trips with positive net PnL.
pub fn win_rate(trips: &[RoundTrip<'_>]) -> f64 {
    if trips.is_empty() {
        return 0.0;
    }
    trips.iter().filter(|t| t.is_winner()).count() as f64 / trips.len() as f64
}

/// Gross winnings over gross losses, by round-trip net PnL.
///
/// Capped at 100.0 when there are no losing trips; 0.0 with no wins.
pub fn profit_factor(trips: &[RoundTrip<'_>]) -> f64 {
    let (won, lost) = trips.iter().fold((0.0, 0.0), |(won, lost), t| {
        let pnl = t.net_pnl();
        if pnl > 0.0 {
            (won + pnl, lost)
        } else {
            (won, lost - pnl)
        }
    });
    if lost < 1e-10 {
        return if won > 0.0 { 100.0 } else { 0.0 };
    }
    (won / lost).min(100.0)
}

/// Longest run of non-winning round trips.
pub fn max_consecutive_losses(trips: &[RoundTrip<'_>]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for trip in trips {
        if trip.is_winner() {
            current = 0;
        } else {
            current += 1;
            longest = longest.max(current);
        }
    }
    longest
}
