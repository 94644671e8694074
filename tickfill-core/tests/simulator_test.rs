//! Integration tests for the execution simulator.
//!
//! Tests:
//! 1. Band exit takes profit before a later adverse bar is reached
//! 2. Reversal exit pairs one entry with one signal exit
//! 3. Tick fallback fills at the bar close exactly
//! 4. Boundary shapes: empty stream, single bar with and without force close
//! 5. Invalid transitions surface as errors
//! 6. Replays are idempotent
//! 7. Presets reproduce the source strategies' fee and side conventions

use chrono::{DateTime, TimeZone, Utc};
use tickfill_core::domain::{
    Bar, ExitReason, FillSource, OrderSide, PositionError, PositionSide, PositionState, Signal,
    Tick, TradeDirection, TradeReason,
};
use tickfill_core::engine::{
    BandExit, ExecutionSimulator, ExitPolicyConfig, FeeRule, ReversalExit, SimulatorConfig,
    TickCursor, TickSideConvention,
};
use tickfill_core::ledger::TradeLedger;

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn ts(minute: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_672_531_200_000 + minute * 60_000).unwrap()
}

fn bars(closes: &[f64], signals: &[i64], volatility: Option<f64>) -> Vec<Bar> {
    closes
        .iter()
        .zip(signals)
        .enumerate()
        .map(|(i, (&close, &signal))| {
            let bar = Bar::new(ts(i as i64), close, Signal::try_from(signal).unwrap());
            match volatility {
                Some(v) => bar.with_volatility(v),
                None => bar,
            }
        })
        .collect()
}

fn tick(minute: i64, second: i64, price: f64, is_buyer_maker: bool) -> Tick {
    Tick {
        timestamp: ts(minute) + chrono::Duration::seconds(second),
        price,
        is_buyer_maker,
        symbol: "SPOT_BTC_USDT".into(),
    }
}

fn band_config() -> SimulatorConfig {
    SimulatorConfig::new(
        1.0,
        0.0,
        ExitPolicyConfig::Band {
            take_profit_mult: 9.0,
            stop_loss_mult: 3.0,
        },
    )
}

fn replay(config: SimulatorConfig, ticks: Vec<Tick>, bars: &[Bar]) -> TradeLedger {
    ExecutionSimulator::from_config(config, TickCursor::new(ticks))
        .unwrap()
        .run(bars)
        .unwrap()
}

// ──────────────────────────────────────────────
// Scenarios
// ──────────────────────────────────────────────

#[test]
fn band_take_profit_fires_before_adverse_bar() {
    let input = bars(&[100.0, 105.0, 119.0, 80.0], &[1, 0, 0, 0], Some(2.0));
    let ledger = replay(band_config(), Vec::new(), &input);

    assert_eq!(ledger.len(), 2);
    let entry = &ledger.records()[0];
    assert_eq!(entry.reason, TradeReason::Enter);
    assert_eq!(entry.position, TradeDirection::Long);
    assert_eq!(entry.side, OrderSide::Buy);
    assert_eq!(entry.price, 100.0);

    let exit = &ledger.records()[1];
    assert_eq!(exit.reason, TradeReason::TakeProfit);
    assert_eq!(exit.side, OrderSide::Sell);
    assert_eq!(exit.price, 119.0);
    assert_eq!(exit.timestamp, ts(2));
    assert!((exit.gross_pnl - 19.0).abs() < 1e-9);
}

#[test]
fn band_stop_loss_for_short() {
    // Short at 100 with ATR 2: stop at 106, target at 82.
    let input = bars(&[100.0, 104.0, 106.5], &[-1, 0, 0], Some(2.0));
    let ledger = replay(band_config(), Vec::new(), &input);

    assert_eq!(ledger.len(), 2);
    let exit = &ledger.records()[1];
    assert_eq!(exit.reason, TradeReason::StopLoss);
    assert_eq!(exit.side, OrderSide::Buy);
    assert_eq!(exit.position, TradeDirection::Short);
    assert!((exit.gross_pnl + 6.5).abs() < 1e-9);
}

#[test]
fn reversal_pairs_one_entry_with_one_exit() {
    let input = bars(&[100.0, 101.0, 102.0, 103.0, 104.0], &[0, 1, 0, 0, -1], None);
    let ledger = replay(SimulatorConfig::new(1.0, 0.0, ExitPolicyConfig::Reversal), Vec::new(), &input);

    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.records()[0].reason, TradeReason::Enter);
    assert_eq!(ledger.records()[0].position, TradeDirection::Long);
    assert_eq!(ledger.records()[0].timestamp, ts(1));
    assert_eq!(ledger.records()[1].reason, TradeReason::SignalExit);
    assert_eq!(ledger.records()[1].timestamp, ts(4));
    assert!((ledger.records()[1].gross_pnl - 3.0).abs() < 1e-9);
}

#[test]
fn fallback_fill_equals_close_exactly() {
    // Only a seller-maker tick exists; a long entry needs buyer-maker.
    let ticks = vec![tick(0, 5, 99.5, false)];
    let input = bars(&[100.123456789], &[1], Some(1.0));
    let ledger = replay(band_config(), ticks, &input);

    let entry = &ledger.records()[0];
    assert_eq!(entry.price, 100.123456789);
    assert_eq!(entry.fill_source, FillSource::BarClose);
}

#[test]
fn matching_tick_overrides_close() {
    let ticks = vec![tick(0, 2, 100.4, true), tick(1, 3, 101.7, false)];
    let input = bars(&[100.0, 101.0], &[1, -1], None);
    let ledger = replay(SimulatorConfig::new(1.0, 0.0, ExitPolicyConfig::Reversal), ticks, &input);

    assert_eq!(ledger.records()[0].price, 100.4);
    assert_eq!(ledger.records()[0].fill_source, FillSource::Tick);
    // The exit bar carries signal -1, so the seller-maker tick matches.
    assert_eq!(ledger.records()[1].price, 101.7);
    assert!((ledger.records()[1].gross_pnl - 1.3).abs() < 1e-9);
}

#[test]
fn stale_ticks_are_never_used() {
    // The only buyer-maker tick precedes the bar.
    let ticks = vec![tick(0, 0, 50.0, true)];
    let input = vec![Bar::new(ts(1), 100.0, Signal::Long)];
    let ledger = replay(SimulatorConfig::new(1.0, 0.0, ExitPolicyConfig::Reversal), ticks, &input);
    assert_eq!(ledger.records()[0].price, 100.0);
}

#[test]
fn band_exit_compares_resolved_fill_price() {
    // Close 117 is inside the band but the tick at 118.5 is past the target.
    let ticks = vec![tick(1, 1, 118.5, false)];
    let input = bars(&[100.0, 117.0], &[1, 0], Some(2.0));
    let ledger = replay(band_config(), ticks, &input);

    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.records()[1].reason, TradeReason::TakeProfit);
    assert_eq!(ledger.records()[1].price, 118.5);
}

#[test]
fn any_side_convention_takes_next_tick() {
    let config = SimulatorConfig {
        tick_side: TickSideConvention::AnySide,
        ..SimulatorConfig::new(1.0, 0.0, ExitPolicyConfig::Reversal)
    };
    let ticks = vec![tick(0, 1, 100.2, false)];
    let ledger = replay(config, ticks, &bars(&[100.0], &[1], None));
    assert_eq!(ledger.records()[0].price, 100.2);
}

// ──────────────────────────────────────────────
// Boundaries
// ──────────────────────────────────────────────

#[test]
fn empty_bar_stream_yields_empty_ledger() {
    let ledger = replay(band_config(), Vec::new(), &[]);
    assert!(ledger.is_empty());

    let forced = SimulatorConfig {
        force_close_at_end: true,
        ..band_config()
    };
    assert!(replay(forced, Vec::new(), &[]).is_empty());
}

#[test]
fn single_bar_entry_without_force_close() {
    let ledger = replay(band_config(), Vec::new(), &bars(&[100.0], &[1], Some(2.0)));
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.entry_count() - ledger.exit_count(), 1);
    assert!(ledger.has_open_position());
}

#[test]
fn single_bar_entry_with_force_close() {
    let config = SimulatorConfig {
        force_close_at_end: true,
        ..band_config()
    };
    let ledger = replay(config, Vec::new(), &bars(&[100.0], &[-1], Some(2.0)));
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.records()[1].reason, TradeReason::from(ExitReason::EndOfData));
    assert_eq!(ledger.records()[1].price, 100.0);
    assert_eq!(ledger.records()[1].gross_pnl, 0.0);
}

#[test]
fn missing_volatility_skips_entry_under_band() {
    let ledger = replay(band_config(), Vec::new(), &bars(&[100.0, 101.0], &[1, 1], None));
    assert!(ledger.is_empty());
}

#[test]
fn zero_volatility_bar_does_not_collapse_the_band() {
    // Entry at 100 with a usable band; the zero-volatility bar at 100.5 is
    // skipped instead of exiting on a zero-width band.
    let input = vec![
        Bar::new(ts(0), 100.0, Signal::Long).with_volatility(2.0),
        Bar::new(ts(1), 100.5, Signal::Flat).with_volatility(0.0),
        Bar::new(ts(2), 101.0, Signal::Flat).with_volatility(2.0),
    ];
    let ledger = replay(band_config(), Vec::new(), &input);
    assert_eq!(ledger.len(), 1);
    assert!(ledger.records()[0].is_entry());
}

#[test]
fn nan_volatility_is_treated_as_missing() {
    let input = vec![Bar::new(ts(0), 100.0, Signal::Long).with_volatility(f64::NAN)];
    assert!(replay(band_config(), Vec::new(), &input).is_empty());
}

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

#[test]
fn invalid_transitions_are_rejected() {
    let mut state = PositionState::new();
    assert_eq!(state.close(100.0, ts(0)).unwrap_err(), PositionError::NotOpen);

    state.open(TradeDirection::Long, 1.0, 100.0, ts(0)).unwrap();
    let err = state
        .open(TradeDirection::Short, 1.0, 100.0, ts(1))
        .unwrap_err();
    assert!(err.to_string().contains("invalid state transition"));
    assert_eq!(state.side(), PositionSide::Long);
}

#[test]
fn out_of_order_bars_abort_the_run() {
    let mut input = bars(&[100.0, 101.0], &[0, 0], None);
    input.swap(0, 1);
    let result = ExecutionSimulator::from_config(band_config(), TickCursor::empty())
        .unwrap()
        .run(&input);
    assert!(result.is_err());
}

// ──────────────────────────────────────────────
// Determinism and presets
// ──────────────────────────────────────────────

#[test]
fn replay_is_idempotent() {
    let ticks: Vec<Tick> = (0..40)
        .map(|i| tick(i / 4, (i % 4) * 10, 100.0 + (i as f64 * 0.7).sin(), i % 3 == 0))
        .collect();
    let closes: Vec<f64> = (0..10).map(|i| 100.0 + (i as f64 * 0.9).cos() * 3.0).collect();
    let signals = [1, 0, -1, 0, 1, 1, -1, 0, 0, 1];
    let input = bars(&closes, &signals, Some(0.3));
    let config = SimulatorConfig {
        fee_rate: 0.0004,
        force_close_at_end: true,
        ..band_config()
    };

    let first = replay(config.clone(), ticks.clone(), &input);
    let second = replay(config, ticks, &input);
    assert_eq!(first, second);
    assert_eq!(first.digest(), second.digest());
}

#[test]
fn injected_policy_matches_configured_policy() {
    let input = bars(&[100.0, 105.0, 119.0, 80.0], &[1, 0, 0, 0], Some(2.0));
    let configured = replay(band_config(), Vec::new(), &input);
    let injected = ExecutionSimulator::new(band_config(), BandExit::new(9.0, 3.0).unwrap(), TickCursor::empty())
        .unwrap()
        .run(&input)
        .unwrap();
    assert_eq!(configured, injected);

    let reversal = ExecutionSimulator::new(band_config(), ReversalExit, TickCursor::empty())
        .unwrap()
        .run(&input)
        .unwrap();
    // Reversal never fires on flat signals, and does not need volatility.
    assert_eq!(reversal.len(), 1);
}

#[test]
fn cta_preset_charges_exit_leg_only() {
    let config = SimulatorConfig {
        fee_rate: 0.001,
        ..SimulatorConfig::cta_band()
    };
    assert_eq!(config.fee_rule, FeeRule::ExitLegOnly);
    let input = bars(&[100.0, 119.0], &[1, 0], Some(2.0));
    let ledger = replay(config, Vec::new(), &input);

    let entry = &ledger.records()[0];
    let exit = &ledger.records()[1];
    assert_eq!(entry.fee, 0.0);
    assert!((exit.fee - 119.0 * 0.0001 * 0.001).abs() < 1e-12);
    assert!((exit.net_pnl - (exit.gross_pnl - exit.fee)).abs() < 1e-12);
}

#[test]
fn pair_preset_reverses_at_bar_closes() {
    let config = SimulatorConfig::pair_reversal();
    let ticks = vec![tick(0, 1, 100.5, false), tick(1, 1, 98.0, true)];
    let ledger = replay(config, ticks, &bars(&[100.0, 99.0], &[1, -1], None));

    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.records()[0].price, 100.0);
    assert_eq!(ledger.records()[1].price, 99.0);
    assert_eq!(ledger.records()[0].fill_source, FillSource::BarClose);
    assert_eq!(ledger.records()[1].fill_source, FillSource::BarClose);
    assert_eq!(ledger.records()[1].reason, TradeReason::SignalExit);
    assert!((ledger.records()[1].fee - 99.0 * 0.0001 * 0.0002).abs() < 1e-15);
}

#[test]
fn cta_close_preset_books_round_trip_fee_at_close() {
    let config = SimulatorConfig {
        fee_rate: 0.001,
        ..SimulatorConfig::cta_band_close()
    };
    // The tick past the target is ignored; the exit waits for the 119 close.
    let ticks = vec![tick(1, 1, 118.5, false)];
    let input = bars(&[100.0, 117.0, 119.0], &[1, 0, 0], Some(2.0));
    let ledger = replay(config, ticks, &input);

    assert_eq!(ledger.len(), 2);
    let entry = &ledger.records()[0];
    let exit = &ledger.records()[1];
    assert_eq!(entry.fee, 0.0);
    assert_eq!(exit.price, 119.0);
    assert_eq!(exit.reason, TradeReason::TakeProfit);
    assert_eq!(exit.fill_source, FillSource::BarClose);
    assert!((exit.fee - (100.0 + 119.0) * 0.0001 * 0.001).abs() < 1e-12);
}
