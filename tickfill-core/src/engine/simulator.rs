//! ExecutionSimulator: replays bars against ticks and builds the ledger.
//!
//! Per bar:
//! 1. Resolve the fill price (nearest side-matched tick, else close).
//! 2. Flat and signal is ±1: open a position, append an `Enter` record.
//! 3. Positioned: ask the exit policy; on exit close the position and
//!    append the exit record.
//! 4. Otherwise nothing happens.
//!
//! Every step completes before the next begins, and each state transition
//! appends exactly one record.

use crate::domain::{
    Bar, ClosedPosition, ExitReason, FillSource, PositionError, PositionState, TradeDirection,
    TradeReason, TradeRecord,
};
use crate::engine::execution::{resolve_fill, CostModel, ResolvedFill};
use crate::engine::exit_policy::ExitPolicy;
use crate::engine::observer::{NoopObserver, TradeObserver};
use crate::engine::state::{ParamError, SimulatorConfig};
use crate::engine::tick_cursor::TickCursor;
use crate::ledger::TradeLedger;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that abort a replay.
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error(transparent)]
    Position(#[from] PositionError),

    #[error("invalid simulator config: {0}")]
    Config(#[from] ParamError),

    #[error("bar at {current} is older than the previous bar at {previous}")]
    OutOfOrderBar {
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
}

/// One-instrument replay engine, generic over the exit policy and the
/// trade observer. Owns its tick cursor, position and ledger exclusively.
pub struct ExecutionSimulator<P = Box<dyn ExitPolicy>, O = NoopObserver> {
    config: SimulatorConfig,
    cost_model: CostModel,
    policy: P,
    cursor: TickCursor,
    position: PositionState,
    ledger: TradeLedger,
    observer: O,
    last_bar: Option<Bar>,
    bars_processed: usize,
}

impl ExecutionSimulator {
    /// Build a simulator whose exit policy comes from `config.exit_policy`.
    pub fn from_config(config: SimulatorConfig, cursor: TickCursor) -> Result<Self, SimulationError> {
        config.validate()?;
        let policy = config.exit_policy.build()?;
        Ok(Self::assemble(config, policy, cursor, NoopObserver))
    }
}

impl<P: ExitPolicy> ExecutionSimulator<P, NoopObserver> {
    /// Build a simulator with an injected exit policy. `config.exit_policy`
    /// is not consulted.
    pub fn new(config: SimulatorConfig, policy: P, cursor: TickCursor) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self::assemble(config, policy, cursor, NoopObserver))
    }
}

impl<P: ExitPolicy, O: TradeObserver> ExecutionSimulator<P, O> {
    fn assemble(config: SimulatorConfig, policy: P, cursor: TickCursor, observer: O) -> Self {
        Self {
            cost_model: config.cost_model(),
            config,
            policy,
            cursor,
            position: PositionState::new(),
            ledger: TradeLedger::new(),
            observer,
            last_bar: None,
            bars_processed: 0,
        }
    }

    /// Replace the observer. Records already appended are not replayed.
    pub fn with_observer<O2: TradeObserver>(self, observer: O2) -> ExecutionSimulator<P, O2> {
        ExecutionSimulator {
            config: self.config,
            cost_model: self.cost_model,
            policy: self.policy,
            cursor: self.cursor,
            position: self.position,
            ledger: self.ledger,
            observer,
            last_bar: self.last_bar,
            bars_processed: self.bars_processed,
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn position(&self) -> &PositionState {
        &self.position
    }

    pub fn cursor(&self) -> &TickCursor {
        &self.cursor
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    pub fn bars_processed(&self) -> usize {
        self.bars_processed
    }

    /// Process one bar. Returns the reason of the record appended, if any.
    pub fn step(&mut self, bar: &Bar) -> Result<Option<TradeReason>, SimulationError> {
        if let Some(previous) = &self.last_bar {
            if bar.timestamp < previous.timestamp {
                return Err(SimulationError::OutOfOrderBar {
                    previous: previous.timestamp,
                    current: bar.timestamp,
                });
            }
        }

        let fill = resolve_fill(&mut self.cursor, bar, self.config.tick_side);
        self.last_bar = Some(*bar);
        self.bars_processed += 1;

        if self.policy.requires_volatility() && bar.usable_volatility().is_none() {
            tracing::trace!(timestamp = %bar.timestamp, "no volatility; bar skipped");
            return Ok(None);
        }

        let open = self.position.current().copied();
        match open {
            None => match TradeDirection::from_signal(bar.signal) {
                Some(direction) => {
                    self.enter(direction, bar, fill)?;
                    Ok(Some(TradeReason::Enter))
                }
                None => Ok(None),
            },
            Some(position) => match self.policy.evaluate(&position, bar, fill.price) {
                Some(reason) => {
                    self.exit(reason, bar, fill)?;
                    Ok(Some(reason.into()))
                }
                None => Ok(None),
            },
        }
    }

    /// End the replay. With `force_close_at_end`, a still-open position is
    /// closed at the final bar's close with reason `EndOfData`; otherwise it
    /// is left open and the ledger ends on its entry record.
    pub fn finish(mut self) -> Result<TradeLedger, SimulationError> {
        if self.config.force_close_at_end && !self.position.is_flat() {
            if let Some(bar) = self.last_bar {
                let fill = ResolvedFill {
                    price: bar.close,
                    source: FillSource::BarClose,
                };
                self.exit(ExitReason::EndOfData, &bar, fill)?;
            }
        }
        Ok(self.ledger)
    }

    /// Replay every bar, then [`finish`](Self::finish).
    pub fn run<'a, I>(mut self, bars: I) -> Result<TradeLedger, SimulationError>
    where
        I: IntoIterator<Item = &'a Bar>,
    {
        for bar in bars {
            self.step(bar)?;
        }
        self.finish()
    }

    fn enter(&mut self, direction: TradeDirection, bar: &Bar, fill: ResolvedFill) -> Result<(), SimulationError> {
        let size = self.config.position_size;
        self.position.open(direction, size, fill.price, bar.timestamp)?;
        let fee = self.cost_model.entry_fee(fill.price, size);
        self.append(TradeRecord {
            timestamp: bar.timestamp,
            side: direction.entry_side(),
            quantity: size,
            price: fill.price,
            position: direction,
            reason: TradeReason::Enter,
            gross_pnl: 0.0,
            fee,
            net_pnl: -fee,
            turnover: size * fill.price,
            volatility: bar.volatility,
            benchmark_price: bar.close,
            fill_source: fill.source,
        });
        Ok(())
    }

    fn exit(&mut self, reason: ExitReason, bar: &Bar, fill: ResolvedFill) -> Result<(), SimulationError> {
        let ClosedPosition {
            position,
            gross_pnl,
            ..
        } = self.position.close(fill.price, bar.timestamp)?;
        let fee = self
            .cost_model
            .exit_fee(position.entry_price, fill.price, position.size);
        self.append(TradeRecord {
            timestamp: bar.timestamp,
            side: position.direction.exit_side(),
            quantity: position.size,
            price: fill.price,
            position: position.direction,
            reason: reason.into(),
            gross_pnl,
            fee,
            net_pnl: gross_pnl - fee,
            turnover: position.size * fill.price,
            volatility: bar.volatility,
            benchmark_price: bar.close,
            fill_source: fill.source,
        });
        Ok(())
    }

    fn append(&mut self, record: TradeRecord) {
        let record = self.ledger.push(record);
        self.observer.on_trade(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PositionSide, Signal, Tick};
    use crate::engine::execution::FeeRule;
    use crate::engine::exit_policy::{BandExit, ExitPolicyConfig, ReversalExit};
    use crate::engine::observer::FnObserver;
    use chrono::TimeZone;

    fn ts(minute: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + minute * 60_000).unwrap()
    }

    fn bar(minute: i64, close: f64, signal: i64) -> Bar {
        Bar::new(ts(minute), close, Signal::try_from(signal).unwrap())
    }

    fn reversal_config() -> SimulatorConfig {
        SimulatorConfig::new(1.0, 0.0, ExitPolicyConfig::Reversal)
    }

    #[test]
    fn flat_signal_opens_nothing() {
        let mut sim = ExecutionSimulator::from_config(reversal_config(), TickCursor::empty()).unwrap();
        assert_eq!(sim.step(&bar(0, 100.0, 0)).unwrap(), None);
        assert_eq!(sim.position().side(), PositionSide::Flat);
        assert!(sim.ledger().is_empty());
    }

    #[test]
    fn entry_uses_close_without_ticks() {
        let mut sim = ExecutionSimulator::from_config(reversal_config(), TickCursor::empty()).unwrap();
        assert_eq!(sim.step(&bar(0, 100.0, -1)).unwrap(), Some(TradeReason::Enter));
        let rec = &sim.ledger().records()[0];
        assert_eq!(rec.side, crate::domain::OrderSide::Sell);
        assert_eq!(rec.position, TradeDirection::Short);
        assert_eq!(rec.price, 100.0);
        assert_eq!(rec.fill_source, FillSource::BarClose);
        assert_eq!(sim.position().side(), PositionSide::Short);
    }

    #[test]
    fn entry_uses_matching_tick() {
        let ticks = vec![Tick {
            timestamp: ts(0),
            price: 100.25,
            is_buyer_maker: true,
            symbol: "SPOT_BTC_USDT".into(),
        }];
        let mut sim = ExecutionSimulator::from_config(reversal_config(), TickCursor::new(ticks)).unwrap();
        sim.step(&bar(0, 100.0, 1)).unwrap();
        let rec = &sim.ledger().records()[0];
        assert_eq!(rec.price, 100.25);
        assert_eq!(rec.benchmark_price, 100.0);
        assert_eq!(rec.fill_source, FillSource::Tick);
    }

    #[test]
    fn same_direction_signal_while_positioned_is_ignored() {
        let mut sim = ExecutionSimulator::new(reversal_config(), ReversalExit, TickCursor::empty()).unwrap();
        sim.step(&bar(0, 100.0, 1)).unwrap();
        assert_eq!(sim.step(&bar(1, 101.0, 1)).unwrap(), None);
        assert_eq!(sim.ledger().len(), 1);
    }

    #[test]
    fn reversal_exit_does_not_reenter_on_same_bar() {
        let mut sim = ExecutionSimulator::new(reversal_config(), ReversalExit, TickCursor::empty()).unwrap();
        sim.step(&bar(0, 100.0, 1)).unwrap();
        assert_eq!(sim.step(&bar(1, 104.0, -1)).unwrap(), Some(TradeReason::SignalExit));
        assert!(sim.position().is_flat());
        // The next short signal opens a new position.
        assert_eq!(sim.step(&bar(2, 103.0, -1)).unwrap(), Some(TradeReason::Enter));
        assert_eq!(sim.ledger().len(), 3);
    }

    #[test]
    fn band_skips_bars_without_volatility() {
        let config = SimulatorConfig::default();
        let mut sim = ExecutionSimulator::new(config, BandExit::new(9.0, 3.0).unwrap(), TickCursor::empty()).unwrap();
        assert_eq!(sim.step(&bar(0, 100.0, 1)).unwrap(), None);
        assert!(sim.position().is_flat());

        sim.step(&bar(1, 100.0, 1).with_volatility(2.0)).unwrap();
        assert_eq!(sim.position().side(), PositionSide::Long);

        // 200 would be past the band, but no volatility means no exit.
        assert_eq!(sim.step(&bar(2, 200.0, 0)).unwrap(), None);
        assert_eq!(sim.position().side(), PositionSide::Long);
        assert_eq!(sim.bars_processed(), 3);
    }

    #[test]
    fn per_leg_fees_and_net_pnl() {
        let config = SimulatorConfig {
            fee_rate: 0.001,
            position_size: 2.0,
            fee_rule: FeeRule::PerLeg,
            ..reversal_config()
        };
        let ledger = ExecutionSimulator::from_config(config, TickCursor::empty())
            .unwrap()
            .run(&[bar(0, 100.0, 1), bar(1, 110.0, -1)])
            .unwrap();
        let entry = &ledger.records()[0];
        let exit = &ledger.records()[1];
        assert!((entry.fee - 0.2).abs() < 1e-12);
        assert!((entry.net_pnl + 0.2).abs() < 1e-12);
        assert!((exit.gross_pnl - 20.0).abs() < 1e-12);
        assert!((exit.fee - 0.22).abs() < 1e-12);
        assert!((exit.net_pnl - 19.78).abs() < 1e-12);
        assert!((exit.turnover - 220.0).abs() < 1e-12);
    }

    #[test]
    fn round_trip_fee_rule_charges_both_legs_on_exit() {
        let config = SimulatorConfig {
            fee_rate: 0.001,
            fee_rule: FeeRule::RoundTripAtExit,
            ..reversal_config()
        };
        let ledger = ExecutionSimulator::from_config(config, TickCursor::empty())
            .unwrap()
            .run(&[bar(0, 100.0, -1), bar(1, 90.0, 1)])
            .unwrap();
        assert_eq!(ledger.records()[0].fee, 0.0);
        let exit = &ledger.records()[1];
        assert!((exit.gross_pnl - 10.0).abs() < 1e-12);
        assert!((exit.fee - 0.19).abs() < 1e-12);
        assert!((exit.net_pnl - 9.81).abs() < 1e-12);
    }

    #[test]
    fn force_close_at_end_uses_last_close() {
        let config = SimulatorConfig {
            force_close_at_end: true,
            ..reversal_config()
        };
        let ledger = ExecutionSimulator::from_config(config, TickCursor::empty())
            .unwrap()
            .run(&[bar(0, 100.0, 1), bar(1, 103.0, 0)])
            .unwrap();
        assert_eq!(ledger.len(), 2);
        let exit = &ledger.records()[1];
        assert_eq!(exit.reason, TradeReason::EndOfData);
        assert_eq!(exit.price, 103.0);
        assert_eq!(exit.timestamp, ts(1));
        assert!(!ledger.has_open_position());
    }

    #[test]
    fn open_position_left_dangling_without_force_close() {
        let ledger = ExecutionSimulator::from_config(reversal_config(), TickCursor::empty())
            .unwrap()
            .run(&[bar(0, 100.0, 1), bar(1, 103.0, 0)])
            .unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger.has_open_position());
    }

    #[test]
    fn out_of_order_bar_is_fatal() {
        let mut sim = ExecutionSimulator::from_config(reversal_config(), TickCursor::empty()).unwrap();
        sim.step(&bar(5, 100.0, 0)).unwrap();
        let err = sim.step(&bar(4, 100.0, 1)).unwrap_err();
        assert!(matches!(err, SimulationError::OutOfOrderBar { .. }));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SimulatorConfig {
            position_size: -1.0,
            ..SimulatorConfig::default()
        };
        let err = ExecutionSimulator::from_config(config, TickCursor::empty()).err();
        assert_eq!(err, Some(SimulationError::Config(ParamError::PositionSize(-1.0))));
    }

    #[test]
    fn observer_sees_every_record() {
        let mut seen = Vec::new();
        let ledger = ExecutionSimulator::from_config(reversal_config(), TickCursor::empty())
            .unwrap()
            .with_observer(FnObserver(|r: &TradeRecord| seen.push(r.reason)))
            .run(&[bar(0, 100.0, 1), bar(1, 99.0, -1), bar(2, 98.0, -1)])
            .unwrap();
        assert_eq!(
            seen,
            vec![TradeReason::Enter, TradeReason::SignalExit, TradeReason::Enter]
        );
        assert_eq!(ledger.len(), seen.len());
    }
}
