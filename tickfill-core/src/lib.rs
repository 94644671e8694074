//! Tickfill Core: tick-replay execution simulation.
//!
//! This crate contains the replay engine:
//! - Domain types (bars, ticks, positions, trade records)
//! - Forward-only tick cursor for side-matched fill prices
//! - Pluggable exit policies (volatility band, signal reversal)
//! - The execution simulator state machine
//! - The append-only trade ledger and its tabular rendering
//! - Run fingerprinting for reproducibility checks

pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod ledger;

pub use domain::{Bar, PositionState, Signal, Tick, TradeRecord};
pub use engine::{ExecutionSimulator, ExitPolicy, SimulationError, SimulatorConfig, TickCursor};
pub use ledger::TradeLedger;
