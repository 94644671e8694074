//! Domain types for the execution simulator.

pub mod bar;
pub mod position;
pub mod tick;
pub mod trade;

pub use bar::{Bar, Signal, SignalError};
pub use position::{ClosedPosition, OpenPosition, PositionError, PositionSide, PositionState};
pub use tick::{SideFilter, Tick};
pub use trade::{ExitReason, FillSource, OrderSide, TradeDirection, TradeReason, TradeRecord};
