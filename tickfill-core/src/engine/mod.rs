//! Replay engine: tick cursor, exit policies, cost model and the simulator
//! state machine that ties them together.

pub mod execution;
pub mod exit_policy;
pub mod observer;
pub mod simulator;
pub mod state;
pub mod tick_cursor;

pub use execution::{resolve_fill, CostModel, FeeRule, ResolvedFill, TickSideConvention};
pub use exit_policy::{BandExit, ExitPolicy, ExitPolicyConfig, ReversalExit};
pub use observer::{FnObserver, NoopObserver, TracingObserver, TradeObserver};
pub use simulator::{ExecutionSimulator, SimulationError};
pub use state::{ParamError, SimulatorConfig};
pub use tick_cursor::TickCursor;
