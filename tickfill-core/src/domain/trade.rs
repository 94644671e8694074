//! TradeRecord: one ledger row per entry or exit order.

use super::bar::Signal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order side of a single fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    /// Direction an entry signal asks for. `Flat` opens nothing.
    pub fn from_signal(signal: Signal) -> Option<Self> {
        match signal {
            Signal::Long => Some(TradeDirection::Long),
            Signal::Short => Some(TradeDirection::Short),
            Signal::Flat => None,
        }
    }

    /// The signal that points against this direction.
    pub fn opposing_signal(self) -> Signal {
        match self {
            TradeDirection::Long => Signal::Short,
            TradeDirection::Short => Signal::Long,
        }
    }

    pub fn entry_side(self) -> OrderSide {
        match self {
            TradeDirection::Long => OrderSide::Buy,
            TradeDirection::Short => OrderSide::Sell,
        }
    }

    pub fn exit_side(self) -> OrderSide {
        match self {
            TradeDirection::Long => OrderSide::Sell,
            TradeDirection::Short => OrderSide::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TradeDirection::Long => "LONG",
            TradeDirection::Short => "SHORT",
        }
    }
}

/// Why an open position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    SignalExit,
    EndOfData,
}

/// Reason column of a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeReason {
    #[serde(rename = "ENTER")]
    Enter,
    TakeProfit,
    StopLoss,
    SignalExit,
    EndOfData,
}

impl TradeReason {
    pub fn is_exit(self) -> bool {
        self != TradeReason::Enter
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TradeReason::Enter => "ENTER",
            TradeReason::TakeProfit => "TakeProfit",
            TradeReason::StopLoss => "StopLoss",
            TradeReason::SignalExit => "SignalExit",
            TradeReason::EndOfData => "EndOfData",
        }
    }
}

impl From<ExitReason> for TradeReason {
    fn from(reason: ExitReason) -> Self {
        match reason {
            ExitReason::TakeProfit => TradeReason::TakeProfit,
            ExitReason::StopLoss => TradeReason::StopLoss,
            ExitReason::SignalExit => TradeReason::SignalExit,
            ExitReason::EndOfData => TradeReason::EndOfData,
        }
    }
}

/// Where the fill price of a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillSource {
    /// The immediate next tick at or after the bar timestamp.
    Tick,
    /// No matching tick; the bar's close was used.
    BarClose,
}

impl FillSource {
    pub fn as_str(self) -> &'static str {
        match self {
            FillSource::Tick => "tick",
            FillSource::BarClose => "bar_close",
        }
    }
}

/// One ledger row. Entry and exit of a round trip are two adjacent rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: f64,
    pub position: TradeDirection,
    pub reason: TradeReason,

    // ── PnL ──
    pub gross_pnl: f64,
    pub fee: f64,
    pub net_pnl: f64,
    /// `quantity * price`
    pub turnover: f64,

    // ── Diagnostics ──
    pub volatility: Option<f64>,
    /// Close of the bar that produced this record.
    pub benchmark_price: f64,
    pub fill_source: FillSource,
}

impl TradeRecord {
    pub fn is_entry(&self) -> bool {
        self.reason == TradeReason::Enter
    }

    pub fn is_exit(&self) -> bool {
        self.reason.is_exit()
    }

    pub fn is_winner(&self) -> bool {
        self.is_exit() && self.net_pnl > 0.0
    }

    /// Signed notional opened by an entry row: positive for longs, negative
    /// for shorts, zero on exit rows.
    pub fn position_usd(&self) -> f64 {
        if !self.is_entry() {
            return 0.0;
        }
        match self.position {
            TradeDirection::Long => self.turnover,
            TradeDirection::Short => -self.turnover,
        }
    }
}
