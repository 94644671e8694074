//! Bar: one fixed-interval price summary with the strategy's signal attached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-bar directional intent produced by an external strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Signal {
    Short,
    Flat,
    Long,
}

/// Errors converting raw values into a [`Signal`].
#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("signal must be -1, 0 or 1, got {0}")]
    OutOfRange(i64),

    #[error("signal is not an integer: {0}")]
    NotIntegral(f64),
}

impl Signal {
    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Short => -1,
            Signal::Flat => 0,
            Signal::Long => 1,
        }
    }

    pub fn is_flat(self) -> bool {
        self == Signal::Flat
    }
}

impl TryFrom<i64> for Signal {
    type Error = SignalError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Signal::Short),
            0 => Ok(Signal::Flat),
            1 => Ok(Signal::Long),
            other => Err(SignalError::OutOfRange(other)),
        }
    }
}

/// Signal columns written by dataframe tools often come out as `1.0` / `-1.0`.
impl TryFrom<f64> for Signal {
    type Error = SignalError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(SignalError::NotIntegral(value));
        }
        Signal::try_from(value as i64)
    }
}

impl From<Signal> for i64 {
    fn from(signal: Signal) -> Self {
        signal.as_i8() as i64
    }
}

/// One bar of the replay stream.
///
/// Only the fields the simulator reads are kept: OHLV columns of the input
/// file are consumed upstream by the indicator and signal stages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub signal: Signal,
    /// Volatility measure for band exits (e.g. ATR). `None` during warm-up.
    pub volatility: Option<f64>,
}

impl Bar {
    pub fn new(timestamp: DateTime<Utc>, close: f64, signal: Signal) -> Self {
        Self {
            timestamp,
            close,
            signal,
            volatility: None,
        }
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = Some(volatility);
        self
    }

    /// Volatility if present, finite and strictly positive.
    ///
    /// A NaN carried in from an indicator warm-up window counts as absent,
    /// and so does zero.
    pub fn usable_volatility(&self) -> Option<f64> {
        self.volatility.filter(|v| v.is_finite() && *v > 0.0)
    }
}
