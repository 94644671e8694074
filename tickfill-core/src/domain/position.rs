//! PositionState: the single open position of a replay, if any.
//!
//! Transitions are Flat → Long/Short → Flat only. Reversing a position means
//! closing it and opening a new one on a later step.

use super::trade::TradeDirection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Flat,
    Long,
    Short,
}

impl From<TradeDirection> for PositionSide {
    fn from(direction: TradeDirection) -> Self {
        match direction {
            TradeDirection::Long => PositionSide::Long,
            TradeDirection::Short => PositionSide::Short,
        }
    }
}

/// Errors from position transitions. Any of these is fatal to a run.
#[derive(Debug, Error, PartialEq)]
pub enum PositionError {
    #[error("invalid state transition: cannot open {requested:?} while {current:?}")]
    AlreadyOpen {
        current: PositionSide,
        requested: TradeDirection,
    },

    #[error("invalid state transition: cannot close while flat")]
    NotOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub direction: TradeDirection,
    pub size: f64,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
}

impl OpenPosition {
    /// Gross PnL of closing at `exit_price`, before fees.
    pub fn gross_pnl(&self, exit_price: f64) -> f64 {
        match self.direction {
            TradeDirection::Long => (exit_price - self.entry_price) * self.size,
            TradeDirection::Short => (self.entry_price - exit_price) * self.size,
        }
    }
}

/// A position that has just been closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedPosition {
    pub position: OpenPosition,
    pub exit_price: f64,
    pub exit_time: DateTime<Utc>,
    pub gross_pnl: f64,
}

/// Holds at most one open position. Carries no fee logic.
#[derive(Debug, Clone, Default)]
pub struct PositionState {
    open: Option<OpenPosition>,
}

impl PositionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn side(&self) -> PositionSide {
        self.open
            .map(|p| PositionSide::from(p.direction))
            .unwrap_or(PositionSide::Flat)
    }

    pub fn is_flat(&self) -> bool {
        self.open.is_none()
    }

    pub fn current(&self) -> Option<&OpenPosition> {
        self.open.as_ref()
    }

    pub fn open(
        &mut self,
        direction: TradeDirection,
        size: f64,
        price: f64,
        time: DateTime<Utc>,
    ) -> Result<&OpenPosition, PositionError> {
        if self.open.is_some() {
            return Err(PositionError::AlreadyOpen {
                current: self.side(),
                requested: direction,
            });
        }
        Ok(&*self.open.insert(OpenPosition {
            direction,
            size,
            entry_price: price,
            entry_time: time,
        }))
    }

    pub fn close(&mut self, price: f64, time: DateTime<Utc>) -> Result<ClosedPosition, PositionError> {
        let position = self.open.take().ok_or(PositionError::NotOpen)?;
        Ok(ClosedPosition {
            gross_pnl: position.gross_pnl(price),
            position,
            exit_price: price,
            exit_time: time,
        })
    }
}
