//! Exit policies: decide each bar whether the open position should close.
//!
//! Exactly one policy drives a simulator:
//! - [`BandExit`]: take-profit / stop-loss at multiples of the bar's
//!   volatility around the entry price. Uses the current bar's volatility,
//!   not the value at entry.
//! - [`ReversalExit`]: exit when the bar's signal points against the position.

use crate::domain::{Bar, ExitReason, OpenPosition, TradeDirection};
use crate::engine::state::ParamError;
use serde::{Deserialize, Serialize};

/// Trait for exit policies.
///
/// `price` is the resolved fill price of the bar (nearest tick or close).
pub trait ExitPolicy: Send + Sync {
    /// Human-readable name (e.g., "band", "reversal").
    fn name(&self) -> &str;

    /// Whether bars without a usable volatility value must be skipped.
    fn requires_volatility(&self) -> bool {
        false
    }

    fn evaluate(&self, position: &OpenPosition, bar: &Bar, price: f64) -> Option<ExitReason>;
}

impl<P: ExitPolicy + ?Sized> ExitPolicy for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn requires_volatility(&self) -> bool {
        (**self).requires_volatility()
    }

    fn evaluate(&self, position: &OpenPosition, bar: &Bar, price: f64) -> Option<ExitReason> {
        (**self).evaluate(position, bar, price)
    }
}

/// Volatility band exit.
///
/// Long: take profit at `entry + k_tp * vol`, stop at `entry - k_sl * vol`.
/// Short: take profit at `entry - k_tp * vol`, stop at `entry + k_sl * vol`.
/// Take profit is checked first.
#[derive(Debug, Clone, PartialEq)]
pub struct BandExit {
    pub take_profit_mult: f64,
    pub stop_loss_mult: f64,
}

impl BandExit {
    /// Both multiples must be finite and positive.
    pub fn new(take_profit_mult: f64, stop_loss_mult: f64) -> Result<Self, ParamError> {
        for (name, value) in [
            ("take_profit_mult", take_profit_mult),
            ("stop_loss_mult", stop_loss_mult),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ParamError::Multiplier { name, value });
            }
        }
        Ok(Self {
            take_profit_mult,
            stop_loss_mult,
        })
    }

    /// `(take_profit, stop_loss)` price levels for `position` at `volatility`.
    pub fn levels(&self, position: &OpenPosition, volatility: f64) -> (f64, f64) {
        let tp = self.take_profit_mult * volatility;
        let sl = self.stop_loss_mult * volatility;
        match position.direction {
            TradeDirection::Long => (position.entry_price + tp, position.entry_price - sl),
            TradeDirection::Short => (position.entry_price - tp, position.entry_price + sl),
        }
    }
}

impl Default for BandExit {
    fn default() -> Self {
        Self {
            take_profit_mult: 9.0,
            stop_loss_mult: 3.0,
        }
    }
}

impl ExitPolicy for BandExit {
    fn name(&self) -> &str {
        "band"
    }

    fn requires_volatility(&self) -> bool {
        true
    }

    fn evaluate(&self, position: &OpenPosition, bar: &Bar, price: f64) -> Option<ExitReason> {
        let volatility = bar.usable_volatility()?;
        let (take_profit, stop_loss) = self.levels(position, volatility);
        let (hit_tp, hit_sl) = match position.direction {
            TradeDirection::Long => (price >= take_profit, price <= stop_loss),
            TradeDirection::Short => (price <= take_profit, price >= stop_loss),
        };
        if hit_tp {
            Some(ExitReason::TakeProfit)
        } else if hit_sl {
            Some(ExitReason::StopLoss)
        } else {
            None
        }
    }
}

/// Signal reversal exit. No price thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReversalExit;

impl ExitPolicy for ReversalExit {
    fn name(&self) -> &str {
        "reversal"
    }

    fn evaluate(&self, position: &OpenPosition, bar: &Bar, _price: f64) -> Option<ExitReason> {
        (bar.signal == position.direction.opposing_signal()).then_some(ExitReason::SignalExit)
    }
}

/// Serializable choice of exit policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExitPolicyConfig {
    Band {
        take_profit_mult: f64,
        stop_loss_mult: f64,
    },
    Reversal,
}

impl Default for ExitPolicyConfig {
    fn default() -> Self {
        ExitPolicyConfig::Band {
            take_profit_mult: 9.0,
            stop_loss_mult: 3.0,
        }
    }
}

impl ExitPolicyConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ExitPolicyConfig::Band { .. } => "band",
            ExitPolicyConfig::Reversal => "reversal",
        }
    }

    pub fn requires_volatility(&self) -> bool {
        matches!(self, ExitPolicyConfig::Band { .. })
    }

    pub fn build(&self) -> Result<Box<dyn ExitPolicy>, ParamError> {
        let policy: Box<dyn ExitPolicy> = match *self {
            ExitPolicyConfig::Band {
                take_profit_mult,
                stop_loss_mult,
            } => Box::new(BandExit::new(take_profit_mult, stop_loss_mult)?),
            ExitPolicyConfig::Reversal => Box::new(ReversalExit),
        };
        Ok(policy)
    }
}
