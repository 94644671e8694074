//! Simulator configuration and validation.

use crate::engine::execution::{CostModel, FeeRule, TickSideConvention};
use crate::engine::exit_policy::{BandExit, ExitPolicyConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid simulator parameters.
#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("fee_rate must be a finite value >= 0, got {0}")]
    FeeRate(f64),

    #[error("position_size must be a finite value > 0, got {0}")]
    PositionSize(f64),

    #[error("{name} must be a finite value > 0, got {value}")]
    Multiplier { name: &'static str, value: f64 },
}

/// Configuration for a single replay. Every knob is explicit; nothing is
/// read from globals or the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Fee as a fraction of notional.
    pub fee_rate: f64,
    /// Quantity of every order.
    pub position_size: f64,
    #[serde(default)]
    pub fee_rule: FeeRule,
    #[serde(default)]
    pub exit_policy: ExitPolicyConfig,
    /// Close a still-open position at the final bar's close.
    #[serde(default)]
    pub force_close_at_end: bool,
    #[serde(default)]
    pub tick_side: TickSideConvention,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            fee_rate: 0.0,
            position_size: 1.0,
            fee_rule: FeeRule::PerLeg,
            exit_policy: ExitPolicyConfig::default(),
            force_close_at_end: false,
            tick_side: TickSideConvention::SignalParity,
        }
    }
}

impl SimulatorConfig {
    pub fn new(position_size: f64, fee_rate: f64, exit_policy: ExitPolicyConfig) -> Self {
        Self {
            fee_rate,
            position_size,
            exit_policy,
            ..Self::default()
        }
    }

    /// Trend/ATR executor: 9x/3x volatility band, side-matched ticks,
    /// fee on the exit leg, open positions left open at end of data.
    pub fn cta_band() -> Self {
        Self {
            fee_rate: 0.0,
            position_size: 0.0001,
            fee_rule: FeeRule::ExitLegOnly,
            exit_policy: ExitPolicyConfig::Band {
                take_profit_mult: 9.0,
                stop_loss_mult: 3.0,
            },
            force_close_at_end: false,
            tick_side: TickSideConvention::SignalParity,
        }
    }

    /// Close-price trend/ATR executor: 9x/3x volatility band filled at bar
    /// closes, both legs charged on the exit record.
    pub fn cta_band_close() -> Self {
        Self {
            fee_rule: FeeRule::RoundTripAtExit,
            tick_side: TickSideConvention::CloseOnly,
            ..Self::cta_band()
        }
    }

    /// Pair-trading executor: signal reversal exits filled at bar closes.
    pub fn pair_reversal() -> Self {
        Self {
            fee_rate: 0.0002,
            position_size: 0.0001,
            fee_rule: FeeRule::ExitLegOnly,
            exit_policy: ExitPolicyConfig::Reversal,
            force_close_at_end: false,
            tick_side: TickSideConvention::CloseOnly,
        }
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        if !self.fee_rate.is_finite() || self.fee_rate < 0.0 {
            return Err(ParamError::FeeRate(self.fee_rate));
        }
        if !self.position_size.is_finite() || self.position_size <= 0.0 {
            return Err(ParamError::PositionSize(self.position_size));
        }
        if let ExitPolicyConfig::Band {
            take_profit_mult,
            stop_loss_mult,
        } = self.exit_policy
        {
            BandExit::new(take_profit_mult, stop_loss_mult)?;
        }
        Ok(())
    }

    pub fn cost_model(&self) -> CostModel {
        CostModel::new(self.fee_rate, self.fee_rule)
    }
}
