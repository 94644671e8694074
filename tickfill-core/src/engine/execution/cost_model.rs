//! Cost model: fee calculation for entry and exit legs.
//!
//! Fees are a flat rate on notional. Which legs are charged, and on which
//! record, is decided by the [`FeeRule`]. Every record still satisfies
//! `net_pnl == gross_pnl - fee`.

use serde::{Deserialize, Serialize};

/// How fees are distributed over the two legs of a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeRule {
    /// Each leg is charged on its own record: `price * size * rate`.
    #[default]
    PerLeg,
    /// Entry is free; exit charges `exit * size * rate`.
    ExitLegOnly,
    /// Entry is free; exit charges both legs: `(entry + exit) * size * rate`.
    RoundTripAtExit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    /// Fee as a fraction of notional (e.g. 0.0004 for 4 bps).
    pub fee_rate: f64,
    pub rule: FeeRule,
}

impl CostModel {
    pub fn new(fee_rate: f64, rule: FeeRule) -> Self {
        Self { fee_rate, rule }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, FeeRule::PerLeg)
    }

    /// `price * quantity * fee_rate`
    pub fn leg_fee(&self, price: f64, quantity: f64) -> f64 {
        price * quantity * self.fee_rate
    }

    /// Fee booked on the entry record.
    pub fn entry_fee(&self, entry_price: f64, quantity: f64) -> f64 {
        match self.rule {
            FeeRule::PerLeg => self.leg_fee(entry_price, quantity),
            FeeRule::ExitLegOnly | FeeRule::RoundTripAtExit => 0.0,
        }
    }

    /// Fee booked on the exit record.
    pub fn exit_fee(&self, entry_price: f64, exit_price: f64, quantity: f64) -> f64 {
        match self.rule {
            FeeRule::PerLeg | FeeRule::ExitLegOnly => self.leg_fee(exit_price, quantity),
            FeeRule::RoundTripAtExit => (entry_price + exit_price) * quantity * self.fee_rate,
        }
    }
}
