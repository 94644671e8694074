//! Tick: one raw executed trade report used to approximate fill prices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    /// True when the buyer was the resting (maker) side of the trade.
    pub is_buyer_maker: bool,
    pub symbol: String,
}

/// Which side of the book a tick must have hit to count as a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideFilter {
    /// Ticks where the buyer was the maker (`is_buyer_maker == true`).
    BuyerMaker,
    /// Ticks where the seller was the maker (`is_buyer_maker == false`).
    SellerMaker,
    /// Any tick.
    Any,
}

impl SideFilter {
    pub fn matches(self, tick: &Tick) -> bool {
        match self {
            SideFilter::BuyerMaker => tick.is_buyer_maker,
            SideFilter::SellerMaker => !tick.is_buyer_maker,
            SideFilter::Any => true,
        }
    }
}
