//! Fill price resolution: nearest tick or the bar close.
//!
//! The side filter for the tick lookup comes from the bar's signal under
//! the configured [`TickSideConvention`]. A missing tick is not an error:
//! the bar's close is used instead. Under `CloseOnly` the cursor still
//! advances but every fill is the close.

use crate::domain::{Bar, FillSource, SideFilter, Signal};
use serde::{Deserialize, Serialize};

use super::super::tick_cursor::TickCursor;

/// Which tick side a bar's fill must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickSideConvention {
    /// `signal > 0` looks for buyer-maker ticks, anything else for
    /// seller-maker ticks.
    #[default]
    SignalParity,
    /// The immediate next tick is taken regardless of side.
    AnySide,
    /// Ticks are never used; every fill is the bar close.
    CloseOnly,
}

impl TickSideConvention {
    /// Side filter of the tick lookup, `None` when no lookup is made.
    pub fn filter_for(self, signal: Signal) -> Option<SideFilter> {
        match self {
            TickSideConvention::SignalParity => match signal {
                Signal::Long => Some(SideFilter::BuyerMaker),
                Signal::Flat | Signal::Short => Some(SideFilter::SellerMaker),
            },
            TickSideConvention::AnySide => Some(SideFilter::Any),
            TickSideConvention::CloseOnly => None,
        }
    }
}

/// The price a bar's order is assumed to execute at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedFill {
    pub price: f64,
    pub source: FillSource,
}

/// Resolve the fill price of `bar`, advancing the cursor to its timestamp.
pub fn resolve_fill(
    cursor: &mut TickCursor,
    bar: &Bar,
    convention: TickSideConvention,
) -> ResolvedFill {
    let price = match convention.filter_for(bar.signal) {
        Some(filter) => cursor.price_at(bar.timestamp, filter),
        None => {
            cursor.advance_to(bar.timestamp);
            None
        }
    };
    match price {
        Some(price) => ResolvedFill {
            price,
            source: FillSource::Tick,
        },
        None => ResolvedFill {
            price: bar.close,
            source: FillSource::BarClose,
        },
    }
}
