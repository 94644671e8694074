//! TickCursor: forward-only nearest-tick lookup over a time-sorted arena.
//!
//! The cursor owns the tick sequence and a single index into it. Each lookup
//! first discards every tick strictly older than the query time; discarded
//! ticks are never revisited. It then inspects only the head tick: if that
//! tick matches the side filter its price is returned, otherwise `None`.
//! The head tick is not consumed, so a later query at the same time sees it
//! again.

use crate::domain::{SideFilter, Tick};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default)]
pub struct TickCursor {
    ticks: Vec<Tick>,
    index: usize,
}

impl TickCursor {
    /// Build a cursor over ticks already sorted ascending by timestamp.
    pub fn new(ticks: Vec<Tick>) -> Self {
        debug_assert!(
            ticks.windows(2).all(|w| w[0].timestamp <= w[1].timestamp),
            "ticks must be sorted by timestamp"
        );
        Self { ticks, index: 0 }
    }

    /// Build a cursor from ticks in any order. The sort is stable, so ticks
    /// sharing a timestamp keep their input order.
    pub fn from_unsorted(mut ticks: Vec<Tick>) -> Self {
        ticks.sort_by_key(|t| t.timestamp);
        Self { ticks, index: 0 }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Price of the head tick at or after `at` if it passes `filter`.
    pub fn price_at(&mut self, at: DateTime<Utc>, filter: SideFilter) -> Option<f64> {
        self.advance_to(at);
        let tick = self.ticks.get(self.index)?;
        filter.matches(tick).then_some(tick.price)
    }

    /// Discard every tick strictly older than `at` without a lookup.
    pub fn advance_to(&mut self, at: DateTime<Utc>) {
        while self.ticks.get(self.index).is_some_and(|t| t.timestamp < at) {
            self.index += 1;
        }
    }

    /// Index of the head tick. Never decreases.
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn remaining(&self) -> usize {
        self.ticks.len() - self.index
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}
