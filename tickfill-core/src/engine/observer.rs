//! Trade observers: notified once for every record appended to the ledger.
//!
//! Observers are injected into the simulator; nothing needs global setup.

use crate::domain::TradeRecord;

pub trait TradeObserver {
    fn on_trade(&mut self, record: &TradeRecord);
}

impl<O: TradeObserver + ?Sized> TradeObserver for &mut O {
    fn on_trade(&mut self, record: &TradeRecord) {
        (**self).on_trade(record);
    }
}

/// Ignores every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl TradeObserver for NoopObserver {
    fn on_trade(&mut self, _record: &TradeRecord) {}
}

/// Emits one `tracing` debug event per record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TradeObserver for TracingObserver {
    fn on_trade(&mut self, record: &TradeRecord) {
        tracing::debug!(
            timestamp = %record.timestamp,
            side = record.side.as_str(),
            position = record.position.as_str(),
            reason = record.reason.as_str(),
            price = record.price,
            quantity = record.quantity,
            net_pnl = record.net_pnl,
            fill_source = record.fill_source.as_str(),
            "trade recorded"
        );
    }
}

/// Adapts a closure into an observer.
pub struct FnObserver<F>(pub F);

impl<F: FnMut(&TradeRecord)> TradeObserver for FnObserver<F> {
    fn on_trade(&mut self, record: &TradeRecord) {
        (self.0)(record);
    }
}
