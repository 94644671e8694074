//! TradeLedger: the append-only output of one replay.
//!
//! Entry and exit records of a round trip are adjacent; there is no linkage
//! field beyond emission order. The ledger exports as a tabular record set
//! with a fixed column order ([`LedgerRow::HEADER`]), optionally followed by
//! diagnostic columns ([`DiagnosticRow::HEADER`]).

use crate::domain::{TradeDirection, TradeRecord};
use chrono::{DateTime, FixedOffset, Offset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeLedger {
    records: Vec<TradeRecord>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: TradeRecord) -> &TradeRecord {
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TradeRecord> {
        self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TradeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn entry_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_entry()).count()
    }

    pub fn exit_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_exit()).count()
    }

    /// True when the last entry has no matching exit.
    pub fn has_open_position(&self) -> bool {
        self.records.last().is_some_and(|r| r.is_entry())
    }

    /// Closed round trips, paired by adjacency.
    pub fn round_trips(&self) -> Vec<RoundTrip<'_>> {
        self.records
            .windows(2)
            .filter(|w| w[0].is_entry() && w[1].is_exit())
            .map(|w| RoundTrip {
                entry: &w[0],
                exit: &w[1],
            })
            .collect()
    }

    /// Fixed-column rows with timestamps rendered in `offset`.
    pub fn rows(&self, offset: FixedOffset) -> Vec<LedgerRow> {
        self.records
            .iter()
            .map(|r| LedgerRow::from_record(r, offset))
            .collect()
    }

    /// BLAKE3 digest over every exported field (UTC timestamps, diagnostics
    /// included). Identical ledgers give identical digests.
    pub fn digest(&self) -> String {
        let utc = Utc.fix();
        let mut hasher = blake3::Hasher::new();
        for record in &self.records {
            let fields = LedgerRow::from_record(record, utc)
                .to_fields()
                .into_iter()
                .chain(DiagnosticRow::from_record(record).to_fields());
            for field in fields {
                hasher.update(field.as_bytes());
                hasher.update(b",");
            }
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl<'a> IntoIterator for &'a TradeLedger {
    type Item = &'a TradeRecord;
    type IntoIter = std::slice::Iter<'a, TradeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// An entry record and the exit record that follows it.
#[derive(Debug, Clone, Copy)]
pub struct RoundTrip<'a> {
    pub entry: &'a TradeRecord,
    pub exit: &'a TradeRecord,
}

impl RoundTrip<'_> {
    /// Net PnL of both legs (entry fee included under per-leg fees).
    pub fn net_pnl(&self) -> f64 {
        self.entry.net_pnl + self.exit.net_pnl
    }

    pub fn fees(&self) -> f64 {
        self.entry.fee + self.exit.fee
    }

    pub fn is_winner(&self) -> bool {
        self.net_pnl() > 0.0
    }

    pub fn holding_time(&self) -> chrono::Duration {
        self.exit.timestamp - self.entry.timestamp
    }
}

/// Render `timestamp` as RFC 3339 with millisecond precision in `offset`.
pub fn format_timestamp(timestamp: DateTime<Utc>, offset: FixedOffset) -> String {
    timestamp
        .with_timezone(&offset)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// One exported ledger row with the fixed column set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRow {
    pub timestamp: String,
    pub side: &'static str,
    pub quantity: f64,
    pub price: f64,
    pub position: &'static str,
    pub reason: &'static str,
    pub profit_or_loss: f64,
    pub gross_pnl: f64,
    pub fee: f64,
    pub turnover: f64,
}

impl LedgerRow {
    pub const HEADER: [&'static str; 10] = [
        "timestamp",
        "side",
        "quantity",
        "price",
        "position",
        "reason",
        "profit_or_loss",
        "gross_pnl",
        "fee",
        "turnover",
    ];

    pub fn from_record(record: &TradeRecord, offset: FixedOffset) -> Self {
        Self {
            timestamp: format_timestamp(record.timestamp, offset),
            side: record.side.as_str(),
            quantity: record.quantity,
            price: record.price,
            position: record.position.as_str(),
            reason: record.reason.as_str(),
            profit_or_loss: record.net_pnl,
            gross_pnl: record.gross_pnl,
            fee: record.fee,
            turnover: record.turnover,
        }
    }

    /// Field values in [`Self::HEADER`] order.
    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.side.to_string(),
            self.quantity.to_string(),
            self.price.to_string(),
            self.position.to_string(),
            self.reason.to_string(),
            self.profit_or_loss.to_string(),
            self.gross_pnl.to_string(),
            self.fee.to_string(),
            self.turnover.to_string(),
        ]
    }
}

/// Optional debugging columns carried alongside a ledger row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticRow {
    pub volatility: Option<f64>,
    pub benchmark_price: f64,
    pub fill_source: &'static str,
    pub long_gross_pnl: f64,
    pub long_position_usd: f64,
    pub long_turnover: f64,
    pub short_gross_pnl: f64,
    pub short_position_usd: f64,
    pub short_turnover: f64,
}

impl DiagnosticRow {
    pub const HEADER: [&'static str; 9] = [
        "volatility",
        "benchmark_price",
        "fill_source",
        "long_gross_pnl",
        "long_position_usd",
        "long_turnover",
        "short_gross_pnl",
        "short_position_usd",
        "short_turnover",
    ];

    pub fn from_record(record: &TradeRecord) -> Self {
        let (long, short) = match record.position {
            TradeDirection::Long => (
                (record.gross_pnl, record.position_usd(), record.turnover),
                (0.0, 0.0, 0.0),
            ),
            TradeDirection::Short => (
                (0.0, 0.0, 0.0),
                (record.gross_pnl, record.position_usd(), record.turnover),
            ),
        };
        Self {
            volatility: record.volatility,
            benchmark_price: record.benchmark_price,
            fill_source: record.fill_source.as_str(),
            long_gross_pnl: long.0,
            long_position_usd: long.1,
            long_turnover: long.2,
            short_gross_pnl: short.0,
            short_position_usd: short.1,
            short_turnover: short.2,
        }
    }

    /// Field values in [`Self::HEADER`] order. Missing volatility is empty.
    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.volatility.map(|v| v.to_string()).unwrap_or_default(),
            self.benchmark_price.to_string(),
            self.fill_source.to_string(),
            self.long_gross_pnl.to_string(),
            self.long_position_usd.to_string(),
            self.long_turnover.to_string(),
            self.short_gross_pnl.to_string(),
            self.short_position_usd.to_string(),
            self.short_turnover.to_string(),
        ]
    }
}
