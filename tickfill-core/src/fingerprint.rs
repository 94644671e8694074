//! Run fingerprinting: deterministic identity for a replay.
//!
//! - `ConfigHash`: BLAKE3 of the canonical JSON of a `SimulatorConfig`.
//! - `DatasetHash`: BLAKE3 over every bar and tick field, in replay order.
//! - `RunFingerprint`: both hashes plus the ledger digest, written next to
//!   exported artifacts so two runs can be compared without re-reading them.

use crate::domain::{Bar, Tick};
use crate::engine::SimulatorConfig;
use crate::ledger::TradeLedger;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hash of a simulator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn of(config: &SimulatorConfig) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_vec(config)?;
        Ok(Self(blake3::hash(&json).to_hex().to_string()))
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash of the bar and tick streams fed to a replay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn of(bars: &[Bar], ticks: &[Tick]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(bars.len() as u64).to_le_bytes());
        for bar in bars {
            hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
            hasher.update(&bar.close.to_bits().to_le_bytes());
            hasher.update(&[bar.signal.as_i8() as u8]);
            match bar.volatility {
                Some(v) => {
                    hasher.update(&[1]);
                    hasher.update(&v.to_bits().to_le_bytes());
                }
                None => {
                    hasher.update(&[0]);
                }
            }
        }
        hasher.update(&(ticks.len() as u64).to_le_bytes());
        for tick in ticks {
            hasher.update(&tick.timestamp.timestamp_millis().to_le_bytes());
            hasher.update(&tick.price.to_bits().to_le_bytes());
            hasher.update(&[tick.is_buyer_maker as u8]);
            hasher.update(tick.symbol.as_bytes());
            hasher.update(&[0xff]);
        }
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Complete fingerprint of a single replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub config_hash: ConfigHash,
    pub dataset_hash: DatasetHash,
    pub ledger_digest: String,
    pub bar_count: usize,
    pub tick_count: usize,
    pub record_count: usize,
}

impl RunFingerprint {
    pub fn new(
        config: &SimulatorConfig,
        bars: &[Bar],
        ticks: &[Tick],
        ledger: &TradeLedger,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            config_hash: ConfigHash::of(config)?,
            dataset_hash: DatasetHash::of(bars, ticks),
            ledger_digest: ledger.digest(),
            bar_count: bars.len(),
            tick_count: ticks.len(),
            record_count: ledger.len(),
        })
    }

    /// Two runs reproduce each other when inputs and output all match.
    pub fn reproduces(&self, other: &RunFingerprint) -> bool {
        self.config_hash == other.config_hash
            && self.dataset_hash == other.dataset_hash
            && self.ledger_digest == other.ledger_digest
    }
}
