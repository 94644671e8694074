//! Tickfill Runner: data loading, replay orchestration, metrics and export.
//!
//! This crate builds on `tickfill-core` to provide:
//! - TOML configuration with named presets
//! - CSV loading of bar and tick streams, with synthetic fallback
//! - Single-run entry point with ledger summary and fingerprint
//! - CSV ledger and JSON manifest artifacts
//! - Parallel band-multiplier sweep

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;
pub mod synthetic;

pub use config::{BacktestConfig, ConfigError, DataConfig, ExecutionSection, OutputConfig};
pub use data_loader::{load_data, LoadError, LoadOptions, LoadedData};
pub use export::{
    export_json, export_ledger_csv, format_summary, import_json, load_artifacts, save_artifacts,
    ExportOptions,
};
pub use metrics::LedgerSummary;
pub use runner::{run_backtest_from_data, run_single_backtest, BacktestResult, RunError};
pub use sweep::{run_band_sweep, BandGrid, SweepPoint};
