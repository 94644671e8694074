//! Bar and tick loading for the runner.
//!
//! Reads the two CSV streams named in `DataConfig` and returns them fully
//! materialized and ordered, ready for replay. Implements the fallback policy:
//! 1. If the bar file exists → parse it (and the tick file, if configured)
//! 2. If it does not and `synthetic` is set → generate synthetic data (tagged)
//! 3. Otherwise → fail with a clear error
//!
//! Rows with non-numeric or missing required fields are rejected here and
//! counted; the simulator only ever sees clean, typed input. Ticks are
//! pre-filtered to the configured symbol, best-match trades and times at or
//! after the first bar, then stably sorted by time.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;
use tickfill_core::domain::{Bar, Signal, Tick};
use tickfill_core::fingerprint::DatasetHash;

use crate::config::DataConfig;
use crate::synthetic::{generate_synthetic_bars, generate_synthetic_ticks};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("bar file not found: {} (use --synthetic for synthetic data)", .0.display())]
    MissingBars(PathBuf),

    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column '{column}' not found in {stream} header")]
    MissingColumn { stream: &'static str, column: String },
}

/// Options controlling how data is loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Generate synthetic data when the bar file is missing.
    pub synthetic: bool,
}

/// Bars read from one stream plus the count of rows rejected on the way.
#[derive(Debug, Clone, Default)]
pub struct BarLoad {
    pub bars: Vec<Bar>,
    pub rejected_rows: usize,
}

/// Ticks that survived the pre-filter, with rejection and filter counts.
#[derive(Debug, Clone, Default)]
pub struct TickLoad {
    pub ticks: Vec<Tick>,
    pub rejected_rows: usize,
    pub filtered_out: usize,
}

/// Result of loading a dataset, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    pub ticks: Vec<Tick>,
    /// Dataset hash for fingerprinting (BLAKE3 over all bar and tick data).
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub rejected_bar_rows: usize,
    pub rejected_tick_rows: usize,
    pub filtered_ticks: usize,
}

/// Load bars and ticks as described by `config`, with synthetic fallback.
pub fn load_data(config: &DataConfig, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    if !config.bars.exists() {
        if !opts.synthetic {
            return Err(LoadError::MissingBars(config.bars.clone()));
        }
        tracing::warn!(
            symbol = %config.symbol,
            "generating synthetic data; results will be tagged as synthetic"
        );
        let start = Utc.timestamp_opt(1_672_531_200, 0).single().unwrap_or_default();
        let bars = generate_synthetic_bars(&config.symbol, start, 2_000);
        let ticks = generate_synthetic_ticks(&config.symbol, &bars, 12);
        return Ok(LoadedData {
            dataset_hash: DatasetHash::of(&bars, &ticks).0,
            bars,
            ticks,
            has_synthetic: true,
            rejected_bar_rows: 0,
            rejected_tick_rows: 0,
            filtered_ticks: 0,
        });
    }

    let bar_load = read_bars(open(&config.bars)?, config)?;
    if bar_load.rejected_rows > 0 {
        tracing::warn!(
            path = %config.bars.display(),
            rejected = bar_load.rejected_rows,
            "bar rows rejected"
        );
    }

    let tick_load = match &config.ticks {
        Some(path) => {
            let first_bar = bar_load.bars.first().map(|b| b.timestamp);
            let load = read_ticks(open(path)?, config, first_bar)?;
            if load.rejected_rows > 0 {
                tracing::warn!(path = %path.display(), rejected = load.rejected_rows, "tick rows rejected");
            }
            load
        }
        None => TickLoad::default(),
    };

    tracing::info!(
        bars = bar_load.bars.len(),
        ticks = tick_load.ticks.len(),
        filtered_ticks = tick_load.filtered_out,
        "dataset loaded"
    );

    Ok(LoadedData {
        dataset_hash: DatasetHash::of(&bar_load.bars, &tick_load.ticks).0,
        bars: bar_load.bars,
        ticks: tick_load.ticks,
        has_synthetic: false,
        rejected_bar_rows: bar_load.rejected_rows,
        rejected_tick_rows: tick_load.rejected_rows,
        filtered_ticks: tick_load.filtered_out,
    })
}

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a bar stream. Expected columns (names configurable): timestamp,
/// close, signal and optionally a volatility column. Other columns
/// (Open, High, Low, Volume, ...) are ignored.
pub fn read_bars<R: Read>(reader: R, config: &DataConfig) -> Result<BarLoad, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let ts_idx = column(&headers, &config.timestamp_column, "bar")?;
    let close_idx = column(&headers, &config.close_column, "bar")?;
    let signal_idx = column(&headers, &config.signal_column, "bar")?;
    let vol_idx = match &config.volatility_column {
        Some(name) => Some(column(&headers, name, "bar")?),
        None => None,
    };

    let mut out = BarLoad::default();
    for record in rdr.records() {
        let record = record?;
        let parsed = (|| {
            let timestamp = parse_timestamp(record.get(ts_idx)?)?;
            let close = parse_finite(record.get(close_idx)?)?;
            let signal = Signal::try_from(record.get(signal_idx)?.parse::<f64>().ok()?).ok()?;
            let volatility = match vol_idx {
                Some(i) => parse_volatility(record.get(i)?)?,
                None => None,
            };
            Some(Bar {
                timestamp,
                close,
                signal,
                volatility,
            })
        })();
        match parsed {
            Some(bar) => out.bars.push(bar),
            None => out.rejected_rows += 1,
        }
    }
    Ok(out)
}

/// Parse a tick stream with columns `time, price, isBuyerMaker, isBestMatch,
/// symbol` and apply the replay pre-filter.
pub fn read_ticks<R: Read>(
    reader: R,
    config: &DataConfig,
    first_bar: Option<DateTime<Utc>>,
) -> Result<TickLoad, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let time_idx = column(&headers, "time", "tick")?;
    let price_idx = column(&headers, "price", "tick")?;
    let maker_idx = column(&headers, "isBuyerMaker", "tick")?;
    let best_idx = column(&headers, "isBestMatch", "tick")?;
    let symbol_idx = column(&headers, "symbol", "tick")?;

    let mut out = TickLoad::default();
    for record in rdr.records() {
        let record = record?;
        let parsed = (|| {
            Some((
                Tick {
                    timestamp: parse_timestamp(record.get(time_idx)?)?,
                    price: parse_finite(record.get(price_idx)?)?,
                    is_buyer_maker: parse_bool(record.get(maker_idx)?)?,
                    symbol: record.get(symbol_idx)?.to_string(),
                },
                parse_bool(record.get(best_idx)?)?,
            ))
        })();
        let Some((tick, best_match)) = parsed else {
            out.rejected_rows += 1;
            continue;
        };
        let keep = (best_match || !config.best_match_only)
            && tick.symbol == config.symbol
            && first_bar.map_or(true, |t| tick.timestamp >= t);
        if keep {
            out.ticks.push(tick);
        } else {
            out.filtered_out += 1;
        }
    }
    out.ticks.sort_by_key(|t| t.timestamp);
    Ok(out)
}

fn column(headers: &csv::StringRecord, name: &str, stream: &'static str) -> Result<usize, LoadError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| LoadError::MissingColumn {
            stream,
            column: name.to_string(),
        })
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// An empty or NaN cell is warm-up (`Some(None)`); any other non-finite or
/// non-numeric value rejects the row.
fn parse_volatility(raw: &str) -> Option<Option<f64>> {
    if raw.is_empty() {
        return Some(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(Some(v)),
        Ok(v) if v.is_nan() => Some(None),
        _ => None,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" | "True" | "TRUE" | "1" => Some(true),
        "false" | "False" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

/// Epoch milliseconds, RFC 3339, or a naive ISO 8601 date/time taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ms) = raw.parse::<i64>() {
        return Utc.timestamp_millis_opt(ms).single();
    }
    if let Ok(ms) = raw.parse::<f64>() {
        if ms.is_finite() {
            return Utc.timestamp_millis_opt(ms as i64).single();
        }
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
