//! Reporting and export: JSON manifest and CSV ledger artifacts.
//!
//! - **JSON**: full round-trip serialization of a `BacktestResult` with schema versioning
//! - **CSV**: the trade ledger with its fixed column set, optionally followed by
//!   the diagnostic columns
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use tickfill_core::ledger::{DiagnosticRow, LedgerRow, TradeLedger};

use crate::runner::{BacktestResult, SCHEMA_VERSION};

/// How the ledger is rendered on export.
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    /// Timestamps are written at this offset from UTC.
    pub offset: FixedOffset,
    /// Append the diagnostic columns after the fixed set.
    pub diagnostics: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            offset: Utc.fix(),
            diagnostics: false,
        }
    }
}

impl ExportOptions {
    /// Directory-name tag for these options, e.g. `utc`, `utc+8`,
    /// `utc-0530_diag`.
    pub fn tag(&self) -> String {
        let seconds = self.offset.local_minus_utc();
        let sign = if seconds < 0 { '-' } else { '+' };
        let (hours, minutes) = (seconds.abs() / 3600, seconds.abs() % 3600 / 60);
        let mut tag = match (hours, minutes) {
            (0, 0) => "utc".to_string(),
            (h, 0) => format!("utc{sign}{h}"),
            (h, m) => format!("utc{sign}{h:02}{m:02}"),
        };
        if self.diagnostics {
            tag.push_str("_diag");
        }
        tag
    }
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the ledger as CSV.
///
/// Columns: timestamp, side, quantity, price, position, reason,
/// profit_or_loss, gross_pnl, fee, turnover; with diagnostics also
/// volatility, benchmark_price, fill_source and the long/short breakdown.
pub fn export_ledger_csv(ledger: &TradeLedger, opts: &ExportOptions) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header: Vec<&str> = LedgerRow::HEADER.to_vec();
    if opts.diagnostics {
        header.extend(DiagnosticRow::HEADER);
    }
    wtr.write_record(&header)?;

    for record in ledger {
        let mut fields = LedgerRow::from_record(record, opts.offset).to_fields();
        if opts.diagnostics {
            fields.extend(DiagnosticRow::from_record(record).to_fields());
        }
        wtr.write_record(&fields)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for a single replay.
///
/// Creates a directory named `{symbol}_{config}_{dataset}_{tag}/` under
/// `output_dir` (short hash prefixes plus [`ExportOptions::tag`], so reruns
/// of identical inputs and export options land in the same place)
/// containing:
/// - `manifest.json`: the full `BacktestResult`
/// - `ledger.csv`: the trade ledger
///
/// Returns the path to the created directory.
pub fn save_artifacts(
    result: &BacktestResult,
    output_dir: &Path,
    opts: &ExportOptions,
) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}_{}_{}",
        result.symbol,
        short_hash(&result.fingerprint.config_hash.0),
        short_hash(&result.fingerprint.dataset_hash.0),
        opts.tag(),
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(result)?;
    std::fs::write(run_dir.join("manifest.json"), json)?;

    let csv = export_ledger_csv(&result.ledger, opts)?;
    std::fs::write(run_dir.join("ledger.csv"), csv)?;

    tracing::info!(dir = %run_dir.display(), "artifacts saved");
    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

// ─── Text summary ───────────────────────────────────────────────────

/// Human-readable multi-line summary of a replay.
pub fn format_summary(result: &BacktestResult) -> String {
    let s = &result.summary;
    let mut out = String::new();
    out.push_str(&format!(
        "{} | {} | fee {} ({:?}) | size {}\n",
        result.symbol,
        result.config.exit_policy.name(),
        result.config.fee_rate,
        result.config.fee_rule,
        result.config.position_size,
    ));
    if result.has_synthetic {
        out.push_str("WARNING: synthetic data\n");
    }
    out.push_str(&format!(
        "bars {}  ticks {}  records {}\n",
        result.bar_count,
        result.tick_count,
        result.ledger.len()
    ));
    out.push_str(&format!(
        "round trips {}  wins {}  losses {}  win rate {:.1}%\n",
        s.round_trips,
        s.wins,
        s.losses,
        s.win_rate * 100.0
    ));
    for (reason, count) in &s.exits_by_reason {
        out.push_str(&format!("  {reason:<12} {count}\n"));
    }
    out.push_str(&format!(
        "gross {:.6}  fees {:.6}  net {:.6}  turnover {:.2}\n",
        s.total_gross_pnl, s.total_fees, s.total_net_pnl, s.total_turnover
    ));
    out.push_str(&format!(
        "return {:.4}%  max drawdown {:.4}%\n",
        s.total_return * 100.0,
        s.max_drawdown * 100.0
    ));
    if s.has_open_position {
        out.push_str("position still open at end of data\n");
    }
    for warning in &result.data_quality_warnings {
        out.push_str(&format!("note: {warning}\n"));
    }
    out
}
