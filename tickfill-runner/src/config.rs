//! Serializable backtest configuration, loaded from TOML.
//!
//! ```toml
//! [data]
//! bars = "data/btc_1h.csv"
//! ticks = "data/btc_trades.csv"
//! symbol = "SPOT_BTC_USDT"
//! volatility_column = "atr"
//!
//! [execution]
//! fee_rate = 0.0004
//! position_size = 0.0001
//! fee_rule = "per_leg"
//! force_close_at_end = true
//! tick_side = "signal_parity"
//!
//! [exit]
//! type = "band"
//! take_profit_mult = 9.0
//! stop_loss_mult = 3.0
//!
//! [output]
//! dir = "results"
//! display_offset_hours = 8
//! ```

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tickfill_core::engine::{
    ExitPolicyConfig, FeeRule, ParamError, SimulatorConfig, TickSideConvention,
};

/// Errors from loading or validating a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid execution parameters: {0}")]
    Params(#[from] ParamError),
    #[error("display_offset_hours must be within ±23, got {0}")]
    DisplayOffset(i32),
    #[error("initial_capital must be positive, got {0}")]
    InitialCapital(f64),
    #[error("unknown preset '{0}'. Valid: cta, cta_close, pair")]
    UnknownPreset(String),
}

/// Where the bar and tick streams come from and how their columns are named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub bars: PathBuf,
    #[serde(default)]
    pub ticks: Option<PathBuf>,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Drop ticks whose `isBestMatch` flag is false.
    #[serde(default = "default_true")]
    pub best_match_only: bool,
    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,
    #[serde(default = "default_close_column")]
    pub close_column: String,
    #[serde(default = "default_signal_column")]
    pub signal_column: String,
    /// Absent under a band exit means `atr`; absent under a reversal exit
    /// means no volatility column is read.
    #[serde(default)]
    pub volatility_column: Option<String>,
}

/// Fee, sizing and fill settings. Mirrors `SimulatorConfig` minus the exit policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSection {
    #[serde(default)]
    pub fee_rate: f64,
    #[serde(default = "default_position_size")]
    pub position_size: f64,
    #[serde(default)]
    pub fee_rule: FeeRule,
    #[serde(default)]
    pub force_close_at_end: bool,
    #[serde(default)]
    pub tick_side: TickSideConvention,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            fee_rate: 0.0,
            position_size: default_position_size(),
            fee_rule: FeeRule::default(),
            force_close_at_end: false,
            tick_side: TickSideConvention::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Ledger timestamps are rendered at this fixed offset from UTC.
    #[serde(default)]
    pub display_offset_hours: i32,
    /// Append volatility and long/short breakdown columns to ledger.csv.
    #[serde(default)]
    pub diagnostics: bool,
    /// Base equity for return and drawdown in the summary.
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            display_offset_hours: 0,
            diagnostics: false,
            initial_capital: default_initial_capital(),
        }
    }
}

/// Complete configuration for one replay run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub execution: ExecutionSection,
    #[serde(default)]
    pub exit: ExitPolicyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl BacktestConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        if config.data.volatility_column.is_none()
            && matches!(config.exit, ExitPolicyConfig::Band { .. })
        {
            config.data.volatility_column = default_volatility_column();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Named presets for the executor families.
    ///
    /// - `cta`: band exit 9/3 on ATR, exit-leg fee, side-matched ticks
    /// - `cta_close`: band exit 9/3 on ATR, round-trip fee at exit, bar closes
    /// - `pair`: reversal exit, 0.02% exit-leg fee, bar closes
    ///
    /// All render timestamps at UTC+8 and size at 0.0001 units.
    pub fn preset(name: &str, bars: PathBuf, ticks: Option<PathBuf>) -> Result<Self, ConfigError> {
        let simulator = match name {
            "cta" => SimulatorConfig::cta_band(),
            "cta_close" => SimulatorConfig::cta_band_close(),
            "pair" => SimulatorConfig::pair_reversal(),
            _ => return Err(ConfigError::UnknownPreset(name.to_string())),
        };
        let volatility_column = match simulator.exit_policy {
            ExitPolicyConfig::Band { .. } => default_volatility_column(),
            ExitPolicyConfig::Reversal => None,
        };
        let config = Self {
            data: DataConfig {
                bars,
                ticks,
                volatility_column,
                ..DataConfig::default()
            },
            execution: ExecutionSection::from_simulator(&simulator),
            exit: simulator.exit_policy,
            output: OutputConfig {
                display_offset_hours: 8,
                ..OutputConfig::default()
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulator_config().validate()?;
        if self.output.display_offset_hours.abs() > 23 {
            return Err(ConfigError::DisplayOffset(self.output.display_offset_hours));
        }
        if !(self.output.initial_capital.is_finite() && self.output.initial_capital > 0.0) {
            return Err(ConfigError::InitialCapital(self.output.initial_capital));
        }
        Ok(())
    }

    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            fee_rate: self.execution.fee_rate,
            position_size: self.execution.position_size,
            fee_rule: self.execution.fee_rule,
            exit_policy: self.exit.clone(),
            force_close_at_end: self.execution.force_close_at_end,
            tick_side: self.execution.tick_side,
        }
    }

    /// Display offset for ledger timestamps. Falls back to UTC if the hours
    /// are out of range, which `validate` rejects up front.
    pub fn display_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.output.display_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl ExecutionSection {
    pub fn from_simulator(config: &SimulatorConfig) -> Self {
        Self {
            fee_rate: config.fee_rate,
            position_size: config.position_size,
            fee_rule: config.fee_rule,
            force_close_at_end: config.force_close_at_end,
            tick_side: config.tick_side,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            bars: PathBuf::from("bars.csv"),
            ticks: None,
            symbol: default_symbol(),
            best_match_only: true,
            timestamp_column: default_timestamp_column(),
            close_column: default_close_column(),
            signal_column: default_signal_column(),
            volatility_column: default_volatility_column(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_symbol() -> String {
    "SPOT_BTC_USDT".into()
}

fn default_timestamp_column() -> String {
    "timestamp".into()
}

fn default_close_column() -> String {
    "Close".into()
}

fn default_signal_column() -> String {
    "signal".into()
}

fn default_volatility_column() -> Option<String> {
    Some("atr".into())
}

fn default_position_size() -> f64 {
    1.0
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_initial_capital() -> f64 {
    10_000.0
}
