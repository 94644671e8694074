//! Tickfill CLI: replay and sweep commands.
//!
//! Commands:
//! - `run`: replay bars against ticks from a TOML config file or named preset
//! - `sweep`: grid over band take-profit/stop-loss multipliers

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tickfill_core::engine::ExitPolicyConfig;
use tickfill_runner::{
    format_summary, load_data, run_band_sweep, run_single_backtest, save_artifacts,
    BacktestConfig, BandGrid, ExportOptions, LoadOptions,
};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(
    name = "tickfill",
    about = "Tickfill CLI: tick-replay execution simulation"
)]
struct Cli {
    /// Log level: trace, debug, info, warn, error.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Where the config comes from. Shared by every command.
#[derive(clap::Args)]
struct Source {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Named preset: cta, cta_close, pair.
    #[arg(long)]
    preset: Option<String>,

    /// Bar CSV (required with --preset).
    #[arg(long)]
    bars: Option<PathBuf>,

    /// Tick CSV (optional with --preset).
    #[arg(long)]
    ticks: Option<PathBuf>,

    /// Instrument symbol ticks are filtered to (overrides the config).
    #[arg(long)]
    symbol: Option<String>,

    /// Use synthetic data when the bar file is missing.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay one configuration and save its artifacts.
    Run {
        #[command(flatten)]
        source: Source,

        /// Output directory (overrides the config).
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the summary only; write no artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Replay a grid of band multipliers in parallel.
    Sweep {
        #[command(flatten)]
        source: Source,

        /// Take-profit multipliers, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = vec![3.0, 6.0, 9.0, 12.0])]
        tp: Vec<f64>,

        /// Stop-loss multipliers, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = vec![1.0, 2.0, 3.0, 4.0])]
        sl: Vec<f64>,

        /// Rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Print the full result set as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            source,
            output_dir,
            no_save,
        } => run_cmd(source, output_dir, no_save),
        Commands::Sweep {
            source,
            tp,
            sl,
            top,
            json,
        } => sweep_cmd(source, BandGrid::new(tp, sl), top, json),
    }
}

fn build_config(source: &Source) -> Result<BacktestConfig> {
    if source.config.is_some() && source.preset.is_some() {
        bail!("--config and --preset are mutually exclusive");
    }
    let mut config = match (&source.config, &source.preset) {
        (Some(path), None) => BacktestConfig::from_file(path)?,
        (None, Some(name)) => {
            let Some(bars) = source.bars.clone() else {
                bail!("--bars is required with --preset");
            };
            BacktestConfig::preset(name, bars, source.ticks.clone())?
        }
        _ => bail!("one of --config or --preset is required"),
    };
    if let Some(symbol) = &source.symbol {
        config.data.symbol = symbol.clone();
    }
    Ok(config)
}

fn run_cmd(source: Source, output_dir: Option<PathBuf>, no_save: bool) -> Result<()> {
    let mut config = build_config(&source)?;
    if let Some(dir) = output_dir {
        config.output.dir = dir;
    }
    let opts = LoadOptions {
        synthetic: source.synthetic,
    };

    let result = run_single_backtest(&config, &opts)?;
    print!("{}", format_summary(&result));

    if !no_save {
        let export = ExportOptions {
            offset: config.display_offset(),
            diagnostics: config.output.diagnostics,
        };
        let run_dir = save_artifacts(&result, &config.output.dir, &export)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn sweep_cmd(source: Source, grid: BandGrid, top: usize, json: bool) -> Result<()> {
    let config = build_config(&source)?;
    if !matches!(config.exit, ExitPolicyConfig::Band { .. }) {
        tracing::warn!("config uses a non-band exit; sweeping band multipliers anyway");
    }
    let loaded = load_data(
        &config.data,
        &LoadOptions {
            synthetic: source.synthetic,
        },
    )?;

    let results = run_band_sweep(
        &config.simulator_config(),
        &grid,
        &loaded.bars,
        &loaded.ticks,
        &config.data.symbol,
        config.output.initial_capital,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!(
        "{:>6} {:>6} {:>7} {:>8} {:>14} {:>10}",
        "tp", "sl", "trips", "win %", "net pnl", "max dd %"
    );
    println!("{}", "-".repeat(56));
    for point in results.iter().take(top) {
        let s = &point.summary;
        println!(
            "{:>6.2} {:>6.2} {:>7} {:>8.1} {:>14.6} {:>10.4}",
            point.take_profit_mult,
            point.stop_loss_mult,
            s.round_trips,
            s.win_rate * 100.0,
            s.total_net_pnl,
            s.max_drawdown * 100.0,
        );
    }
    if loaded.has_synthetic {
        println!("WARNING: synthetic data");
    }
    Ok(())
}
