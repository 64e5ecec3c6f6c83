use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use level_breakout::bars_csv::{find_bar_files, load_bars, symbol_from_path};
use level_breakout::signal_core::{build_levels, detect_pivots, levels_near_price, recent_level_breaks, HoldStatus};
use level_breakout::{analyze_batch, evaluate_levels, AnalysisConfig, BarSeries, Classification, CrossingMode, SignalQuery};

#[derive(Parser, Debug)]
#[command(name = "breakout-scan")]
#[command(about = "Support/resistance breakout and fakeout scanner for OHLCV bars")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Print verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML file with analysis settings
    #[arg(short, long, global = true, env = "BREAKOUT_CONFIG")]
    config: Option<PathBuf>,
}

/// Command-line overrides for individual settings
#[derive(clap::Args, Debug)]
struct Overrides {
    /// Bars on each side of a pivot
    #[arg(long)]
    pivot_window: Option<usize>,

    /// Fixed cluster count
    #[arg(long)]
    clusters: Option<usize>,

    /// Pick the cluster count by silhouette score
    #[arg(long)]
    dynamic_cluster: bool,

    /// Pre-cross stability lookback
    #[arg(long)]
    check_periods: Option<usize>,

    /// Share of the candle body beyond the level (0-1)
    #[arg(long)]
    body_threshold: Option<f64>,

    /// Use the open/close crossing predicate instead of high/low
    #[arg(long)]
    open_close: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan bar files for breakout and fakeout signals (JSON lines on stdout)
    Scan {
        /// CSV / .csv.zst files or directories containing them
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Only report signals on the last bar
        #[arg(long, conflicts_with = "within")]
        latest: bool,

        /// Report signals within the last N bars (default: signal_window)
        #[arg(long)]
        within: Option<usize>,

        /// Only report confirmed breakouts
        #[arg(long)]
        confirmed_only: bool,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Print the level set of one file and the levels near a price
    Levels {
        /// CSV / .csv.zst bar file
        path: PathBuf,

        /// Reference price (default: last close)
        #[arg(short, long)]
        price: Option<f64>,

        /// Ignore levels above this price
        #[arg(long)]
        max_price: Option<f64>,

        /// Report levels closed on both sides of within the last N bars
        #[arg(long, default_value_t = 2)]
        break_sessions: usize,

        #[command(flatten)]
        overrides: Overrides,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Commands::Scan { paths, latest, within, confirmed_only, overrides } => {
            let config = load_config(args.config.as_deref(), &overrides)?;
            run_scan(&paths, &config, latest, within, confirmed_only)?;
        }
        Commands::Levels { path, price, max_price, break_sessions, overrides } => {
            let config = load_config(args.config.as_deref(), &overrides)?;
            run_levels(&path, &config, price, max_price, break_sessions)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<AnalysisConfig> {
    let mut config = match path {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("Failed to load config: {:?}", path))?,
        None => AnalysisConfig::default(),
    };

    if let Some(w) = overrides.pivot_window {
        config.pivot_window = w;
    }
    if let Some(k) = overrides.clusters {
        config.cluster_count = k;
    }
    if overrides.dynamic_cluster {
        config.dynamic_cluster = true;
    }
    if let Some(p) = overrides.check_periods {
        config.check_periods = p;
    }
    if let Some(t) = overrides.body_threshold {
        config.body_threshold = t;
    }
    if overrides.open_close {
        config.crossing_mode = CrossingMode::OpenClose;
    }

    config.validate()?;
    Ok(config)
}

fn run_scan(
    paths: &[PathBuf],
    config: &AnalysisConfig,
    latest: bool,
    within: Option<usize>,
    confirmed_only: bool,
) -> Result<()> {
    info!("=== SCAN MODE ===");
    info!("Crossing mode: {}, check periods: {}", config.crossing_mode, config.check_periods);

    let files = find_bar_files(paths)?;
    info!("Found {} bar files", files.len());

    let mut batch: Vec<(String, BarSeries)> = Vec::with_capacity(files.len());
    for path in &files {
        match load_bars(path) {
            Ok(series) => batch.push((symbol_from_path(path), series)),
            Err(e) => warn!("Skipping {:?}: {:#}", path, e),
        }
    }

    let query = if latest {
        SignalQuery::LatestBar
    } else {
        SignalQuery::WithinLast(within.unwrap_or(config.signal_window))
    };

    let mut reported = 0;
    for ((symbol, result), (_, series)) in analyze_batch(&batch, config).into_iter().zip(&batch) {
        let analysis = match result {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("Skipping {}: {}", symbol, e);
                continue;
            }
        };

        let holds = analysis.holds(series, config.retest_periods);
        for signal in analysis.select(query) {
            if confirmed_only && signal.classification != Classification::ConfirmedBreakout {
                continue;
            }
            let hold = holds
                .iter()
                .find(|(s, _)| s.bar_index == signal.bar_index)
                .map(|(_, status)| *status);

            let line = serde_json::json!({
                "symbol": symbol,
                "signal": signal,
                "hold": hold,
            });
            println!("{}", line);
            reported += 1;
        }
    }

    info!("Reported {} signals across {} symbols", reported, batch.len());
    Ok(())
}

fn run_levels(
    path: &Path,
    config: &AnalysisConfig,
    price: Option<f64>,
    max_price: Option<f64>,
    break_sessions: usize,
) -> Result<()> {
    let series = load_bars(path)?;
    let symbol = symbol_from_path(path);

    let pivots = detect_pivots(series.bars(), config.pivot_window);
    let levels = build_levels(&pivots, config)
        .with_context(|| format!("Failed to build levels for {}", symbol))?;

    println!("{}: {} pivots, {} levels", symbol, pivots.len(), levels.len());
    for level in &levels {
        println!("  {:>12.4}  ({} pivots)", level.price, level.member_count);
    }

    for level in recent_level_breaks(series.bars(), &levels, break_sessions, max_price) {
        println!(
            "Level {:.4} broken within the last {} bars, now {}",
            level.price, break_sessions, level.kind
        );
    }

    let Some(reference) = price.or_else(|| series.last().map(|b| b.close)) else {
        return Ok(());
    };
    let near = levels_near_price(&levels, reference, config.proximity_threshold, max_price);
    println!(
        "Levels within {:.1}% of {:.4}:",
        config.proximity_threshold * 100.0,
        reference
    );
    for n in &near {
        println!("  {} {:>12.4}  ({:.2}%)", n.level.kind, n.level.price, n.distance_pct * 100.0);
    }

    if let Ok(analysis) = evaluate_levels(&series, pivots, &levels, config) {
        if let Some((signal, status)) = analysis.holds(&series, config.retest_periods).last() {
            let status = match status {
                HoldStatus::Held { new_level } => format!("held, new level {:.4}", new_level),
                HoldStatus::Retested { bar_index } => format!("retested at bar {}", bar_index),
                HoldStatus::Pending => "pending".to_string(),
            };
            println!(
                "Last confirmed breakout: {} {} at bar {} ({})",
                signal.direction, signal.level.price, signal.bar_index, status
            );
        }
    }

    Ok(())
}
