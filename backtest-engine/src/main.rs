use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use backtest_engine::{
    generate_synthetic_bars, load_file, parse_candidates, BacktestConfig, BacktestEngine,
    BacktestResult, OptimizationConfig, OptimizationMethod, OptimizationResult,
    ParameterOptimizer, PriceBar, Strategy, StrategyConfig, TargetMetric,
};

#[derive(Parser, Debug)]
#[command(name = "backtest-engine")]
#[command(version = "0.1.0")]
#[command(about = "Strategy backtester and parameter grid optimizer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one backtest
    Backtest {
        #[command(flatten)]
        common: CommonArgs,

        /// Strategy parameter as name=value (repeatable)
        #[arg(short, long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,
    },
    /// Grid-search strategy parameters
    Optimize {
        #[command(flatten)]
        common: CommonArgs,

        /// Candidate values as name=v1,v2,... or name=min:max:step (repeatable)
        #[arg(short, long = "range", value_name = "NAME=RANGE")]
        ranges: Vec<String>,

        /// Search method (only grid is implemented)
        #[arg(long)]
        method: Option<String>,

        /// Metric to optimize: total_return, annualized_return, sharpe_ratio,
        /// max_drawdown or win_rate
        #[arg(short, long)]
        target: Option<String>,
    },
}

#[derive(ClapArgs, Debug)]
struct CommonArgs {
    /// Strategy type: ma_cross, rsi or bollinger
    #[arg(short, long, default_value = "ma_cross")]
    strategy: String,

    /// JSON config file with optional "backtest" and "optimization" sections
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial capital (overrides the config file)
    #[arg(short, long)]
    capital: Option<f64>,

    /// Data file path (CSV/JSON). If not provided, uses synthetic data.
    #[arg(short = 'f', long)]
    data_file: Option<PathBuf>,

    /// Number of days of synthetic data
    #[arg(short, long, default_value = "365")]
    days: usize,

    /// Initial price for synthetic data
    #[arg(long, default_value = "500.0")]
    initial_price: f64,

    /// Seed for synthetic data
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Output format (json, text)
    #[arg(short, long, default_value = "json")]
    output: String,

    /// Pretty print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    backtest: BacktestConfig,
    optimization: OptimizationConfig,
}

fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Backtest { common, params } => {
            let file_config = load_config(&common)?;
            let config = backtest_config(&common, file_config.backtest);
            let bars = load_bars(&common)?;

            let mut strategy_config = StrategyConfig::new(&common.strategy);
            for param in &params {
                let (name, value) = split_pair(param)?;
                let value: f64 = value
                    .parse()
                    .with_context(|| format!("invalid value for parameter '{}'", name))?;
                strategy_config.params.insert(name.to_string(), value);
            }
            let strategy = Strategy::from_config(&strategy_config)?;

            info!(strategy = strategy.name(), bars = bars.len(), "running backtest");
            let result = BacktestEngine::new(config).run(&bars, &strategy)?;

            if common.output == "text" {
                print_backtest_report(&strategy, &result);
            } else {
                print_json(&result, &common)?;
            }
        }
        Command::Optimize {
            common,
            ranges,
            method,
            target,
        } => {
            let file_config = load_config(&common)?;
            let config = backtest_config(&common, file_config.backtest);
            let mut settings = file_config.optimization;
            if let Some(method) = method {
                settings.method = OptimizationMethod::parse(&method);
            }
            if let Some(target) = target {
                settings.target_metric = TargetMetric::parse(&target);
            }
            for range in &ranges {
                let (name, spec) = split_pair(range)?;
                settings
                    .param_ranges
                    .insert(name.to_string(), parse_candidates(spec)?);
            }
            let bars = load_bars(&common)?;

            info!(
                strategy = %common.strategy,
                method = %settings.method,
                target = %settings.target_metric,
                bars = bars.len(),
                "running optimization"
            );
            let result = ParameterOptimizer::new(config).optimize(&bars, &common.strategy, &settings)?;

            if common.output == "text" {
                print_optimization_report(&settings, &result);
            } else {
                print_json(&result, &common)?;
            }
        }
    }

    Ok(())
}

/// Initialize logging system; logs go to stderr so stdout stays machine-readable
fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(args: &CommonArgs) -> Result<FileConfig> {
    let Some(path) = &args.config else {
        return Ok(FileConfig::default());
    };
    let file = File::open(path).with_context(|| format!("opening config {:?}", path))?;
    let config = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing config {:?}", path))?;
    Ok(config)
}

fn backtest_config(args: &CommonArgs, from_file: BacktestConfig) -> BacktestConfig {
    match args.capital {
        Some(capital) => from_file.with_capital(capital),
        None => from_file,
    }
}

fn load_bars(args: &CommonArgs) -> Result<Vec<PriceBar>> {
    if let Some(path) = &args.data_file {
        info!(path = ?path, "loading price data");
        return Ok(load_file(path)?);
    }

    let end_date: NaiveDate = Local::now().date_naive();
    info!(
        days = args.days,
        initial_price = args.initial_price,
        seed = args.seed,
        "generating synthetic price data"
    );
    Ok(generate_synthetic_bars(
        args.days,
        args.initial_price,
        end_date,
        args.seed,
    ))
}

fn split_pair(s: &str) -> Result<(&str, &str)> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => bail!("expected NAME=VALUE, got '{}'", s),
    }
}

fn print_json<T: Serialize>(value: &T, args: &CommonArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

fn format_params(params: &backtest_engine::ParamSet) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_backtest_report(strategy: &Strategy, result: &BacktestResult) {
    let metrics = &result.performance_metrics;

    println!();
    println!("================================================================");
    println!("  BACKTEST REPORT - {} ({})", strategy.name(), format_params(&strategy.params()));
    println!("================================================================");
    if let (Some(first), Some(last)) = (result.equity_curve.first(), result.equity_curve.last()) {
        println!("  Period: {} to {}", first.date, last.date);
        println!("  Bars:   {}", result.equity_curve.len());
        println!("  Final Equity:      {:>14.2}", last.equity);
    }
    println!("----------------------------------------------------------------");
    println!("  Total Return:      {:>13.2}%", metrics.total_return * 100.0);
    println!("  Annualized Return: {:>13.2}%", metrics.annualized_return * 100.0);
    println!("  Sharpe Ratio:      {:>14.3}", metrics.sharpe_ratio);
    println!("  Max Drawdown:      {:>13.2}%", metrics.max_drawdown * 100.0);
    println!("  Win Rate:          {:>13.1}%", metrics.win_rate * 100.0);
    println!("  Closed Trades:     {:>14}", metrics.total_trades);
    println!("================================================================");

    if !result.trades.is_empty() {
        println!();
        println!("  RECENT TRADES (last 5)");
        println!("----------------------------------------------------------------");
        for trade in result.trades.iter().rev().take(5) {
            println!(
                "  {} {:<4} {:>10.2} x {:>8} | amount {:>10} | P&L {:>+10}",
                trade.date,
                trade.side.as_str(),
                trade.price,
                trade.shares,
                trade.amount,
                trade.pnl
            );
        }
    }

    if !result.monthly_returns.is_empty() {
        println!();
        println!("  MONTHLY RETURNS");
        println!("----------------------------------------------------------------");
        for month in &result.monthly_returns {
            println!("  {}  {:>+8.2}%", month.month, month.value * 100.0);
        }
    }
    println!();
}

fn print_optimization_report(settings: &OptimizationConfig, result: &OptimizationResult) {
    println!();
    println!("================================================================");
    println!(
        "  OPTIMIZATION REPORT - {} search on {}",
        settings.method, settings.target_metric
    );
    println!("================================================================");
    if result.best_params.is_empty() {
        println!("  No parameter combinations were evaluated.");
    } else {
        println!("  Best Params:  {}", format_params(&result.best_params));
        println!("  Best Value:   {:.4}", result.best_metric_value);
    }
    println!("----------------------------------------------------------------");
    for (rank, entry) in result.results.iter().enumerate() {
        println!(
            "  #{:<2} {:<40} return {:>+8.2}%  sharpe {:>7.3}  dd {:>7.2}%",
            rank + 1,
            format_params(&entry.params),
            entry.metrics.total_return * 100.0,
            entry.metrics.sharpe_ratio,
            entry.metrics.max_drawdown * 100.0
        );
    }
    println!();
}
