//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::bot::{self, Bot, BotConfig, RunSummary};
use crate::domain::config_validation::{
    validate_bot_config, validate_data_config, validate_forecast_config,
};
use crate::domain::error::CryptosimError;
use crate::domain::forecast::{self, ForecastConfig, ForecastRequest, ForecastResult};
use crate::domain::price_series::PriceSeries;
use crate::domain::tick::{PriceTick, TradingPair};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(
    name = "cryptosim",
    about = "Crypto trading-bot simulator and price forecaster"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Source {
    /// History files from the `[data]` csv_dir
    Csv,
    /// CryptoCompare daily history over HTTP
    Cryptocompare,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the polling trading bot
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_enum, default_value_t = Source::Cryptocompare)]
        source: Source,
        /// Overrides `[bot] max_cycles`
        #[arg(long)]
        max_cycles: Option<usize>,
    },
    /// Replay the crossover strategy over a CSV history
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Defaults to the base asset of `[bot] pair`
        #[arg(long)]
        asset: Option<String>,
    },
    /// Forecast the closing price on a date from history strictly before it
    Forecast {
        #[arg(short, long)]
        config: PathBuf,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Repeatable; defaults to every asset in csv_dir
        #[arg(long)]
        asset: Vec<String>,
        /// Overrides `[forecast] horizon`
        #[arg(long)]
        horizon: Option<usize>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            source,
            max_cycles,
        } => run_bot(&config, source, max_cycles),
        Command::Backtest { config, asset } => run_backtest(&config, asset.as_deref()),
        Command::Forecast {
            config,
            date,
            asset,
            horizon,
        } => run_forecast(&config, date, &asset, horizon),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = CryptosimError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        error!("{err}");
        ExitCode::from(&err)
    })
}

fn fail(err: CryptosimError) -> ExitCode {
    error!("{err}");
    (&err).into()
}

fn get_usize(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, CryptosimError> {
    let value = adapter.get_int(section, key, default as i64);
    usize::try_from(value).map_err(|_| CryptosimError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: format!("{value} is not a non-negative integer"),
    })
}

pub fn build_bot_config(adapter: &dyn ConfigPort) -> Result<BotConfig, CryptosimError> {
    let pair_str = adapter
        .get_string("bot", "pair")
        .ok_or_else(|| CryptosimError::ConfigMissing {
            section: "bot".into(),
            key: "pair".into(),
        })?;
    let pair: TradingPair = pair_str.parse().map_err(|e: CryptosimError| {
        CryptosimError::ConfigInvalid {
            section: "bot".into(),
            key: "pair".into(),
            reason: e.to_string(),
        }
    })?;

    let secs = adapter.get_double("bot", "poll_interval_seconds", 60.0);
    let poll_interval =
        Duration::try_from_secs_f64(secs).map_err(|e| CryptosimError::ConfigInvalid {
            section: "bot".into(),
            key: "poll_interval_seconds".into(),
            reason: e.to_string(),
        })?;

    let max_cycles = match adapter.get_string("bot", "max_cycles") {
        Some(_) => Some(get_usize(adapter, "bot", "max_cycles", 0)?),
        None => None,
    };

    Ok(BotConfig {
        pair,
        poll_interval,
        initial_balance: adapter.get_double("bot", "initial_balance", 0.0),
        short_window: get_usize(adapter, "bot", "short_window", 0)?,
        long_window: get_usize(adapter, "bot", "long_window", 0)?,
        order_quantity: adapter.get_double("bot", "order_quantity", 1.0),
        history_limit: get_usize(adapter, "bot", "history_limit", 200)?,
        max_cycles,
    })
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, CryptosimError> {
    Ok(BacktestConfig {
        initial_balance: adapter.get_double("bot", "initial_balance", 0.0),
        short_window: get_usize(adapter, "bot", "short_window", 0)?,
        long_window: get_usize(adapter, "bot", "long_window", 0)?,
        order_quantity: adapter.get_double("bot", "order_quantity", 1.0),
    })
}

pub fn build_forecast_config(adapter: &dyn ConfigPort) -> Result<ForecastConfig, CryptosimError> {
    let defaults = ForecastConfig::default();
    let invalid = |key: &str, e: CryptosimError| CryptosimError::ConfigInvalid {
        section: "forecast".into(),
        key: key.into(),
        reason: e.to_string(),
    };

    let order = match adapter.get_string("forecast", "order") {
        Some(s) => s.parse().map_err(|e| invalid("order", e))?,
        None => defaults.order,
    };
    let seasonal_order = match adapter.get_string("forecast", "seasonal_order") {
        Some(s) => s.parse().map_err(|e| invalid("seasonal_order", e))?,
        None => defaults.seasonal_order,
    };

    Ok(ForecastConfig {
        order,
        seasonal_order,
        horizon: get_usize(adapter, "forecast", "horizon", defaults.horizon)?,
    })
}

pub fn build_csv_adapter(adapter: &dyn ConfigPort) -> Result<CsvAdapter, CryptosimError> {
    validate_data_config(adapter)?;
    let dir = adapter
        .get_string("data", "csv_dir")
        .ok_or_else(|| CryptosimError::ConfigMissing {
            section: "data".into(),
            key: "csv_dir".into(),
        })?;
    Ok(CsvAdapter::new(PathBuf::from(dir.trim())))
}

fn run_bot(config_path: &Path, source: Source, max_cycles: Option<usize>) -> ExitCode {
    info!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_bot_config(&adapter) {
        return fail(e);
    }
    let mut bot_config = match build_bot_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if max_cycles.is_some() {
        bot_config.max_cycles = max_cycles;
    }

    let result = match source {
        Source::Csv => match build_csv_adapter(&adapter) {
            Ok(port) => run_bot_pipeline(&port, bot_config),
            Err(e) => Err(e),
        },
        Source::Cryptocompare => run_cryptocompare(bot_config),
    };

    match result {
        Ok(summary) => {
            print_run_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

#[cfg(feature = "http")]
fn run_cryptocompare(config: BotConfig) -> Result<RunSummary, CryptosimError> {
    use crate::adapters::cryptocompare_adapter::CryptoCompareAdapter;
    let port = CryptoCompareAdapter::new()?;
    run_bot_pipeline(&port, config)
}

#[cfg(not(feature = "http"))]
fn run_cryptocompare(_config: BotConfig) -> Result<RunSummary, CryptosimError> {
    Err(CryptosimError::DataSource {
        reason: "the http feature is required for --source cryptocompare".into(),
    })
}

/// Create a bot for `config` and run it against `port` until it stops.
pub fn run_bot_pipeline(
    port: &dyn DataPort,
    config: BotConfig,
) -> Result<RunSummary, CryptosimError> {
    let mut bot = Bot::new(config)?;
    // The handle stays alive for the whole run so the wait blocks on the channel.
    let (_handle, control) = bot::control_channel();
    bot.start()?;
    bot.run(port, &control)
}

fn print_run_summary(summary: &RunSummary) {
    println!("Cycles:        {}", summary.cycles);
    println!("Failed cycles: {}", summary.failed_cycles);
    println!("Fills:         {}", summary.fills);
    println!("Cash:          {:.2}", summary.ledger.cash_balance);
    println!("Position:      {}", summary.ledger.position_quantity);
}

fn run_backtest(config_path: &Path, asset_override: Option<&str>) -> ExitCode {
    info!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_bot_config(&adapter) {
        return fail(e);
    }

    let setup = (|| {
        let bt_config = build_backtest_config(&adapter)?;
        let csv = build_csv_adapter(&adapter)?;
        let asset = match asset_override {
            Some(a) => a.to_uppercase(),
            None => build_bot_config(&adapter)?.pair.base,
        };
        Ok::<_, CryptosimError>((bt_config, csv, asset))
    })();
    let (bt_config, csv, asset) = match setup {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    info!(asset = %asset, "Loading history");
    let result = csv
        .load_ticks(&asset)
        .and_then(|ticks| run_backtest_pipeline(&ticks, &bt_config));

    match result {
        Ok(result) => {
            print_backtest_result(&asset, &result);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// Normalize raw ticks and replay the strategy over them.
pub fn run_backtest_pipeline(
    ticks: &[PriceTick],
    config: &BacktestConfig,
) -> Result<BacktestResult, CryptosimError> {
    let series = PriceSeries::normalize(ticks)?;
    info!(
        "Replaying {} days ({} to {})",
        series.len(),
        series.first_date(),
        series.last_date()
    );
    backtest_engine::run_backtest(&series, config)
}

fn print_backtest_result(asset: &str, result: &BacktestResult) {
    println!("=== Backtest: {asset} ===");
    println!(
        "Signals:       {} buy / {} sell / {} hold",
        result.buy_signals, result.sell_signals, result.hold_signals
    );
    for fill in &result.fills {
        println!(
            "  {} {:<4} {} @ {:.2}  cash {:.2}  position {}",
            fill.date,
            fill.order_type,
            fill.quantity,
            fill.price,
            fill.state.cash_balance,
            fill.state.position_quantity
        );
    }
    println!("Final cash:    {:.2}", result.ledger.cash_balance);
    println!("Final position:{:>10}", result.ledger.position_quantity);
    println!("Final equity:  {:.2}", result.final_equity);
    println!("Total return:  {:.2}%", result.total_return() * 100.0);
}

fn run_forecast(
    config_path: &Path,
    date: NaiveDate,
    assets: &[String],
    horizon: Option<usize>,
) -> ExitCode {
    info!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_forecast_config(&adapter) {
        return fail(e);
    }

    let setup = (|| {
        let mut settings = build_forecast_config(&adapter)?;
        if let Some(h) = horizon {
            settings.horizon = h;
        }
        let csv = build_csv_adapter(&adapter)?;
        let assets = if assets.is_empty() {
            csv.list_assets()?
        } else {
            assets.iter().map(|a| a.to_uppercase()).collect()
        };
        Ok::<_, CryptosimError>((settings, csv, assets))
    })();
    let (settings, csv, assets) = match setup {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    if assets.is_empty() {
        return fail(CryptosimError::InsufficientData {
            reason: "no assets to forecast".into(),
        });
    }

    info!(
        "Forecasting {} asset(s) for {} with SARIMA{}x{}",
        assets.len(),
        date,
        settings.order,
        settings.seasonal_order
    );

    let mut first_error: Option<CryptosimError> = None;
    for (asset, outcome) in run_forecast_pipeline(&csv, &assets, date, &settings) {
        match outcome {
            Ok(result) => print_forecast(&asset, &result),
            Err(e) => {
                warn!(asset = %asset, error = %e, "forecast failed");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        None => ExitCode::SUCCESS,
        Some(e) => (&e).into(),
    }
}

/// Forecast each asset on its own scoped thread; results keep `assets` order.
pub fn run_forecast_pipeline(
    csv: &CsvAdapter,
    assets: &[String],
    date: NaiveDate,
    settings: &ForecastConfig,
) -> Vec<(String, Result<ForecastResult, CryptosimError>)> {
    std::thread::scope(|s| {
        let handles: Vec<_> = assets
            .iter()
            .map(|asset| s.spawn(move || forecast_asset(csv, asset, date, settings)))
            .collect();
        assets
            .iter()
            .cloned()
            .zip(handles)
            .map(|(asset, handle)| {
                let outcome = handle.join().unwrap_or_else(|_| {
                    Err(CryptosimError::ModelFit {
                        reason: format!("forecast thread for {asset} panicked"),
                    })
                });
                (asset, outcome)
            })
            .collect()
    })
}

pub fn forecast_asset(
    csv: &CsvAdapter,
    asset: &str,
    date: NaiveDate,
    settings: &ForecastConfig,
) -> Result<ForecastResult, CryptosimError> {
    let history = PriceSeries::normalize(&csv.load_ticks(asset)?)?;
    let request =
        ForecastRequest::point_in_time(&history, date, settings.order, settings.seasonal_order)?
            .with_horizon(settings.horizon);
    info!(
        asset,
        observations = request.training.len(),
        last = %request.training.last_date(),
        "Fitting model"
    );
    forecast::forecast(&request)
}

fn print_forecast(asset: &str, result: &ForecastResult) {
    println!(
        "{asset} {} predicted close: {:.2}",
        result.target_date, result.predicted_price
    );
    if result.path.len() > 1 {
        let path: Vec<String> = result.path.iter().map(|p| format!("{p:.2}")).collect();
        println!("  path: {}", path.join(", "));
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    info!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let checks: [(&str, fn(&dyn ConfigPort) -> Result<(), CryptosimError>); 3] = [
        ("bot", validate_bot_config),
        ("forecast", validate_forecast_config),
        ("data", validate_data_config),
    ];
    for (section, check) in checks {
        if let Err(e) = check(&adapter) {
            return fail(e);
        }
        info!("[{section}] ok");
    }

    println!("Configuration is valid");
    ExitCode::SUCCESS
}
