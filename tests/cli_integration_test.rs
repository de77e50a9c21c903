//! CLI integration tests.
//!
//! Tests cover:
//! - Config parsing (build_bot_config, build_forecast_config, build_csv_adapter)
//! - Bot and backtest pipelines with MockDataPort
//! - Forecast pipeline over CSV history files on disk
//! - Subcommand dispatch through `cli::run` with real INI files

mod common;

use approx::assert_relative_eq;
use clap::Parser;
use common::*;
use cryptosim::adapters::csv_adapter::CsvAdapter;
use cryptosim::adapters::file_config_adapter::FileConfigAdapter;
use cryptosim::cli::{self, Cli};
use cryptosim::domain::error::CryptosimError;
use cryptosim::domain::forecast::{ForecastConfig, ModelOrder, SeasonalOrder};
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn is_success(code: ExitCode) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::SUCCESS)
}

fn same_code(a: ExitCode, b: ExitCode) -> bool {
    format!("{a:?}") == format!("{b:?}")
}

const VALID_INI: &str = r#"
[bot]
pair = btc/usdt
poll_interval_seconds = 0.5
initial_balance = 10000.0
short_window = 2
long_window = 3
order_quantity = 0.25
history_limit = 50
max_cycles = 2

[forecast]
order = 1,1,1
seasonal_order = 1,1,1,7
horizon = 2

[data]
csv_dir = /tmp/cryptosim-data
"#;

mod config_loading {
    use super::*;

    #[test]
    fn build_bot_config_valid_full() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config = cli::build_bot_config(&adapter).unwrap();

        assert_eq!(config.pair.to_string(), "BTC/USDT");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_relative_eq!(config.initial_balance, 10_000.0);
        assert_eq!(config.short_window, 2);
        assert_eq!(config.long_window, 3);
        assert_relative_eq!(config.order_quantity, 0.25);
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.max_cycles, Some(2));
    }

    #[test]
    fn build_bot_config_uses_defaults() {
        let ini = r#"
[bot]
pair = ETH/USD
initial_balance = 500
short_window = 5
long_window = 10
"#;
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let config = cli::build_bot_config(&adapter).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_relative_eq!(config.order_quantity, 1.0);
        assert_eq!(config.history_limit, 200);
        assert_eq!(config.max_cycles, None);
    }

    #[test]
    fn build_bot_config_missing_pair() {
        let adapter = FileConfigAdapter::from_string("[bot]\nshort_window = 2\n").unwrap();
        let err = cli::build_bot_config(&adapter).unwrap_err();
        assert!(matches!(err, CryptosimError::ConfigMissing { key, .. } if key == "pair"));
    }

    #[test]
    fn build_bot_config_negative_window() {
        let ini = "[bot]\npair = BTC/USDT\nshort_window = -2\nlong_window = 3\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let err = cli::build_bot_config(&adapter).unwrap_err();
        assert!(matches!(err, CryptosimError::ConfigInvalid { key, .. } if key == "short_window"));
    }

    #[test]
    fn build_bot_config_negative_interval() {
        let ini = "[bot]\npair = BTC/USDT\npoll_interval_seconds = -1\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let err = cli::build_bot_config(&adapter).unwrap_err();
        assert!(
            matches!(err, CryptosimError::ConfigInvalid { key, .. } if key == "poll_interval_seconds")
        );
    }

    #[test]
    fn build_forecast_config_explicit() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config = cli::build_forecast_config(&adapter).unwrap();
        assert_eq!(config.order, ModelOrder { p: 1, d: 1, q: 1 });
        assert_eq!(
            config.seasonal_order,
            SeasonalOrder {
                p: 1,
                d: 1,
                q: 1,
                s: 7
            }
        );
        assert_eq!(config.horizon, 2);
    }

    #[test]
    fn build_forecast_config_defaults() {
        let adapter = FileConfigAdapter::from_string("[forecast]\n").unwrap();
        assert_eq!(
            cli::build_forecast_config(&adapter).unwrap(),
            ForecastConfig::default()
        );
    }

    #[test]
    fn build_forecast_config_bad_order() {
        let adapter = FileConfigAdapter::from_string("[forecast]\norder = 1;1;1\n").unwrap();
        let err = cli::build_forecast_config(&adapter).unwrap_err();
        assert!(matches!(err, CryptosimError::ConfigInvalid { key, .. } if key == "order"));
    }

    #[test]
    fn build_csv_adapter_requires_dir() {
        let adapter = FileConfigAdapter::from_string("[data]\n").unwrap();
        let err = cli::build_csv_adapter(&adapter).err().unwrap();
        assert!(matches!(err, CryptosimError::ConfigMissing { key, .. } if key == "csv_dir"));
    }
}

mod pipelines {
    use super::*;

    #[test]
    fn bot_pipeline_runs_to_max_cycles() {
        let port = MockDataPort::new()
            .with_ticks("BTC", daily_ticks(date(2024, 1, 1), &v_shape(100.0, 4, 2)));
        let summary = cli::run_bot_pipeline(
            &port,
            cryptosim::domain::bot::BotConfig {
                max_cycles: Some(2),
                ..sample_bot_config()
            },
        )
        .unwrap();

        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.fills, 1);
        assert_relative_eq!(summary.ledger.cash_balance, 9_900.0);
        assert_eq!(port.calls(), 2);
    }

    #[test]
    fn bot_pipeline_rejects_bad_config() {
        let port = MockDataPort::new();
        let err = cli::run_bot_pipeline(
            &port,
            cryptosim::domain::bot::BotConfig {
                short_window: 0,
                ..sample_bot_config()
            },
        )
        .unwrap_err();
        assert!(matches!(err, CryptosimError::InvalidParameter { .. }));
        assert_eq!(port.calls(), 0);
    }

    #[test]
    fn backtest_pipeline_from_ticks() {
        let mut prices = v_shape(100.0, 4, 3);
        prices.extend([99.0, 95.0, 90.0]);
        let ticks = daily_ticks(date(2024, 1, 1), &prices);

        let result = cli::run_backtest_pipeline(&ticks, &sample_backtest_config()).unwrap();
        assert_eq!(result.fills.len(), 2);
        // Bought at 100 on the crossover, sold at 95.
        assert_relative_eq!(result.final_equity, 9_995.0);
    }

    #[test]
    fn backtest_pipeline_empty_history() {
        let err = cli::run_backtest_pipeline(&[], &sample_backtest_config()).unwrap_err();
        assert!(matches!(err, CryptosimError::InsufficientData { .. }));
    }

    #[test]
    fn forecast_pipeline_keeps_asset_order_and_isolates_failures() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("btc_data.csv"),
            history_csv(date(2024, 1, 1), &seasonal_trend(90, 40_000.0, 25.0)),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("eth_data.csv"),
            history_csv(date(2024, 1, 1), &seasonal_trend(10, 2_000.0, 1.0)),
        )
        .unwrap();
        let csv = CsvAdapter::new(dir.path().to_path_buf());
        let assets = vec!["ETH".to_string(), "BTC".to_string(), "LTC".to_string()];

        let results =
            cli::run_forecast_pipeline(&csv, &assets, date(2024, 3, 31), &ForecastConfig::default());

        let names: Vec<&str> = results.iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(names, vec!["ETH", "BTC", "LTC"]);
        assert!(matches!(results[0].1, Err(CryptosimError::ModelFit { .. })));
        assert!(matches!(results[2].1, Err(CryptosimError::DataSource { .. })));

        let btc = results[1].1.as_ref().unwrap();
        let expected = seasonal_trend(91, 40_000.0, 25.0)[90];
        assert!(
            (btc.predicted_price - expected).abs() < 1e-3,
            "predicted {}, expected {expected}",
            btc.predicted_price
        );
    }

    #[test]
    fn forecast_asset_truncates_future_rows() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("btc_data.csv"),
            history_csv(date(2024, 1, 1), &seasonal_trend(120, 100.0, 1.0)),
        )
        .unwrap();
        let csv = CsvAdapter::new(dir.path().to_path_buf());

        // History runs to 2024-04-29; the target sits in the middle of it.
        let result =
            cli::forecast_asset(&csv, "btc", date(2024, 2, 15), &ForecastConfig::default()).unwrap();
        let expected = seasonal_trend(46, 100.0, 1.0)[45];
        assert!((result.predicted_price - expected).abs() < 1e-3);
    }
}

mod dispatch {
    use super::*;

    fn data_dir_with_btc() -> tempfile::TempDir {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("btc_data.csv"),
            history_csv(date(2024, 1, 1), &seasonal_trend(90, 100.0, 1.0)),
        )
        .unwrap();
        dir
    }

    fn ini_for(dir: &tempfile::TempDir) -> tempfile::NamedTempFile {
        let ini = VALID_INI.replace("/tmp/cryptosim-data", &dir.path().display().to_string());
        write_temp_ini(&ini)
    }

    #[test]
    fn validate_accepts_valid_config() {
        let dir = data_dir_with_btc();
        let ini = ini_for(&dir);
        let cli = Cli::parse_from(["cryptosim", "validate", "--config", ini.path().to_str().unwrap()]);
        assert!(is_success(cli::run(cli)));
    }

    #[test]
    fn validate_rejects_invalid_config() {
        let ini = write_temp_ini(&VALID_INI.replace("long_window = 3", "long_window = 1"));
        let cli = Cli::parse_from(["cryptosim", "validate", "--config", ini.path().to_str().unwrap()]);
        assert!(same_code(cli::run(cli), ExitCode::from(2)));
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let cli = Cli::parse_from(["cryptosim", "validate", "--config", "/nonexistent/cryptosim.ini"]);
        assert!(same_code(cli::run(cli), ExitCode::from(2)));
    }

    #[test]
    fn backtest_over_csv_history() {
        let dir = data_dir_with_btc();
        let ini = ini_for(&dir);
        let cli = Cli::parse_from(["cryptosim", "backtest", "--config", ini.path().to_str().unwrap()]);
        assert!(is_success(cli::run(cli)));
    }

    #[test]
    fn run_bot_from_csv_source() {
        let dir = data_dir_with_btc();
        let ini = ini_for(&dir);
        let cli = Cli::parse_from([
            "cryptosim",
            "run",
            "--config",
            ini.path().to_str().unwrap(),
            "--source",
            "csv",
            "--max-cycles",
            "1",
        ]);
        assert!(is_success(cli::run(cli)));
    }

    #[test]
    fn forecast_command_succeeds() {
        let dir = data_dir_with_btc();
        let ini = ini_for(&dir);
        let cli = Cli::parse_from([
            "cryptosim",
            "forecast",
            "--config",
            ini.path().to_str().unwrap(),
            "--date",
            "2024-03-01",
            "--asset",
            "BTC",
        ]);
        assert!(is_success(cli::run(cli)));
    }

    #[test]
    fn forecast_target_before_history_fails() {
        let dir = data_dir_with_btc();
        let ini = ini_for(&dir);
        let cli = Cli::parse_from([
            "cryptosim",
            "forecast",
            "--config",
            ini.path().to_str().unwrap(),
            "--date",
            "2023-06-01",
        ]);
        assert!(same_code(cli::run(cli), ExitCode::from(5)));
    }

    #[test]
    fn forecast_date_must_parse() {
        let result = Cli::try_parse_from([
            "cryptosim",
            "forecast",
            "--config",
            "x.ini",
            "--date",
            "03/01/2024",
        ]);
        assert!(result.is_err());
    }
}
