//! CSV history adapter.
//!
//! Reads `<asset>_data.csv` files (lower-case asset) with a header row that
//! contains at least `timestamp` (millisecond epoch) and `close`.

use std::fs;
use std::path::PathBuf;

use crate::domain::error::CryptosimError;
use crate::domain::tick::{PriceTick, TradingPair};
use crate::ports::data_port::DataPort;

const FILE_SUFFIX: &str = "_data.csv";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, asset: &str) -> PathBuf {
        self.base_path
            .join(format!("{}{FILE_SUFFIX}", asset.to_lowercase()))
    }

    /// All ticks in the asset's history file, oldest first.
    pub fn load_ticks(&self, asset: &str) -> Result<Vec<PriceTick>, CryptosimError> {
        let path = self.csv_path(asset);
        let content = fs::read_to_string(&path).map_err(|e| CryptosimError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| CryptosimError::DataSource {
            reason: format!("{}: CSV header error: {}", path.display(), e),
        })?;
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| CryptosimError::DataSource {
                    reason: format!("{}: missing {} column", path.display(), name),
                })
        };
        let ts_idx = column("timestamp")?;
        let close_idx = column("close")?;

        let mut ticks = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| CryptosimError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;
            // Header is line 1.
            let row = line + 2;

            let millis: i64 = record
                .get(ts_idx)
                .unwrap_or_default()
                .trim()
                .parse()
                .map_err(|e| CryptosimError::DataSource {
                    reason: format!("{}:{row}: invalid timestamp: {}", path.display(), e),
                })?;
            let close: f64 = record
                .get(close_idx)
                .unwrap_or_default()
                .trim()
                .parse()
                .map_err(|e| CryptosimError::DataSource {
                    reason: format!("{}:{row}: invalid close value: {}", path.display(), e),
                })?;

            let tick = PriceTick::from_millis(millis, close).ok_or_else(|| {
                CryptosimError::DataSource {
                    reason: format!("{}:{row}: timestamp out of range", path.display()),
                }
            })?;
            ticks.push(tick);
        }

        ticks.sort_by_key(|t| t.timestamp);
        Ok(ticks)
    }

    /// Assets that have a history file, upper-cased and sorted.
    pub fn list_assets(&self) -> Result<Vec<String>, CryptosimError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| CryptosimError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut assets = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CryptosimError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(asset) = name_str.strip_suffix(FILE_SUFFIX) {
                if !asset.is_empty() {
                    assets.push(asset.to_uppercase());
                }
            }
        }

        assets.sort();
        Ok(assets)
    }
}

impl DataPort for CsvAdapter {
    /// Ignores the quote asset: history files are keyed by base asset only.
    ///
    /// `limit` counts UTC calendar days, so every intraday row of the most
    /// recent `limit` days is returned.
    fn fetch_daily_ticks(
        &self,
        pair: &TradingPair,
        limit: usize,
    ) -> Result<Vec<PriceTick>, CryptosimError> {
        let mut ticks = self.load_ticks(&pair.base)?;
        let start = start_of_last_days(&ticks, limit);
        ticks.drain(..start);
        Ok(ticks)
    }
}

/// Index of the first tick on the oldest of the last `days` distinct dates.
fn start_of_last_days(ticks: &[PriceTick], days: usize) -> usize {
    let mut seen = 0;
    let mut current = None;
    let mut start = ticks.len();
    for (i, tick) in ticks.iter().enumerate().rev() {
        let date = tick.date();
        if current != Some(date) {
            if seen == days {
                break;
            }
            seen += 1;
            current = Some(date);
        }
        start = i;
    }
    start
}
