#![allow(dead_code)]

use chrono::NaiveDate;
use cryptosim::domain::backtest::BacktestConfig;
use cryptosim::domain::bot::BotConfig;
use cryptosim::domain::error::CryptosimError;
use cryptosim::domain::tick::{PriceTick, TradingPair};
use cryptosim::ports::data_port::DataPort;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// In-memory `DataPort` keyed by base asset. Errors can be injected per asset
/// or for specific call numbers (1-based).
pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceTick>>,
    pub errors: HashMap<String, String>,
    pub failing_calls: HashSet<usize>,
    calls: Cell<usize>,
    pub requested: RefCell<Vec<(TradingPair, usize)>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            failing_calls: HashSet::new(),
            calls: Cell::new(0),
            requested: RefCell::new(Vec::new()),
        }
    }

    pub fn with_ticks(mut self, asset: &str, ticks: Vec<PriceTick>) -> Self {
        self.data.insert(asset.to_string(), ticks);
        self
    }

    pub fn with_error(mut self, asset: &str, reason: &str) -> Self {
        self.errors.insert(asset.to_string(), reason.to_string());
        self
    }

    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.failing_calls.insert(call);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl DataPort for MockDataPort {
    fn fetch_daily_ticks(
        &self,
        pair: &TradingPair,
        limit: usize,
    ) -> Result<Vec<PriceTick>, CryptosimError> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        self.requested.borrow_mut().push((pair.clone(), limit));

        if self.failing_calls.contains(&call) {
            return Err(CryptosimError::DataSource {
                reason: format!("injected failure on call {call}"),
            });
        }
        if let Some(reason) = self.errors.get(&pair.base) {
            return Err(CryptosimError::DataSource {
                reason: reason.clone(),
            });
        }
        let ticks = self.data.get(&pair.base).cloned().unwrap_or_default();
        let skip = ticks.len().saturating_sub(limit);
        Ok(ticks.into_iter().skip(skip).collect())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One midnight tick per day starting at `start`.
pub fn daily_ticks(start: NaiveDate, prices: &[f64]) -> Vec<PriceTick> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| PriceTick::at_date(start + chrono::Duration::days(i as i64), p))
        .collect()
}

/// Falls for `down` days then rises for `up` days, so a 2/3 SMA pair crosses up once.
pub fn v_shape(start_price: f64, down: usize, up: usize) -> Vec<f64> {
    let mut prices: Vec<f64> = (0..down).map(|i| start_price - i as f64).collect();
    let bottom = start_price - down as f64;
    prices.extend((0..up).map(|i| bottom + 2.0 * (i + 1) as f64));
    prices
}

/// Seasonal (period 7) series on a linear trend, no noise.
pub fn seasonal_trend(len: usize, base: f64, slope: f64) -> Vec<f64> {
    const PATTERN: [f64; 7] = [0.0, 3.0, -2.0, 5.0, 1.0, -4.0, 2.0];
    (0..len)
        .map(|i| base + slope * i as f64 + PATTERN[i % 7])
        .collect()
}

pub fn sample_bot_config() -> BotConfig {
    BotConfig {
        pair: "BTC/USDT".parse().unwrap(),
        poll_interval: Duration::from_millis(1),
        initial_balance: 10_000.0,
        short_window: 2,
        long_window: 3,
        order_quantity: 1.0,
        history_limit: 100,
        max_cycles: Some(1),
    }
}

pub fn sample_backtest_config() -> BacktestConfig {
    BacktestConfig {
        initial_balance: 10_000.0,
        short_window: 2,
        long_window: 3,
        order_quantity: 1.0,
    }
}

/// CSV body in the history-file layout (millisecond timestamps).
pub fn history_csv(start: NaiveDate, prices: &[f64]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for tick in daily_ticks(start, prices) {
        out.push_str(&format!(
            "{},{p},{p},{p},{p},100\n",
            tick.timestamp.timestamp_millis(),
            p = tick.price
        ));
    }
    out
}
