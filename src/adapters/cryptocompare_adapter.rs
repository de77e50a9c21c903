//! CryptoCompare daily history adapter.
//!
//! Fetches daily candles from the `histoday` endpoint. One request per call,
//! no retries; failures surface as `DataSource` errors and abort only the
//! calling bot cycle.

use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::error::CryptosimError;
use crate::domain::tick::{PriceTick, TradingPair};
use crate::ports::data_port::DataPort;

pub const DEFAULT_BASE_URL: &str = "https://min-api.cryptocompare.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HistoResponse {
    response: String,
    #[serde(default)]
    message: String,
    /// An array of candles on success; may be an object or empty on error.
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct HistoCandle {
    time: i64,
    close: f64,
}

pub struct CryptoCompareAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl CryptoCompareAdapter {
    pub fn new() -> Result<Self, CryptosimError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, CryptosimError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("cryptosim/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CryptosimError::DataSource {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn histoday_url(&self, pair: &TradingPair, limit: usize) -> String {
        format!(
            "{}/data/histoday?fsym={}&tsym={}&limit={}&aggregate=1",
            self.base_url, pair.base, pair.quote, limit
        )
    }

    fn parse_response(
        pair: &TradingPair,
        resp: HistoResponse,
    ) -> Result<Vec<PriceTick>, CryptosimError> {
        if !resp.response.eq_ignore_ascii_case("success") {
            return Err(CryptosimError::DataSource {
                reason: format!("{pair}: {} ({})", resp.message, resp.response),
            });
        }

        let candles: Vec<HistoCandle> =
            serde_json::from_value(resp.data).map_err(|e| CryptosimError::DataSource {
                reason: format!("{pair}: unexpected Data payload: {e}"),
            })?;

        let mut ticks = Vec::with_capacity(candles.len());
        for candle in candles {
            let tick = PriceTick::from_secs(candle.time, candle.close).ok_or_else(|| {
                CryptosimError::DataSource {
                    reason: format!("{pair}: invalid timestamp {}", candle.time),
                }
            })?;
            ticks.push(tick);
        }
        ticks.sort_by_key(|t| t.timestamp);
        Ok(ticks)
    }
}

impl DataPort for CryptoCompareAdapter {
    fn fetch_daily_ticks(
        &self,
        pair: &TradingPair,
        limit: usize,
    ) -> Result<Vec<PriceTick>, CryptosimError> {
        let url = self.histoday_url(pair, limit);
        debug!(%url, "fetching daily history");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| CryptosimError::DataSource {
                reason: format!("request for {pair} failed: {e}"),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CryptosimError::DataSource {
                reason: format!("HTTP {status} for {pair}"),
            });
        }

        let body: HistoResponse = resp.json().map_err(|e| CryptosimError::DataSource {
            reason: format!("failed to parse response for {pair}: {e}"),
        })?;

        let mut ticks = Self::parse_response(pair, body)?;
        // The endpoint returns limit + 1 candles.
        if ticks.len() > limit {
            ticks.drain(..ticks.len() - limit);
        }
        Ok(ticks)
    }
}
