//! Raw price observations and trading pair identifiers.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;

use super::error::CryptosimError;

/// A single untrusted price observation at arbitrary granularity.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTick {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PriceTick {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }

    /// Build a tick from a millisecond epoch timestamp.
    pub fn from_millis(millis: i64, price: f64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(|timestamp| Self { timestamp, price })
    }

    /// Build a tick from a second epoch timestamp.
    pub fn from_secs(secs: i64, price: f64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(|timestamp| Self { timestamp, price })
    }

    /// A tick at midnight UTC of `date`.
    pub fn at_date(date: NaiveDate, price: f64) -> Self {
        Self {
            timestamp: date.and_time(chrono::NaiveTime::default()).and_utc(),
            price,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Prices must be finite and strictly positive to count as an observation.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

/// Base/quote pair such as `BTC/USDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TradingPair {
    pub base: String,
    pub quote: String,
}

impl FromStr for TradingPair {
    type Err = CryptosimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s.split_once('/').ok_or_else(|| {
            CryptosimError::invalid_parameter("pair", format!("expected BASE/QUOTE, got '{s}'"))
        })?;
        let base = base.trim().to_uppercase();
        let quote = quote.trim().to_uppercase();
        if base.is_empty() || quote.is_empty() || quote.contains('/') {
            return Err(CryptosimError::invalid_parameter(
                "pair",
                format!("expected BASE/QUOTE, got '{s}'"),
            ));
        }
        Ok(TradingPair { base, quote })
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_millis_converts_to_utc_date() {
        // 2024-01-15T12:00:00Z
        let tick = PriceTick::from_millis(1_705_320_000_000, 42_000.0).unwrap();
        assert_eq!(tick.date(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn from_secs_matches_from_millis() {
        let a = PriceTick::from_secs(1_705_320_000, 1.0).unwrap();
        let b = PriceTick::from_millis(1_705_320_000_000, 1.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn validity() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(PriceTick::at_date(date, 1.0).is_valid());
        assert!(!PriceTick::at_date(date, 0.0).is_valid());
        assert!(!PriceTick::at_date(date, -5.0).is_valid());
        assert!(!PriceTick::at_date(date, f64::NAN).is_valid());
        assert!(!PriceTick::at_date(date, f64::INFINITY).is_valid());
    }

    #[test]
    fn pair_parses_and_uppercases() {
        let pair: TradingPair = " btc / usdt ".parse().unwrap();
        assert_eq!(pair.base, "BTC");
        assert_eq!(pair.quote, "USDT");
        assert_eq!(pair.to_string(), "BTC/USDT");
    }

    #[test]
    fn pair_rejects_malformed() {
        assert!("BTCUSDT".parse::<TradingPair>().is_err());
        assert!("/USDT".parse::<TradingPair>().is_err());
        assert!("BTC/".parse::<TradingPair>().is_err());
        assert!("BTC/USDT/ETH".parse::<TradingPair>().is_err());
    }
}
