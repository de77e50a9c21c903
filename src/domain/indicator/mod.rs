//! Technical indicators over a daily price series.
//!
//! - `IndicatorPoint`: a single, possibly undefined, indicator value
//! - `IndicatorSeries`: a time series of indicator values
//! - `IndicatorSnapshot`: the short/long moving-average pair at one index
//! - [`compute`]: the moving-average crossover engine

pub mod sma;

use chrono::NaiveDate;
use std::fmt;

use crate::domain::error::CryptosimError;
use crate::domain::price_series::PriceSeries;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    /// `None` during warmup.
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
        }
    }
}

/// Short and long moving averages at one series index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
}

impl IndicatorSnapshot {
    /// Both averages, if both are defined.
    pub fn pair(&self) -> Option<(f64, f64)> {
        Some((self.sma_short?, self.sma_long?))
    }
}

/// Validate a short/long window pair for the crossover strategy.
pub fn validate_windows(short_window: usize, long_window: usize) -> Result<(), CryptosimError> {
    if short_window == 0 {
        return Err(CryptosimError::invalid_parameter(
            "short_window",
            "window must be a positive integer",
        ));
    }
    if long_window == 0 {
        return Err(CryptosimError::invalid_parameter(
            "long_window",
            "window must be a positive integer",
        ));
    }
    if long_window < short_window {
        return Err(CryptosimError::invalid_parameter(
            "long_window",
            format!("long window {long_window} is shorter than short window {short_window}"),
        ));
    }
    Ok(())
}

/// One snapshot per series index.
pub fn compute(
    series: &PriceSeries,
    short_window: usize,
    long_window: usize,
) -> Result<Vec<IndicatorSnapshot>, CryptosimError> {
    validate_windows(short_window, long_window)?;

    let short = sma::calculate_sma(series, short_window);
    let long = sma::calculate_sma(series, long_window);

    Ok(short
        .values
        .iter()
        .zip(long.values.iter())
        .map(|(s, l)| IndicatorSnapshot {
            date: s.date,
            sma_short: s.value,
            sma_long: l.value,
        })
        .collect())
}
