//! Daily price series built from raw ticks.
//!
//! Normalization groups ticks by UTC calendar date, averages each day's valid
//! prices, reindexes onto a contiguous daily calendar and forward-fills days that
//! have no valid observation. Leading days with nothing to fill from are dropped.

use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;

use super::error::CryptosimError;
use super::tick::PriceTick;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Gap-free daily closes, one point per calendar day, never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn normalize(ticks: &[PriceTick]) -> Result<Self, CryptosimError> {
        if ticks.is_empty() {
            return Err(CryptosimError::InsufficientData {
                reason: "no price observations".into(),
            });
        }

        let mut daily: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        let mut first = ticks[0].date();
        let mut last = first;

        for tick in ticks {
            let date = tick.date();
            first = first.min(date);
            last = last.max(date);
            if tick.is_valid() {
                let entry = daily.entry(date).or_insert((0.0, 0));
                entry.0 += tick.price;
                entry.1 += 1;
            }
        }

        if daily.is_empty() {
            return Err(CryptosimError::InsufficientData {
                reason: format!("none of {} observations has a positive price", ticks.len()),
            });
        }

        let mut points = Vec::new();
        let mut carried: Option<f64> = None;
        let mut date = first;
        loop {
            let close = match daily.get(&date) {
                Some(&(sum, count)) => Some(sum / count as f64),
                None => carried,
            };
            if let Some(close) = close {
                points.push(PricePoint { date, close });
                carried = Some(close);
            }
            if date >= last {
                break;
            }
            date = match date.checked_add_days(Days::new(1)) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(PriceSeries { points })
    }

    /// Validating constructor for points that are already daily and gap-free.
    pub fn from_points(points: Vec<PricePoint>) -> Result<Self, CryptosimError> {
        if points.is_empty() {
            return Err(CryptosimError::InsufficientData {
                reason: "empty price series".into(),
            });
        }
        for (i, point) in points.iter().enumerate() {
            if !(point.close.is_finite() && point.close > 0.0) {
                return Err(CryptosimError::invalid_parameter(
                    "close",
                    format!("non-positive close {} on {}", point.close, point.date),
                ));
            }
            if i > 0 && points[i - 1].date.checked_add_days(Days::new(1)) != Some(point.date) {
                return Err(CryptosimError::invalid_parameter(
                    "date",
                    format!(
                        "{} does not follow {} by exactly one day",
                        point.date,
                        points[i - 1].date
                    ),
                ));
            }
        }
        Ok(PriceSeries { points })
    }

    /// Keep only points strictly before `cutoff`.
    pub fn truncate_before(&self, cutoff: NaiveDate) -> Result<Self, CryptosimError> {
        let points: Vec<PricePoint> = self
            .points
            .iter()
            .copied()
            .take_while(|p| p.date < cutoff)
            .collect();
        if points.is_empty() {
            return Err(CryptosimError::InsufficientData {
                reason: format!("no observations before {cutoff}"),
            });
        }
        Ok(PriceSeries { points })
    }

    /// The last `n` points (the whole series if shorter).
    pub fn tail(&self, n: usize) -> Self {
        let n = n.max(1).min(self.points.len());
        PriceSeries {
            points: self.points[self.points.len() - n..].to_vec(),
        }
    }

    /// One midnight tick per point; normalizing these reproduces the series.
    pub fn to_ticks(&self) -> Vec<PriceTick> {
        self.points
            .iter()
            .map(|p| PriceTick::at_date(p.date, p.close))
            .collect()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.points[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.points[self.points.len() - 1].date
    }

    pub fn last_close(&self) -> f64 {
        self.points[self.points.len() - 1].close
    }
}
