//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = (C[i-n+1] + ... + C[i]) / n
//! Warmup: the first (n-1) points have no value.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::price_series::PriceSeries;

pub fn calculate_sma(series: &PriceSeries, period: usize) -> IndicatorSeries {
    let points = series.points();
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Sma(period),
            values: Vec::new(),
        };
    }

    let warmup = period - 1;
    let values = points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            // Summing the window directly keeps every value independent of
            // earlier ones, so reruns are bit-identical.
            let value = (i >= warmup).then(|| {
                points[i - warmup..=i].iter().map(|p| p.close).sum::<f64>() / period as f64
            });
            IndicatorPoint {
                date: point.date,
                value,
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
