//! Point-in-time price forecasting with a seasonal ARIMA model.
//!
//! The engine refuses training data dated on or after the target date; callers
//! build the training window with [`ForecastRequest::point_in_time`].

pub mod nelder_mead;
pub mod sarima;

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::CryptosimError;
use crate::domain::price_series::PriceSeries;

pub use sarima::FittedSarima;

/// Non-seasonal order (p, d, q).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

/// Seasonal order (P, D, Q, s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub s: usize,
}

impl Default for ModelOrder {
    fn default() -> Self {
        ModelOrder { p: 1, d: 1, q: 1 }
    }
}

/// Daily data with weekly seasonality.
impl Default for SeasonalOrder {
    fn default() -> Self {
        SeasonalOrder {
            p: 1,
            d: 1,
            q: 1,
            s: 7,
        }
    }
}

impl SeasonalOrder {
    pub fn none() -> Self {
        SeasonalOrder {
            p: 0,
            d: 0,
            q: 0,
            s: 0,
        }
    }

    pub fn has_terms(&self) -> bool {
        self.p + self.d + self.q > 0
    }

    pub fn validate(&self) -> Result<(), CryptosimError> {
        if self.has_terms() && self.s < 2 {
            return Err(CryptosimError::invalid_parameter(
                "seasonal_order",
                format!("seasonal period must be at least 2, got {}", self.s),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

impl fmt::Display for SeasonalOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{},{})", self.p, self.d, self.q, self.s)
    }
}

fn parse_tuple<const N: usize>(s: &str, name: &str) -> Result<[usize; N], CryptosimError> {
    let parts: Vec<&str> = s
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(str::trim)
        .collect();
    if parts.len() != N {
        return Err(CryptosimError::invalid_parameter(
            name,
            format!("expected {N} comma-separated integers, got '{s}'"),
        ));
    }
    let mut out = [0usize; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse().map_err(|_| {
            CryptosimError::invalid_parameter(name, format!("'{part}' is not a non-negative integer"))
        })?;
    }
    Ok(out)
}

impl FromStr for ModelOrder {
    type Err = CryptosimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [p, d, q] = parse_tuple::<3>(s, "order")?;
        Ok(ModelOrder { p, d, q })
    }
}

impl FromStr for SeasonalOrder {
    type Err = CryptosimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [p, d, q, period] = parse_tuple::<4>(s, "seasonal_order")?;
        Ok(SeasonalOrder { p, d, q, s: period })
    }
}

/// Smallest training window the model accepts:
/// max(p, q) + s * (P + D + Q) + 1.
pub fn min_observations(order: ModelOrder, seasonal: SeasonalOrder) -> usize {
    order.p.max(order.q) + seasonal.s * (seasonal.p + seasonal.d + seasonal.q) + 1
}

/// Model settings for a forecast run, as read from the `[forecast]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastConfig {
    pub order: ModelOrder,
    pub seasonal_order: SeasonalOrder,
    pub horizon: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            order: ModelOrder::default(),
            seasonal_order: SeasonalOrder::default(),
            horizon: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    pub training: PriceSeries,
    pub order: ModelOrder,
    pub seasonal_order: SeasonalOrder,
    pub target_date: NaiveDate,
    pub horizon: usize,
}

impl ForecastRequest {
    /// Truncate `history` to the observations strictly before `target_date`.
    pub fn point_in_time(
        history: &PriceSeries,
        target_date: NaiveDate,
        order: ModelOrder,
        seasonal_order: SeasonalOrder,
    ) -> Result<Self, CryptosimError> {
        Ok(ForecastRequest {
            training: history.truncate_before(target_date)?,
            order,
            seasonal_order,
            target_date,
            horizon: 1,
        })
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    pub predicted_price: f64,
    pub target_date: NaiveDate,
    /// All `horizon` step-ahead forecasts; the first equals `predicted_price`.
    pub path: Vec<f64>,
}

pub fn forecast(request: &ForecastRequest) -> Result<ForecastResult, CryptosimError> {
    let training = &request.training;

    if let Some(leak) = training
        .points()
        .iter()
        .find(|p| p.date >= request.target_date)
    {
        return Err(CryptosimError::Lookahead {
            observed: leak.date,
            target: request.target_date,
        });
    }
    if request.horizon == 0 {
        return Err(CryptosimError::invalid_parameter(
            "horizon",
            "horizon must be at least 1",
        ));
    }
    request.seasonal_order.validate()?;

    let required = min_observations(request.order, request.seasonal_order);
    if training.len() < required {
        return Err(CryptosimError::ModelFit {
            reason: format!(
                "{} observations, SARIMA{}x{} needs at least {}",
                training.len(),
                request.order,
                request.seasonal_order,
                required
            ),
        });
    }

    let model = FittedSarima::fit(&training.closes(), request.order, request.seasonal_order)?;
    let path = model.forecast(request.horizon);
    let predicted_price = path[0];
    if !predicted_price.is_finite() {
        return Err(CryptosimError::ModelFit {
            reason: "forecast is not finite".into(),
        });
    }

    Ok(ForecastResult {
        predicted_price,
        target_date: request.target_date,
        path,
    })
}

/// Convenience wrapper over [`forecast`] for a single call site.
pub fn forecast_price(
    training: &PriceSeries,
    order: ModelOrder,
    seasonal_order: SeasonalOrder,
    target_date: NaiveDate,
    horizon: usize,
) -> Result<ForecastResult, CryptosimError> {
    forecast(&ForecastRequest {
        training: training.clone(),
        order,
        seasonal_order,
        target_date,
        horizon,
    })
}
