//! Seasonal ARIMA(p,d,q)(P,D,Q,s) estimation and forecasting.
//!
//! The series is made stationary with (1-B)^d (1-B^s)^D, the multiplicative
//! AR and MA polynomials are estimated by conditional sum of squares, and
//! forecasts are integrated back through the differencing polynomial.
//!
//! Polynomial conventions:
//!   AR: (1 - φ1 B - ... - φp B^p)(1 - Φ1 B^s - ... - ΦP B^Ps)
//!   MA: (1 + θ1 B + ... + θq B^q)(1 + Θ1 B^s + ... + ΘQ B^Qs)
//!
//! Each polynomial is parametrized through partial autocorrelations
//! (Durbin–Levinson), so every candidate the optimizer visits is stationary
//! and invertible.

use tracing::debug;

use super::nelder_mead::{self, NelderMeadConfig};
use super::{ModelOrder, SeasonalOrder};
use crate::domain::error::CryptosimError;

#[derive(Debug, Clone, PartialEq)]
pub struct FittedSarima {
    pub order: ModelOrder,
    pub seasonal_order: SeasonalOrder,
    pub ar: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
    /// Mean of the stationary series; zero whenever any differencing is applied.
    pub mean: f64,
    pub sigma2: f64,
    pub aic: f64,
    pub bic: f64,
    pub iterations: usize,
    /// Training observations on the original scale.
    history: Vec<f64>,
    /// CSS innovations aligned with the differenced series.
    residuals: Vec<f64>,
}

impl FittedSarima {
    pub fn fit(
        data: &[f64],
        order: ModelOrder,
        seasonal_order: SeasonalOrder,
    ) -> Result<Self, CryptosimError> {
        Self::fit_with(data, order, seasonal_order, &NelderMeadConfig::default())
    }

    pub fn fit_with(
        data: &[f64],
        order: ModelOrder,
        seasonal_order: SeasonalOrder,
        config: &NelderMeadConfig,
    ) -> Result<Self, CryptosimError> {
        if data.iter().any(|v| !v.is_finite()) {
            return Err(CryptosimError::ModelFit {
                reason: "training data contains non-finite values".into(),
            });
        }

        seasonal_order.validate()?;

        let delta = differencing_polynomial(order.d, seasonal_order.d, seasonal_order.s);
        let stationary = apply_differencing(data, &delta);

        let ar_lags = order.p + seasonal_order.p * seasonal_order.s;
        let layout = ParamLayout::new(order, seasonal_order);
        let n_params = layout.len();
        if stationary.len() <= ar_lags + n_params {
            return Err(CryptosimError::ModelFit {
                reason: format!(
                    "{} observations leave {} after differencing, need more than {}",
                    data.len(),
                    stationary.len(),
                    ar_lags + n_params
                ),
            });
        }

        let mean = if delta.len() == 1 {
            stationary.iter().sum::<f64>() / stationary.len() as f64
        } else {
            0.0
        };
        let centered: Vec<f64> = stationary.iter().map(|w| w - mean).collect();

        let objective = |raw: &[f64]| {
            let (ar_lag, ma_lag) = layout.lag_polynomials(raw);
            let residuals = css_residuals(&centered, &ar_lag, &ma_lag);
            let sse: f64 = residuals[ar_lags..].iter().map(|e| e * e).sum();
            sse / (centered.len() - ar_lags) as f64
        };

        let start = vec![0.0; n_params];
        let minimum = nelder_mead::minimize(objective, &start, config);
        if !minimum.converged {
            return Err(CryptosimError::ModelFit {
                reason: format!("optimizer did not converge in {} iterations", minimum.iterations),
            });
        }
        if !minimum.value.is_finite() {
            return Err(CryptosimError::ModelFit {
                reason: "conditional sum of squares is not finite".into(),
            });
        }

        let (ar, seasonal_ar, ma, seasonal_ma) = layout.split(&minimum.x);
        let (ar_lag, ma_lag) = layout.lag_polynomials(&minimum.x);
        let residuals = css_residuals(&centered, &ar_lag, &ma_lag);

        let n_eff = (centered.len() - ar_lags) as f64;
        let sigma2 = minimum.value;
        let k = (n_params + 1 + usize::from(delta.len() == 1)) as f64;
        let variance = sigma2.max(f64::MIN_POSITIVE);
        let log_likelihood =
            -0.5 * n_eff * (1.0 + (2.0 * std::f64::consts::PI * variance).ln());
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let bic = -2.0 * log_likelihood + k * n_eff.ln();

        debug!(
            iterations = minimum.iterations,
            sigma2, aic, "fitted SARIMA{}x{}", order, seasonal_order
        );

        Ok(FittedSarima {
            order,
            seasonal_order,
            ar,
            seasonal_ar,
            ma,
            seasonal_ma,
            mean,
            sigma2,
            aic,
            bic,
            iterations: minimum.iterations,
            history: data.to_vec(),
            residuals,
        })
    }

    /// Forecasts for the `horizon` periods following the training window.
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let delta =
            differencing_polynomial(self.order.d, self.seasonal_order.d, self.seasonal_order.s);
        let ar_lag = lag_coefficients(&self.ar, &self.seasonal_ar, self.seasonal_order.s, -1.0);
        let ma_lag = lag_coefficients(&self.ma, &self.seasonal_ma, self.seasonal_order.s, 1.0);

        let mut x: Vec<f64> = apply_differencing(&self.history, &delta)
            .iter()
            .map(|w| w - self.mean)
            .collect();
        let mut e = self.residuals.clone();
        let mut y = self.history.clone();
        let mut out = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let t = x.len();
            let mut next = 0.0;
            for (k, a) in ar_lag.iter().enumerate().skip(1) {
                if k <= t {
                    next += a * x[t - k];
                }
            }
            for (k, b) in ma_lag.iter().enumerate().skip(1) {
                if k <= t {
                    next += b * e[t - k];
                }
            }
            x.push(next);
            e.push(0.0);

            // y_t = w_t - sum_{k>=1} delta_k y_{t-k}
            let w = next + self.mean;
            let ty = y.len();
            let mut level = w;
            for (k, dk) in delta.iter().enumerate().skip(1) {
                level -= dk * y[ty - k];
            }
            y.push(level);
            out.push(level);
        }

        out
    }

    pub fn summary(&self) -> String {
        let mut s = format!("SARIMA{}x{} Model Summary\n", self.order, self.seasonal_order);
        s.push_str(&"=".repeat(40));
        s.push('\n');
        for (label, coeffs) in [
            ("ar.L", &self.ar),
            ("ar.S.L", &self.seasonal_ar),
            ("ma.L", &self.ma),
            ("ma.S.L", &self.seasonal_ma),
        ] {
            let step = if label.contains(".S.") { self.seasonal_order.s } else { 1 };
            for (i, c) in coeffs.iter().enumerate() {
                s.push_str(&format!("  {}{:<4} {:>12.6}\n", label, (i + 1) * step, c));
            }
        }
        if self.mean != 0.0 {
            s.push_str(&format!("  mean       {:>12.6}\n", self.mean));
        }
        s.push_str(&format!("Sigma²: {:.6}\n", self.sigma2));
        s.push_str(&format!("AIC: {:.2}\n", self.aic));
        s.push_str(&format!("BIC: {:.2}\n", self.bic));
        s
    }
}

/// Where each polynomial's parameters sit in the optimizer's vector.
struct ParamLayout {
    p: usize,
    big_p: usize,
    q: usize,
    big_q: usize,
    s: usize,
}

impl ParamLayout {
    fn new(order: ModelOrder, seasonal: SeasonalOrder) -> Self {
        ParamLayout {
            p: order.p,
            big_p: seasonal.p,
            q: order.q,
            big_q: seasonal.q,
            s: seasonal.s,
        }
    }

    fn len(&self) -> usize {
        self.p + self.big_p + self.q + self.big_q
    }

    fn split(&self, raw: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
        debug_assert_eq!(raw.len(), self.len());
        let (ar_raw, rest) = raw.split_at(self.p);
        let (sar_raw, rest) = rest.split_at(self.big_p);
        let (ma_raw, rest) = rest.split_at(self.q);
        let (sma_raw, _) = rest.split_at(self.big_q);
        (
            constrain_stationary(ar_raw),
            constrain_stationary(sar_raw),
            constrain_invertible(ma_raw),
            constrain_invertible(sma_raw),
        )
    }

    fn lag_polynomials(&self, raw: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let (ar, sar, ma, sma) = self.split(raw);
        (
            lag_coefficients(&ar, &sar, self.s, -1.0),
            lag_coefficients(&ma, &sma, self.s, 1.0),
        )
    }
}

/// Map unconstrained values to the coefficients of a stationary AR polynomial.
fn constrain_stationary(raw: &[f64]) -> Vec<f64> {
    let n = raw.len();
    if n == 0 {
        return Vec::new();
    }
    let r: Vec<f64> = raw.iter().map(|x| x / (1.0 + x * x).sqrt()).collect();
    let mut y = vec![vec![0.0; n]; n];
    for k in 0..n {
        for i in 0..k {
            y[k][i] = y[k - 1][i] + r[k] * y[k - 1][k - i - 1];
        }
        y[k][k] = r[k];
    }
    y[n - 1].iter().map(|v| -v).collect()
}

/// Coefficients of an invertible MA polynomial 1 + θ1 B + ...
fn constrain_invertible(raw: &[f64]) -> Vec<f64> {
    constrain_stationary(raw).into_iter().map(|v| -v).collect()
}

/// Expand the product of a non-seasonal and seasonal polynomial.
///
/// `sign` is -1 for AR polynomials and +1 for MA polynomials. The returned vector
/// holds the coefficient on lag k at index k as it appears on the right-hand side
/// of the recursion, so index 0 is always 1.
fn lag_coefficients(regular: &[f64], seasonal: &[f64], s: usize, sign: f64) -> Vec<f64> {
    let mut a = vec![1.0];
    a.extend(regular.iter().map(|c| sign * c));
    let mut b = vec![0.0; seasonal.len() * s + 1];
    b[0] = 1.0;
    for (j, c) in seasonal.iter().enumerate() {
        b[(j + 1) * s] = sign * c;
    }
    let product = poly_mul(&a, &b);
    // Move AR terms to the right-hand side: x_t = sum a_k x_{t-k} + ...
    product
        .into_iter()
        .enumerate()
        .map(|(k, c)| if k == 0 { 1.0 } else { sign * c })
        .collect()
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Coefficients of (1-B)^d (1-B^s)^D, index k holding the coefficient on B^k.
pub fn differencing_polynomial(d: usize, seasonal_d: usize, s: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = poly_mul(&poly, &[1.0, -1.0]);
    }
    if s > 0 {
        let mut seasonal = vec![0.0; s + 1];
        seasonal[0] = 1.0;
        seasonal[s] = -1.0;
        for _ in 0..seasonal_d {
            poly = poly_mul(&poly, &seasonal);
        }
    }
    poly
}

/// w_t = sum_k delta_k y_{t-k}, for every t with a full lag window.
pub fn apply_differencing(data: &[f64], delta: &[f64]) -> Vec<f64> {
    let lag = delta.len() - 1;
    if data.len() <= lag {
        return Vec::new();
    }
    (lag..data.len())
        .map(|t| delta.iter().enumerate().map(|(k, c)| c * data[t - k]).sum())
        .collect()
}

/// ARMA innovations with pre-sample innovations fixed at zero.
///
/// The first `ar_lag.len() - 1` residuals are conditioning values and stay zero.
fn css_residuals(x: &[f64], ar_lag: &[f64], ma_lag: &[f64]) -> Vec<f64> {
    let r = ar_lag.len() - 1;
    let mut e = vec![0.0; x.len()];
    for t in r..x.len() {
        let mut fitted = 0.0;
        for (k, a) in ar_lag.iter().enumerate().skip(1) {
            fitted += a * x[t - k];
        }
        for (k, b) in ma_lag.iter().enumerate().skip(1) {
            if k <= t {
                fitted += b * e[t - k];
            }
        }
        e[t] = x[t] - fitted;
    }
    e
}
