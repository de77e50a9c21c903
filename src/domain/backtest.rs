//! Historical replay of the moving-average crossover strategy.
//!
//! One simulated tick per day: the snapshots are computed once over the whole
//! series and every Buy/Sell signal fills at that day's close.

use tracing::debug;

use crate::domain::error::CryptosimError;
use crate::domain::indicator::{self, IndicatorSnapshot};
use crate::domain::ledger::{self, Fill, LedgerState};
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::{self, Signal};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_balance: f64,
    pub short_window: usize,
    pub long_window: usize,
    pub order_quantity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub initial_balance: f64,
    pub ledger: LedgerState,
    pub fills: Vec<Fill>,
    pub snapshots: Vec<IndicatorSnapshot>,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub hold_signals: usize,
    pub final_close: f64,
    /// Ledger marked at the final close.
    pub final_equity: f64,
}

impl BacktestResult {
    pub fn total_return(&self) -> f64 {
        (self.final_equity - self.initial_balance) / self.initial_balance
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), CryptosimError> {
        if !(self.initial_balance.is_finite() && self.initial_balance > 0.0) {
            return Err(CryptosimError::invalid_parameter(
                "initial_balance",
                format!("must be positive, got {}", self.initial_balance),
            ));
        }
        if !(self.order_quantity.is_finite() && self.order_quantity > 0.0) {
            return Err(CryptosimError::invalid_parameter(
                "order_quantity",
                format!("must be positive, got {}", self.order_quantity),
            ));
        }
        indicator::validate_windows(self.short_window, self.long_window)
    }
}

pub fn run_backtest(
    series: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, CryptosimError> {
    config.validate()?;

    let snapshots = indicator::compute(series, config.short_window, config.long_window)?;
    let points = series.points();

    let mut state = LedgerState::new(config.initial_balance);
    let mut fills = Vec::new();
    let (mut buys, mut sells, mut holds) = (0, 0, 0);

    for (i, sig) in signal::scan(&snapshots) {
        match sig {
            Signal::Buy => buys += 1,
            Signal::Sell => sells += 1,
            Signal::Hold => holds += 1,
        }
        let Some(order_type) = sig.order_type() else {
            continue;
        };
        let point = points[i];
        state = ledger::execute_order(state, order_type, point.close, config.order_quantity)?;
        debug!(
            date = %point.date,
            price = point.close,
            cash = state.cash_balance,
            position = state.position_quantity,
            "{order_type} filled"
        );
        fills.push(Fill {
            date: point.date,
            order_type,
            price: point.close,
            quantity: config.order_quantity,
            state,
        });
    }

    let final_close = series.last_close();
    Ok(BacktestResult {
        initial_balance: config.initial_balance,
        ledger: state,
        fills,
        snapshots,
        buy_signals: buys,
        sell_signals: sells,
        hold_signals: holds,
        final_close,
        final_equity: state.equity(final_close),
    })
}
