//! Core domain types and logic.

pub mod tick;
pub mod price_series;
pub mod indicator;
pub mod signal;
pub mod ledger;
pub mod forecast;
pub mod bot;
pub mod backtest;
pub mod config_validation;
pub mod error;
