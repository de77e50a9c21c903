//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
#[cfg(feature = "http")]
pub mod cryptocompare_adapter;
