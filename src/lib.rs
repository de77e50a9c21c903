//! cryptosim: crypto trading-bot simulator and price forecaster.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command-line surface in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
