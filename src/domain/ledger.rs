//! Simulated cash/position ledger.
//!
//! The ledger never refuses an order for lack of cash or position: negative
//! balances are a legitimate outcome of an under-capitalized strategy and are
//! reported as-is.

use chrono::NaiveDate;
use std::fmt;

use super::error::CryptosimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderType {
    Buy,
    Sell,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Buy => write!(f, "BUY"),
            OrderType::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerState {
    pub cash_balance: f64,
    pub position_quantity: f64,
}

impl LedgerState {
    pub fn new(initial_balance: f64) -> Self {
        LedgerState {
            cash_balance: initial_balance,
            position_quantity: 0.0,
        }
    }

    /// Cash plus the position marked at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.cash_balance + self.position_quantity * price
    }
}

/// One executed order and the ledger it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub date: NaiveDate,
    pub order_type: OrderType,
    pub price: f64,
    pub quantity: f64,
    pub state: LedgerState,
}

pub fn execute_order(
    state: LedgerState,
    order_type: OrderType,
    price: f64,
    quantity: f64,
) -> Result<LedgerState, CryptosimError> {
    if !(price.is_finite() && price > 0.0) {
        return Err(CryptosimError::InvalidOrder {
            reason: format!("price must be positive, got {price}"),
        });
    }
    if !(quantity.is_finite() && quantity > 0.0) {
        return Err(CryptosimError::InvalidOrder {
            reason: format!("quantity must be positive, got {quantity}"),
        });
    }

    let value = price * quantity;
    Ok(match order_type {
        OrderType::Buy => LedgerState {
            cash_balance: state.cash_balance - value,
            position_quantity: state.position_quantity + quantity,
        },
        OrderType::Sell => LedgerState {
            cash_balance: state.cash_balance + value,
            position_quantity: state.position_quantity - quantity,
        },
    })
}
