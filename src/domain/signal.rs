//! Moving-average crossover signal detection.
//!
//! A signal is derived from two consecutive snapshots only; nothing carries over
//! between ticks. Equality on the current snapshot counts as crossed, so a tie
//! starts the new regime instead of holding.

use std::fmt;

use super::indicator::IndicatorSnapshot;
use super::ledger::OrderType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// The order a signal asks for, if any.
    pub fn order_type(self) -> Option<OrderType> {
        match self {
            Signal::Buy => Some(OrderType::Buy),
            Signal::Sell => Some(OrderType::Sell),
            Signal::Hold => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

pub fn classify(prev: &IndicatorSnapshot, curr: &IndicatorSnapshot) -> Signal {
    let (Some((prev_short, prev_long)), Some((curr_short, curr_long))) = (prev.pair(), curr.pair())
    else {
        return Signal::Hold;
    };

    if prev_short < prev_long && curr_short >= curr_long {
        Signal::Buy
    } else if prev_short > prev_long && curr_short <= curr_long {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

/// Signal for the most recent tick; `Hold` when fewer than two snapshots exist.
pub fn latest_signal(snapshots: &[IndicatorSnapshot]) -> Signal {
    match snapshots {
        [.., prev, curr] => classify(prev, curr),
        _ => Signal::Hold,
    }
}

/// Signal at every index from 1 onward, paired with that index.
pub fn scan(snapshots: &[IndicatorSnapshot]) -> Vec<(usize, Signal)> {
    snapshots
        .windows(2)
        .enumerate()
        .map(|(i, w)| (i + 1, classify(&w[0], &w[1])))
        .collect()
}
