//! Price data source port.

use crate::domain::error::CryptosimError;
use crate::domain::tick::{PriceTick, TradingPair};

pub trait DataPort {
    /// Up to `limit` of the most recent daily ticks for `pair`, oldest first.
    fn fetch_daily_ticks(
        &self,
        pair: &TradingPair,
        limit: usize,
    ) -> Result<Vec<PriceTick>, CryptosimError>;
}
