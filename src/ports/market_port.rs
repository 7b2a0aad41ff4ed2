//! Market collaborator port.

use crate::domain::error::SimfolioError;
use crate::domain::money::Money;
use chrono::NaiveDate;

/// Price feed and simulation clock consulted by portfolios and positions.
///
/// Implementations must fail rather than default when a price is missing.
pub trait MarketPort {
    fn current_price(&self, symbol: &str) -> Result<Money, SimfolioError>;

    fn time_now(&self) -> NaiveDate;

    fn start_date(&self) -> NaiveDate;

    fn end_date(&self) -> NaiveDate;
}

/// A market whose clock can be moved forward one tick at a time.
pub trait SteppingMarket: MarketPort {
    /// Move to the next tick. Returns `false` once there is no next tick.
    fn advance(&mut self) -> bool;
}
