//! In-memory market that replays a date-indexed price table.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use super::error::SimfolioError;
use super::money::Money;
use crate::ports::market_port::{MarketPort, SteppingMarket};

/// Prices per symbol, keyed by trading date.
pub type PriceTable = BTreeMap<NaiveDate, HashMap<String, Money>>;

#[derive(Debug, Clone)]
pub struct ReplayMarket {
    prices: PriceTable,
    dates: Vec<NaiveDate>,
    cursor: usize,
}

impl ReplayMarket {
    /// The clock starts on the earliest date. An empty table is rejected.
    pub fn new(prices: PriceTable) -> Result<Self, SimfolioError> {
        if prices.is_empty() {
            return Err(SimfolioError::Data {
                reason: "price table is empty".into(),
            });
        }
        let dates = prices.keys().copied().collect();
        Ok(ReplayMarket {
            prices,
            dates,
            cursor: 0,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn is_finished(&self) -> bool {
        self.cursor + 1 >= self.dates.len()
    }
}

impl MarketPort for ReplayMarket {
    fn current_price(&self, symbol: &str) -> Result<Money, SimfolioError> {
        let date = self.time_now();
        self.prices
            .get(&date)
            .and_then(|day| day.get(symbol))
            .copied()
            .ok_or_else(|| SimfolioError::PriceUnavailable {
                symbol: symbol.to_string(),
                date,
            })
    }

    fn time_now(&self) -> NaiveDate {
        self.dates[self.cursor]
    }

    fn start_date(&self) -> NaiveDate {
        self.dates[0]
    }

    fn end_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }
}

impl SteppingMarket for ReplayMarket {
    fn advance(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.cursor += 1;
        true
    }
}
