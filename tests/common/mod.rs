#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use simfolio::domain::error::SimfolioError;
use simfolio::domain::money::Money;
use simfolio::domain::portfolio::Portfolio;
use simfolio::ports::market_port::MarketPort;
use std::cell::Cell;
use std::collections::HashMap;
use std::str::FromStr;

/// Market with settable prices and clock that counts price lookups.
#[derive(Debug)]
pub struct MockMarket {
    pub prices: HashMap<String, Money>,
    pub errors: HashMap<String, String>,
    pub now: NaiveDate,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub lookups: Cell<usize>,
}

impl MockMarket {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            errors: HashMap::new(),
            now: date(2024, 1, 2),
            start: date(2024, 1, 1),
            end: date(2024, 12, 31),
            lookups: Cell::new(0),
        }
    }

    pub fn with_price(mut self, symbol: &str, price: &str) -> Self {
        self.set_price(symbol, price);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn set_price(&mut self, symbol: &str, price: &str) {
        self.prices.insert(symbol.to_string(), money(price));
    }
}

impl MarketPort for MockMarket {
    fn current_price(&self, symbol: &str) -> Result<Money, SimfolioError> {
        self.lookups.set(self.lookups.get() + 1);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(SimfolioError::Data {
                reason: reason.clone(),
            });
        }
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| SimfolioError::PriceUnavailable {
                symbol: symbol.to_string(),
                date: self.now,
            })
    }

    fn time_now(&self) -> NaiveDate {
        self.now
    }

    fn start_date(&self) -> NaiveDate {
        self.start
    }

    fn end_date(&self) -> NaiveDate {
        self.end
    }
}

pub fn money(s: &str) -> Money {
    Money::from_str(s).unwrap()
}

pub fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn portfolio_with(capital: &str, market: MockMarket) -> Portfolio<MockMarket> {
    Portfolio::new(money(capital), None, None, market)
}

pub fn aapl_portfolio() -> Portfolio<MockMarket> {
    portfolio_with("10000", MockMarket::new().with_price("AAPL", "100"))
}

pub fn write_price_csv(dir: &std::path::Path, symbol: &str, rows: &[(&str, &str)]) {
    let mut content = String::from("date,close\n");
    for (date, close) in rows {
        content.push_str(&format!("{date},{close}\n"));
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
}
