//! CSV price file adapter.
//!
//! Reads `<base_path>/<SYMBOL>.csv` files with at least a `date` and a
//! `close` column (any order, other columns ignored) into a [`ReplayMarket`].

use crate::domain::error::SimfolioError;
use crate::domain::money::Money;
use crate::domain::replay::{PriceTable, ReplayMarket};
use chrono::NaiveDate;
use log::{debug, info};
use std::fs;
use std::path::PathBuf;

pub struct CsvMarketAdapter {
    base_path: PathBuf,
}

impl CsvMarketAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Closing prices for `symbol` within the optional date bounds, sorted by
    /// date.
    pub fn fetch_closes(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<(NaiveDate, Money)>, SimfolioError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| SimfolioError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| SimfolioError::Data {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| SimfolioError::Data {
                    reason: format!("missing {} column in {}", name, path.display()),
                })
        };
        let date_col = column("date")?;
        let close_col = column("close")?;

        let mut closes = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| SimfolioError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(date_col).ok_or_else(|| SimfolioError::Data {
                reason: "missing date value".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                SimfolioError::Data {
                    reason: format!("invalid date format: {}", e),
                }
            })?;

            if start_date.is_some_and(|start| date < start)
                || end_date.is_some_and(|end| date > end)
            {
                continue;
            }

            let close: Money = record
                .get(close_col)
                .ok_or_else(|| SimfolioError::Data {
                    reason: "missing close value".into(),
                })?
                .parse()
                .map_err(|e| SimfolioError::Data {
                    reason: format!("invalid close value on {}: {}", date, e),
                })?;

            closes.push((date, close));
        }

        closes.sort_by_key(|(date, _)| *date);
        debug!("loaded {} closes for {}", closes.len(), symbol);
        Ok(closes)
    }

    /// Build a replay market from the closes of every symbol. A symbol with
    /// no rows in range is an error.
    pub fn load(
        &self,
        symbols: &[String],
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<ReplayMarket, SimfolioError> {
        let mut table = PriceTable::new();
        for symbol in symbols {
            let closes = self.fetch_closes(symbol, start_date, end_date)?;
            if closes.is_empty() {
                return Err(SimfolioError::NoData {
                    symbol: symbol.clone(),
                });
            }
            for (date, close) in closes {
                table.entry(date).or_default().insert(symbol.clone(), close);
            }
        }
        info!(
            "loaded {} symbols over {} dates from {}",
            symbols.len(),
            table.len(),
            self.base_path.display()
        );
        ReplayMarket::new(table)
    }
}
