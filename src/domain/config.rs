//! Simulation configuration and its validation.
//!
//! ```ini
//! [portfolio]
//! starting_capital = 10000
//! ; optional, 0.01 when absent
//! commission_rate = 0.01
//! ; optional, default to the first and last price dates
//! start_date = 2024-01-01
//! end_date = 2024-12-31
//!
//! [market]
//! data_dir = ./data
//! symbols = AAPL,MSFT
//!
//! [strategy]
//! ratio = 0.25
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::path::PathBuf;

use crate::domain::error::SimfolioError;
use crate::domain::money::Money;
use crate::domain::position::DEFAULT_COMMISSION_RATE;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub starting_capital: Money,
    pub commission_rate: Decimal,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub data_dir: PathBuf,
    pub symbols: Vec<String>,
    pub ratio: Decimal,
}

impl SimulationConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SimfolioError> {
        let starting_capital = required_decimal(config, "portfolio", "starting_capital")?;
        if starting_capital <= Decimal::ZERO {
            return Err(invalid(
                "portfolio",
                "starting_capital",
                "starting_capital must be positive",
            ));
        }

        let commission_rate = optional_decimal(config, "portfolio", "commission_rate")?
            .unwrap_or(DEFAULT_COMMISSION_RATE);
        if commission_rate < Decimal::ZERO || commission_rate >= Decimal::ONE {
            return Err(invalid(
                "portfolio",
                "commission_rate",
                "commission_rate must be between 0 and 1",
            ));
        }

        let start_date = optional_date(config, "start_date")?;
        let end_date = optional_date(config, "end_date")?;
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start >= end {
                return Err(invalid(
                    "portfolio",
                    "start_date",
                    "start_date must be before end_date",
                ));
            }
        }

        let data_dir = match config.get_string("market", "data_dir") {
            Some(s) if !s.trim().is_empty() => PathBuf::from(s.trim()),
            _ => {
                return Err(SimfolioError::ConfigMissing {
                    section: "market".into(),
                    key: "data_dir".into(),
                })
            }
        };

        let symbols = parse_symbols(&config.get_string("market", "symbols").unwrap_or_default());
        if symbols.is_empty() {
            return Err(SimfolioError::ConfigMissing {
                section: "market".into(),
                key: "symbols".into(),
            });
        }

        let ratio = required_decimal(config, "strategy", "ratio")?;
        if ratio.is_zero() || ratio.abs() > Decimal::ONE {
            return Err(invalid(
                "strategy",
                "ratio",
                "ratio must be non-zero and between -1 and 1",
            ));
        }

        Ok(SimulationConfig {
            starting_capital: Money::new(starting_capital),
            commission_rate,
            start_date,
            end_date,
            data_dir,
            symbols,
            ratio,
        })
    }
}

/// Split a comma-separated symbol list, dropping blanks and duplicates while
/// keeping the first-seen order.
pub fn parse_symbols(raw: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for symbol in raw.split(',').map(|s| s.trim().to_uppercase()) {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

fn invalid(section: &str, key: &str, reason: &str) -> SimfolioError {
    SimfolioError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn optional_decimal(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<Decimal>, SimfolioError> {
    match config.get_decimal(section, key) {
        None => Ok(None),
        Some(Ok(value)) => Ok(Some(value)),
        Some(Err(raw)) => Err(invalid(
            section,
            key,
            &format!("{:?} is not a decimal number", raw),
        )),
    }
}

fn required_decimal(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Decimal, SimfolioError> {
    optional_decimal(config, section, key)?.ok_or_else(|| SimfolioError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    })
}

fn optional_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, SimfolioError> {
    match config.get_string("portfolio", key) {
        Some(s) if !s.trim().is_empty() => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                invalid(
                    "portfolio",
                    key,
                    &format!("invalid {} format, expected YYYY-MM-DD", key),
                )
            }),
        _ => Ok(None),
    }
}
