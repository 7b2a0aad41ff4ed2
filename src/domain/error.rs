//! Domain error types.

use chrono::NaiveDate;

use super::money::Money;

/// Top-level error type for simfolio.
#[derive(Debug, thiserror::Error)]
pub enum SimfolioError {
    #[error("no price for {symbol} on {date}")]
    PriceUnavailable { symbol: String, date: NaiveDate },

    #[error("invalid price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: Money },

    #[error("cannot open a zero-size position in {symbol}")]
    InvalidSize { symbol: String },

    #[error("position in {symbol} is already closed")]
    PositionClosed { symbol: String },

    #[error("no position at index {index}")]
    PositionNotFound { index: usize },

    #[error("invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SimfolioError> for std::process::ExitCode {
    fn from(err: &SimfolioError) -> Self {
        let code: u8 = match err {
            SimfolioError::Io(_) => 1,
            SimfolioError::ConfigParse { .. }
            | SimfolioError::ConfigMissing { .. }
            | SimfolioError::ConfigInvalid { .. } => 2,
            SimfolioError::NoData { .. } | SimfolioError::Data { .. } => 3,
            SimfolioError::PriceUnavailable { .. } | SimfolioError::InvalidPrice { .. } => 4,
            SimfolioError::InvalidSize { .. }
            | SimfolioError::PositionClosed { .. }
            | SimfolioError::PositionNotFound { .. }
            | SimfolioError::InvalidAmount { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
