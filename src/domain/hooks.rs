//! Strategy extension points invoked by the portfolio.
//!
//! A portfolio runs `score_stock`, `optimizer` and `execute` at the end of
//! every [`Portfolio::update`], `process_close` after each close, and
//! `end_simulation` once at the end of a run. Every hook defaults to a no-op.

use log::{info, warn};
use rust_decimal::Decimal;

use super::error::SimfolioError;
use super::money::overflow;
use super::portfolio::Portfolio;
use super::position::PositionType;
use crate::ports::market_port::MarketPort;

pub trait StrategyHooks<M: MarketPort> {
    fn score_stock(&mut self, _portfolio: &mut Portfolio<M>) -> Result<(), SimfolioError> {
        Ok(())
    }

    fn optimizer(&mut self, _portfolio: &mut Portfolio<M>) -> Result<(), SimfolioError> {
        Ok(())
    }

    fn execute(&mut self, _portfolio: &mut Portfolio<M>) -> Result<(), SimfolioError> {
        Ok(())
    }

    /// Called after the position at `index` has been closed.
    fn process_close(
        &mut self,
        _portfolio: &mut Portfolio<M>,
        _index: usize,
    ) -> Result<(), SimfolioError> {
        Ok(())
    }

    fn end_simulation(&mut self, _portfolio: &mut Portfolio<M>) -> Result<(), SimfolioError> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl<M: MarketPort> StrategyHooks<M> for NoHooks {}

/// Allocate a fixed ratio of capital to each symbol on the first tick, hold,
/// and close everything at the end of the run.
///
/// Closing realizes the trade into cash: a long returns its close value, a
/// short pays its close value to cover, and both pay their total commission.
/// Over a full run the portfolio's cash therefore moves by exactly the sum of
/// the positions' nett gains.
#[derive(Debug, Clone)]
pub struct RatioAllocation {
    symbols: Vec<String>,
    ratio: Decimal,
    allocated: bool,
}

impl RatioAllocation {
    pub fn new(symbols: Vec<String>, ratio: Decimal) -> Self {
        RatioAllocation {
            symbols,
            ratio,
            allocated: false,
        }
    }
}

impl<M: MarketPort> StrategyHooks<M> for RatioAllocation {
    fn execute(&mut self, portfolio: &mut Portfolio<M>) -> Result<(), SimfolioError> {
        if self.allocated {
            return Ok(());
        }
        self.allocated = true;

        for symbol in &self.symbols {
            if portfolio.open_position_by_ratio(symbol, self.ratio)? {
                info!("allocated {} of capital to {}", self.ratio, symbol);
            } else {
                warn!("could not allocate {} of capital to {}", self.ratio, symbol);
            }
        }
        Ok(())
    }

    fn process_close(
        &mut self,
        portfolio: &mut Portfolio<M>,
        index: usize,
    ) -> Result<(), SimfolioError> {
        let position = portfolio
            .position(index)
            .ok_or(SimfolioError::PositionNotFound { index })?;
        let Some(close_value) = position.close_value() else {
            return Ok(());
        };

        let settlement = match position.position_type() {
            PositionType::Long => close_value,
            PositionType::Short => -close_value,
        };
        let realized = settlement
            .checked_sub(position.total_commission())
            .ok_or_else(|| overflow("realized cash"))?;
        portfolio.adjust_cash(realized)
    }

    fn end_simulation(&mut self, portfolio: &mut Portfolio<M>) -> Result<(), SimfolioError> {
        let open: Vec<usize> = portfolio
            .positions()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_active())
            .map(|(i, _)| i)
            .collect();

        for index in open {
            portfolio.close_position(index)?;
        }
        Ok(())
    }
}
