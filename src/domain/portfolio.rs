//! Portfolio cash, margin and equity accounting.

use chrono::NaiveDate;
use log::{debug, info};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

use super::error::SimfolioError;
use super::hooks::{NoHooks, StrategyHooks};
use super::money::{overflow, Money};
use super::position::{Position, PositionType, DEFAULT_COMMISSION_RATE};
use crate::ports::market_port::MarketPort;

/// Owns the positions of one simulation run together with its market handle
/// and strategy hooks.
///
/// `equity` is the sum of all positions' current values as of the last
/// [`update`](Portfolio::update); it does not include cash. `margin` starts at
/// the starting capital and is never adjusted.
///
/// Hooks are detached while one of them runs. Positions closed during that
/// time are queued and handed to `process_close` once the running hook
/// returns, so a strategy sees every close it makes.
pub struct Portfolio<M: MarketPort> {
    cash: Money,
    equity: Money,
    margin: Money,
    positions: Vec<Position>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    commission_rate: Decimal,
    market: M,
    hooks: Option<Box<dyn StrategyHooks<M>>>,
    pending_closes: VecDeque<usize>,
}

impl<M: MarketPort> Portfolio<M> {
    pub fn new(
        starting_capital: Money,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        market: M,
    ) -> Self {
        Portfolio {
            cash: starting_capital,
            equity: starting_capital,
            margin: starting_capital,
            positions: Vec::new(),
            start_date: start_date.unwrap_or_else(|| market.start_date()),
            end_date: end_date.unwrap_or_else(|| market.end_date()),
            commission_rate: DEFAULT_COMMISSION_RATE,
            market,
            hooks: Some(Box::new(NoHooks)),
            pending_closes: VecDeque::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: Box<dyn StrategyHooks<M>>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn with_commission_rate(mut self, commission_rate: Decimal) -> Self {
        self.commission_rate = commission_rate;
        self
    }

    /// Open a position worth `value` (negative for a short).
    ///
    /// Returns `Ok(false)` without touching any state when the portfolio
    /// cannot afford it. Market failures are returned as errors.
    pub fn open_position_by_value(
        &mut self,
        symbol: &str,
        value: Money,
    ) -> Result<bool, SimfolioError> {
        if !self.can_open(value) {
            debug!(
                "cannot open {} worth {} (cash {}, margin {})",
                symbol, value, self.cash, self.margin
            );
            return Ok(false);
        }
        let position =
            Position::open_by_value(symbol, value, self.commission_rate, &self.market)?;
        self.process_open(position)?;
        Ok(true)
    }

    /// Open `size` units (negative for a short) at the current price.
    pub fn open_position_by_size(
        &mut self,
        symbol: &str,
        size: Decimal,
    ) -> Result<bool, SimfolioError> {
        let current_price = self.market.current_price(symbol)?;
        let value = current_price
            .checked_mul(size)
            .ok_or_else(|| overflow("position value"))?;
        self.open_position_by_value(symbol, value)
    }

    /// Open a position sized as a fraction of capital: positive ratios size
    /// against cash, negative ratios against margin. A zero ratio is a no-op
    /// and does not consult the market.
    pub fn open_position_by_ratio(
        &mut self,
        symbol: &str,
        ratio: Decimal,
    ) -> Result<bool, SimfolioError> {
        let value = match ratio.cmp(&Decimal::ZERO) {
            Ordering::Greater => self.cash.checked_mul(ratio),
            Ordering::Less => self.margin.checked_mul(ratio),
            Ordering::Equal => return Ok(false),
        };
        let value = value.ok_or_else(|| overflow("position value"))?;
        self.open_position_by_value(symbol, value)
    }

    /// Longs need enough cash; shorts (and zero) are checked against margin.
    pub fn can_open(&self, value: Money) -> bool {
        if value.is_positive() {
            self.cash >= value
        } else {
            self.margin >= value
        }
    }

    /// Book a freshly opened position and take ownership of it.
    pub fn process_open(&mut self, position: Position) -> Result<(), SimfolioError> {
        let cash = match position.position_type() {
            PositionType::Long => self.cash.checked_sub(position.open_value()),
            PositionType::Short => self.cash.checked_add(position.open_value()),
        }
        .ok_or_else(|| overflow("cash"))?;
        let equity = self
            .equity
            .checked_add(position.nett_gain())
            .ok_or_else(|| overflow("equity"))?;

        self.cash = cash;
        self.equity = equity;
        self.positions.push(position);
        Ok(())
    }

    /// Revalue active positions, recompute equity, then run the strategy
    /// hooks in order: score, optimize, execute.
    ///
    /// All prices are fetched before any position changes, so a market
    /// failure leaves the portfolio as it was.
    pub fn update(&mut self) -> Result<(), SimfolioError> {
        let prices = self
            .positions
            .iter()
            .filter(|p| p.is_active())
            .map(|p| self.market.current_price(p.symbol()))
            .collect::<Result<Vec<_>, _>>()?;

        let revalued = self
            .positions
            .iter_mut()
            .filter(|p| p.is_active())
            .zip(prices)
            .try_for_each(|(position, price)| position.revalue(price).map(|_| ()));
        self.equity = self.positions_value()?;
        revalued?;

        self.run_hook(|hooks, portfolio| hooks.score_stock(portfolio))?;
        self.run_hook(|hooks, portfolio| hooks.optimizer(portfolio))?;
        self.run_hook(|hooks, portfolio| hooks.execute(portfolio))?;
        Ok(())
    }

    /// Close the position at `index` at the current price and hand it to the
    /// `process_close` hook. Returns `(close_value, nett_gain)`.
    pub fn close_position(&mut self, index: usize) -> Result<(Money, Money), SimfolioError> {
        let position = self
            .positions
            .get_mut(index)
            .ok_or(SimfolioError::PositionNotFound { index })?;
        let closed = position.close_position(&self.market)?;
        self.process_close(index)?;
        Ok(closed)
    }

    /// Hand the closed position at `index` to the `process_close` hook. If
    /// a hook is running, delivery waits until it returns.
    pub fn process_close(&mut self, index: usize) -> Result<(), SimfolioError> {
        self.pending_closes.push_back(index);
        self.deliver_closes()
    }

    pub fn end_simulation(&mut self) -> Result<(), SimfolioError> {
        info!(
            "ending simulation with {} positions ({} active)",
            self.positions.len(),
            self.active_positions().count()
        );
        self.run_hook(|hooks, portfolio| hooks.end_simulation(portfolio))
    }

    /// Move cash in or out, e.g. when a hook realizes a closed position.
    pub fn adjust_cash(&mut self, delta: Money) -> Result<(), SimfolioError> {
        debug!("cash {} adjusted by {}", self.cash, delta);
        self.cash = self
            .cash
            .checked_add(delta)
            .ok_or_else(|| overflow("cash"))?;
        Ok(())
    }

    fn positions_value(&self) -> Result<Money, SimfolioError> {
        self.positions
            .iter()
            .try_fold(Money::ZERO, |total, p| total.checked_add(p.current_value()))
            .ok_or_else(|| overflow("equity"))
    }

    /// Run `f` with the hooks detached. Calls made while detached skip the
    /// hooks, apart from closes, which are delivered afterwards.
    fn run_hook<F>(&mut self, f: F) -> Result<(), SimfolioError>
    where
        F: FnOnce(&mut dyn StrategyHooks<M>, &mut Self) -> Result<(), SimfolioError>,
    {
        let Some(mut hooks) = self.hooks.take() else {
            return Ok(());
        };
        let result = f(hooks.as_mut(), self);
        self.hooks = Some(hooks);
        let delivered = self.deliver_closes();
        result.and(delivered)
    }

    fn deliver_closes(&mut self) -> Result<(), SimfolioError> {
        let Some(mut hooks) = self.hooks.take() else {
            return Ok(());
        };
        let mut result = Ok(());
        while let Some(index) = self.pending_closes.pop_front() {
            result = hooks.process_close(self, index);
            if result.is_err() {
                break;
            }
        }
        self.hooks = Some(hooks);
        result
    }

    pub fn cash(&self) -> Money {
        self.cash
    }

    pub fn equity(&self) -> Money {
        self.equity
    }

    pub fn margin(&self) -> Money {
        self.margin
    }

    /// Cash plus equity.
    pub fn total_value(&self) -> Money {
        self.cash + self.equity
    }

    pub fn total_nett_gain(&self) -> Money {
        self.positions.iter().map(Position::nett_gain).sum()
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn position(&self, index: usize) -> Option<&Position> {
        self.positions.get(index)
    }

    pub fn active_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_active())
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn commission_rate(&self) -> Decimal {
        self.commission_rate
    }

    pub fn market(&self) -> &M {
        &self.market
    }

    pub fn market_mut(&mut self) -> &mut M {
        &mut self.market
    }
}

impl<M: MarketPort + fmt::Debug> fmt::Debug for Portfolio<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Portfolio")
            .field("cash", &self.cash)
            .field("equity", &self.equity)
            .field("margin", &self.margin)
            .field("positions", &self.positions)
            .field("start_date", &self.start_date)
            .field("end_date", &self.end_date)
            .field("commission_rate", &self.commission_rate)
            .field("market", &self.market)
            .field("pending_closes", &self.pending_closes)
            .finish_non_exhaustive()
    }
}
