//! Position lifecycle and valuation.
//!
//! A [`Position`] is one trade: opened from a notional value against the
//! current market price, revalued each tick while active, and closed exactly
//! once. Values are unsigned, unrounded notionals (`price * |size|`);
//! direction is carried by the sign of `size` and by [`PositionType`].
//! Only commissions are rounded to cents.

use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;

use super::error::SimfolioError;
use super::money::{overflow, Money};
use crate::ports::market_port::MarketPort;

/// Fraction of value charged as commission at open and again at close.
pub const DEFAULT_COMMISSION_RATE: Decimal = dec!(0.01);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionType {
    Long,
    Short,
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionType::Long => write!(f, "long"),
            PositionType::Short => write!(f, "short"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    symbol: String,
    size: Decimal,
    position_type: PositionType,
    active: bool,
    commission_rate: Decimal,

    open_price: Money,
    open_value: Money,
    open_time: NaiveDate,
    open_commission: Money,

    current_price: Money,
    current_value: Money,

    close_price: Option<Money>,
    close_value: Option<Money>,
    close_time: Option<NaiveDate>,
    close_commission: Money,

    total_commission: Money,
    nett_gain: Money,
}

impl Position {
    /// Size a position from a signed notional `value` at the market's current
    /// price and open it. Positive values open longs, negative values shorts.
    ///
    /// The opening value is the requested notional itself, so the portfolio
    /// moves cash by exactly `|value|`.
    pub fn open_by_value(
        symbol: &str,
        value: Money,
        commission_rate: Decimal,
        market: &dyn MarketPort,
    ) -> Result<Position, SimfolioError> {
        let current_price = market.current_price(symbol)?;
        if !current_price.is_positive() {
            return Err(SimfolioError::InvalidPrice {
                symbol: symbol.to_string(),
                price: current_price,
            });
        }
        let size = value
            .checked_div(current_price)
            .ok_or_else(|| overflow("position size"))?;
        Position::open_at(
            symbol,
            size,
            current_price,
            value.abs(),
            commission_rate,
            market,
        )
    }

    /// Open `size` units of `symbol` at `open_price`, stamped with the
    /// market's current time. A zero size is rejected.
    pub fn open_position(
        symbol: &str,
        size: Decimal,
        open_price: Money,
        commission_rate: Decimal,
        market: &dyn MarketPort,
    ) -> Result<Position, SimfolioError> {
        let open_value = notional(open_price, size)?;
        Position::open_at(symbol, size, open_price, open_value, commission_rate, market)
    }

    fn open_at(
        symbol: &str,
        size: Decimal,
        open_price: Money,
        open_value: Money,
        commission_rate: Decimal,
        market: &dyn MarketPort,
    ) -> Result<Position, SimfolioError> {
        if size.is_zero() {
            return Err(SimfolioError::InvalidSize {
                symbol: symbol.to_string(),
            });
        }

        let position_type = if size > Decimal::ZERO {
            PositionType::Long
        } else {
            PositionType::Short
        };
        let open_commission = commission(open_value, commission_rate)?;

        let mut position = Position {
            symbol: symbol.to_string(),
            size,
            position_type,
            active: true,
            commission_rate,
            open_price,
            open_value,
            open_time: market.time_now(),
            open_commission,
            current_price: open_price,
            current_value: open_value,
            close_price: None,
            close_value: None,
            close_time: None,
            close_commission: Money::ZERO,
            total_commission: open_commission,
            nett_gain: Money::ZERO,
        };
        position.calculate_nett_gain()?;

        debug!(
            "opened {} {} x{} @ {} (value {}, commission {})",
            position.position_type,
            position.symbol,
            position.size,
            position.open_price,
            position.open_value,
            position.open_commission
        );
        Ok(position)
    }

    /// Close at the market's current price. Returns `(close_value, nett_gain)`.
    pub fn close_position(
        &mut self,
        market: &dyn MarketPort,
    ) -> Result<(Money, Money), SimfolioError> {
        if !self.active {
            return Err(SimfolioError::PositionClosed {
                symbol: self.symbol.clone(),
            });
        }

        let close_price = market.current_price(&self.symbol)?;
        let close_value = notional(close_price, self.size)?;
        let close_commission = commission(close_value, self.commission_rate)?;
        let total_commission = self
            .open_commission
            .checked_add(close_commission)
            .ok_or_else(|| overflow("total commission"))?;

        self.close_time = Some(market.time_now());
        self.close_price = Some(close_price);
        self.close_value = Some(close_value);
        self.current_price = close_price;
        self.current_value = close_value;
        self.close_commission = close_commission;
        self.total_commission = total_commission;
        self.active = false;
        self.calculate_nett_gain()?;

        debug!(
            "closed {} {} @ {} (value {}, nett gain {})",
            self.position_type, self.symbol, close_price, close_value, self.nett_gain
        );
        Ok((close_value, self.nett_gain))
    }

    /// Revalue at the market's current price and return the nett gain.
    /// Closed positions are frozen: the call leaves them untouched.
    pub fn update(&mut self, market: &dyn MarketPort) -> Result<Money, SimfolioError> {
        if !self.active {
            return Ok(self.nett_gain);
        }
        let price = market.current_price(&self.symbol)?;
        self.revalue(price)
    }

    /// Revalue at an already fetched `price`. No-op once closed.
    pub fn revalue(&mut self, price: Money) -> Result<Money, SimfolioError> {
        if !self.active {
            return Ok(self.nett_gain);
        }
        let current_value = notional(price, self.size)?;
        self.current_price = price;
        self.current_value = current_value;
        self.calculate_nett_gain()?;
        Ok(self.nett_gain)
    }

    fn calculate_nett_gain(&mut self) -> Result<(), SimfolioError> {
        let gross = match self.position_type {
            PositionType::Long => self.current_value.checked_sub(self.open_value),
            PositionType::Short => self.open_value.checked_sub(self.current_value),
        };
        self.nett_gain = gross
            .and_then(|gross| gross.checked_sub(self.total_commission))
            .ok_or_else(|| overflow("nett gain"))?;
        Ok(())
    }

    /// Price-based profit or loss before commission.
    pub fn gross_gain(&self) -> Money {
        match self.position_type {
            PositionType::Long => self.current_value - self.open_value,
            PositionType::Short => self.open_value - self.current_value,
        }
    }

    /// Days held, up to the close or to the market's current time.
    pub fn holding_days(&self, market: &dyn MarketPort) -> i64 {
        let end = self.close_time.unwrap_or_else(|| market.time_now());
        (end - self.open_time).num_days()
    }

    pub fn is_long(&self) -> bool {
        self.position_type == PositionType::Long
    }

    pub fn is_short(&self) -> bool {
        self.position_type == PositionType::Short
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn size(&self) -> Decimal {
        self.size
    }

    pub fn position_type(&self) -> PositionType {
        self.position_type
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn commission_rate(&self) -> Decimal {
        self.commission_rate
    }

    pub fn open_price(&self) -> Money {
        self.open_price
    }

    pub fn open_value(&self) -> Money {
        self.open_value
    }

    pub fn open_time(&self) -> NaiveDate {
        self.open_time
    }

    pub fn open_commission(&self) -> Money {
        self.open_commission
    }

    pub fn current_price(&self) -> Money {
        self.current_price
    }

    pub fn current_value(&self) -> Money {
        self.current_value
    }

    pub fn close_price(&self) -> Option<Money> {
        self.close_price
    }

    pub fn close_value(&self) -> Option<Money> {
        self.close_value
    }

    pub fn close_time(&self) -> Option<NaiveDate> {
        self.close_time
    }

    pub fn close_commission(&self) -> Money {
        self.close_commission
    }

    pub fn total_commission(&self) -> Money {
        self.total_commission
    }

    pub fn nett_gain(&self) -> Money {
        self.nett_gain
    }
}

/// `price * |size|`, unrounded.
fn notional(price: Money, size: Decimal) -> Result<Money, SimfolioError> {
    price
        .checked_mul(size.abs())
        .ok_or_else(|| overflow("position value"))
}

fn commission(value: Money, rate: Decimal) -> Result<Money, SimfolioError> {
    value
        .checked_mul(rate)
        .map(Money::round_cents)
        .ok_or_else(|| overflow("commission"))
}
