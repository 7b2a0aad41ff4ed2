//! Tick driver for a single simulation run.

use chrono::NaiveDate;
use log::info;

use super::error::SimfolioError;
use super::money::Money;
use super::portfolio::Portfolio;
use crate::ports::market_port::{MarketPort, SteppingMarket};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSummary {
    pub first_tick: Option<NaiveDate>,
    pub last_tick: Option<NaiveDate>,
    pub ticks: usize,
    pub cash: Money,
    pub equity: Money,
    pub margin: Money,
    pub positions_opened: usize,
    pub positions_active: usize,
    pub total_commission: Money,
    pub total_nett_gain: Money,
}

impl SimulationSummary {
    pub fn from_portfolio<M: MarketPort>(portfolio: &Portfolio<M>) -> Self {
        SimulationSummary {
            first_tick: None,
            last_tick: None,
            ticks: 0,
            cash: portfolio.cash(),
            equity: portfolio.equity(),
            margin: portfolio.margin(),
            positions_opened: portfolio.positions().len(),
            positions_active: portfolio.active_positions().count(),
            total_commission: portfolio
                .positions()
                .iter()
                .map(|p| p.total_commission())
                .sum(),
            total_nett_gain: portfolio.total_nett_gain(),
        }
    }
}

/// Drive `portfolio` through every market tick inside its start/end dates,
/// calling [`Portfolio::update`] once per tick, then
/// [`Portfolio::end_simulation`] after the last one.
pub fn run<M: SteppingMarket>(
    portfolio: &mut Portfolio<M>,
) -> Result<SimulationSummary, SimfolioError> {
    let (start, end) = (portfolio.start_date(), portfolio.end_date());
    let mut first_tick = None;
    let mut last_tick = None;
    let mut ticks = 0;

    loop {
        let now = portfolio.market().time_now();
        if now > end {
            break;
        }
        if now >= start {
            portfolio.update()?;
            first_tick.get_or_insert(now);
            last_tick = Some(now);
            ticks += 1;
        }
        if !portfolio.market_mut().advance() {
            break;
        }
    }

    portfolio.end_simulation()?;

    let summary = SimulationSummary {
        first_tick,
        last_tick,
        ticks,
        ..SimulationSummary::from_portfolio(portfolio)
    };
    info!(
        "simulation finished after {} ticks: cash {}, equity {}, nett gain {}",
        summary.ticks, summary.cash, summary.equity, summary.total_nett_gain
    );
    Ok(summary)
}
