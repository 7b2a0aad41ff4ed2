//! Integration tests for the portfolio accounting core.
//!
//! Tests cover:
//! - Affordability gate and cash movements on long/short opens
//! - Commission accrual on open and close
//! - Nett gain conventions for longs and shorts
//! - Ratio sizing, including the zero-ratio short circuit
//! - The AAPL walk-through: open, revalue, close
//! - Market failures propagating out of sizing operations
//! - Full replay through `simulation::run` with strategy hooks

mod common;

use common::*;
use simfolio::domain::error::SimfolioError;
use simfolio::domain::hooks::{RatioAllocation, StrategyHooks};
use simfolio::domain::money::Money;
use simfolio::domain::portfolio::Portfolio;
use simfolio::domain::position::PositionType;
use simfolio::domain::replay::{PriceTable, ReplayMarket};
use simfolio::domain::simulation;
use std::collections::HashMap;

mod opening {
    use super::*;

    #[test]
    fn unaffordable_long_changes_nothing() {
        let mut p = aapl_portfolio();
        assert!(!p.open_position_by_value("AAPL", money("10000.01")).unwrap());

        assert_eq!(p.cash(), money("10000"));
        assert_eq!(p.equity(), money("10000"));
        assert!(p.positions().is_empty());
    }

    #[test]
    fn long_open_debits_exact_value() {
        let mut p = aapl_portfolio();
        assert!(p.open_position_by_value("AAPL", money("2500")).unwrap());

        assert_eq!(p.cash(), money("7500"));
        assert_eq!(p.positions().len(), 1);
        assert_eq!(p.positions()[0].position_type(), PositionType::Long);
    }

    #[test]
    fn long_open_with_fractional_size() {
        let mut p = portfolio_with("10000", MockMarket::new().with_price("AAPL", "30"));
        assert!(p.open_position_by_value("AAPL", money("1000")).unwrap());

        assert_eq!(p.positions()[0].open_value(), money("1000"));
        assert_eq!(p.cash(), money("9000"));
    }

    #[test]
    fn short_open_credits_magnitude() {
        let mut p = aapl_portfolio();
        assert!(p.open_position_by_value("AAPL", money("-3000")).unwrap());

        assert_eq!(p.cash(), money("13000"));
        assert_eq!(p.positions().len(), 1);
        assert_eq!(p.positions()[0].position_type(), PositionType::Short);
        assert_eq!(p.positions()[0].size(), decimal("-30"));
    }

    #[test]
    fn positions_keep_insertion_order() {
        let mut p = portfolio_with(
            "10000",
            MockMarket::new()
                .with_price("AAPL", "100")
                .with_price("MSFT", "50"),
        );
        p.open_position_by_value("MSFT", money("500")).unwrap();
        p.open_position_by_value("AAPL", money("-500")).unwrap();
        p.open_position_by_size("MSFT", decimal("2")).unwrap();

        let symbols: Vec<&str> = p.positions().iter().map(|pos| pos.symbol()).collect();
        assert_eq!(symbols, vec!["MSFT", "AAPL", "MSFT"]);
    }

    #[test]
    fn open_by_size_negative_is_short() {
        let mut p = aapl_portfolio();
        assert!(p.open_position_by_size("AAPL", decimal("-4")).unwrap());
        assert!(p.positions()[0].is_short());
        assert_eq!(p.cash(), money("10400"));
    }

    #[test]
    fn ratio_zero_does_not_touch_market() {
        let mut p = aapl_portfolio();
        assert!(!p.open_position_by_ratio("AAPL", decimal("0")).unwrap());
        assert_eq!(p.market().lookups.get(), 0);
    }

    #[test]
    fn ratio_zero_for_unknown_symbol_is_still_false() {
        let mut p = aapl_portfolio();
        assert!(!p.open_position_by_ratio("NOPE", decimal("0")).unwrap());
    }

    #[test]
    fn ratio_long_then_ratio_uses_remaining_cash() {
        let mut p = aapl_portfolio();
        p.open_position_by_ratio("AAPL", decimal("0.5")).unwrap();
        p.open_position_by_ratio("AAPL", decimal("0.5")).unwrap();

        assert_eq!(p.positions()[0].open_value(), money("5000"));
        assert_eq!(p.positions()[1].open_value(), money("2500"));
        assert_eq!(p.cash(), money("2500"));
    }

    #[test]
    fn ratio_short_uses_untouched_margin() {
        let mut p = aapl_portfolio();
        p.open_position_by_ratio("AAPL", decimal("-0.2")).unwrap();
        p.open_position_by_ratio("AAPL", decimal("-0.2")).unwrap();

        assert_eq!(p.margin(), money("10000"));
        assert_eq!(p.positions()[0].open_value(), money("2000"));
        assert_eq!(p.positions()[1].open_value(), money("2000"));
        assert_eq!(p.cash(), money("14000"));
    }
}

mod market_failures {
    use super::*;

    #[test]
    fn data_error_propagates_from_value_open() {
        let mut p = portfolio_with("10000", MockMarket::new().with_error("AAPL", "feed down"));
        let result = p.open_position_by_value("AAPL", money("100"));
        assert!(matches!(result, Err(SimfolioError::Data { .. })));
        assert_eq!(p.cash(), money("10000"));
    }

    #[test]
    fn missing_price_propagates_from_size_open() {
        let mut p = aapl_portfolio();
        let result = p.open_position_by_size("MSFT", decimal("1"));
        assert!(matches!(result, Err(SimfolioError::PriceUnavailable { .. })));
    }

    #[test]
    fn zero_price_is_rejected() {
        let mut p = portfolio_with("10000", MockMarket::new().with_price("AAPL", "0"));
        let result = p.open_position_by_value("AAPL", money("100"));
        assert!(matches!(result, Err(SimfolioError::InvalidPrice { .. })));
        assert!(p.positions().is_empty());
    }

    #[test]
    fn missing_price_during_update_propagates() {
        let mut p = aapl_portfolio();
        p.open_position_by_value("AAPL", money("1000")).unwrap();
        p.market_mut().prices.clear();
        assert!(p.update().is_err());
    }
}

mod valuation {
    use super::*;

    #[test]
    fn aapl_walkthrough() {
        let mut p = aapl_portfolio();
        assert!(p.open_position_by_value("AAPL", money("1000")).unwrap());
        assert_eq!(p.cash(), money("9000"));

        let pos = &p.positions()[0];
        assert_eq!(pos.size(), decimal("10"));
        assert_eq!(pos.open_value(), money("1000"));
        assert_eq!(pos.open_commission(), money("10"));

        p.market_mut().set_price("AAPL", "110");
        p.update().unwrap();

        let pos = &p.positions()[0];
        assert_eq!(pos.current_value(), money("1100"));
        assert_eq!(pos.nett_gain(), money("90"));
        assert_eq!(p.equity(), money("1100"));
    }

    #[test]
    fn long_loss_includes_commission() {
        let mut p = aapl_portfolio();
        p.open_position_by_value("AAPL", money("1000")).unwrap();
        p.market_mut().set_price("AAPL", "95");
        p.update().unwrap();
        assert_eq!(p.positions()[0].nett_gain(), money("-60"));
    }

    #[test]
    fn short_gain_when_price_falls() {
        let mut p = aapl_portfolio();
        p.open_position_by_value("AAPL", money("-1000")).unwrap();
        p.market_mut().set_price("AAPL", "80");
        p.update().unwrap();

        let pos = &p.positions()[0];
        assert_eq!(pos.current_value(), money("800"));
        assert_eq!(pos.nett_gain(), money("190"));
    }

    #[test]
    fn close_accumulates_commission_once() {
        let mut p = aapl_portfolio();
        p.open_position_by_value("AAPL", money("1000")).unwrap();
        p.market_mut().set_price("AAPL", "120");

        let (close_value, nett_gain) = p.close_position(0).unwrap();
        assert_eq!(close_value, money("1200"));
        assert_eq!(nett_gain, money("178"));

        let pos = &p.positions()[0];
        assert_eq!(pos.close_commission(), money("12"));
        assert_eq!(
            pos.total_commission(),
            pos.open_commission() + pos.close_commission()
        );

        p.market_mut().set_price("AAPL", "200");
        assert!(matches!(
            p.close_position(0),
            Err(SimfolioError::PositionClosed { .. })
        ));
        p.update().unwrap();

        let pos = &p.positions()[0];
        assert_eq!(pos.total_commission(), money("22"));
        assert_eq!(pos.nett_gain(), money("178"));
        assert_eq!(pos.current_value(), money("1200"));
    }

    #[test]
    fn close_records_market_time() {
        let mut p = aapl_portfolio();
        p.open_position_by_value("AAPL", money("1000")).unwrap();
        p.market_mut().now = date(2024, 3, 1);
        p.close_position(0).unwrap();

        let pos = &p.positions()[0];
        assert_eq!(pos.open_time(), date(2024, 1, 2));
        assert_eq!(pos.close_time(), Some(date(2024, 3, 1)));
        assert_eq!(pos.holding_days(p.market()), 59);
    }
}

mod full_simulation {
    use super::*;

    fn replay(rows: &[(&str, &[(&str, &str)])]) -> ReplayMarket {
        let mut table = PriceTable::new();
        for (day, prices) in rows {
            let mut entry = HashMap::new();
            for (symbol, price) in *prices {
                entry.insert(symbol.to_string(), money(price));
            }
            table.insert(day.parse().unwrap(), entry);
        }
        ReplayMarket::new(table).unwrap()
    }

    #[test]
    fn long_and_short_allocation_realize_into_cash() {
        let market = replay(&[
            ("2024-01-02", &[("AAPL", "100"), ("MSFT", "200")]),
            ("2024-01-03", &[("AAPL", "90"), ("MSFT", "210")]),
            ("2024-01-04", &[("AAPL", "80"), ("MSFT", "220")]),
        ]);
        let hooks = RatioAllocation::new(vec!["AAPL".into(), "MSFT".into()], decimal("-0.1"));
        let mut p = Portfolio::new(money("10000"), None, None, market).with_hooks(Box::new(hooks));

        let summary = simulation::run(&mut p).unwrap();

        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.positions_opened, 2);
        assert_eq!(summary.positions_active, 0);
        // Both shorts are sized against the untouched margin: 1000 each.
        assert_eq!(p.positions()[0].nett_gain(), money("182"));
        assert_eq!(p.positions()[1].nett_gain(), money("-121"));
        assert_eq!(summary.cash, money("10000") + summary.total_nett_gain);
    }

    struct CloseOnThirdTick {
        ticks: usize,
    }

    impl StrategyHooks<ReplayMarket> for CloseOnThirdTick {
        fn execute(&mut self, p: &mut Portfolio<ReplayMarket>) -> Result<(), SimfolioError> {
            self.ticks += 1;
            match self.ticks {
                1 => p.open_position_by_value("AAPL", money("1000")).map(|_| ()),
                3 => p.close_position(0).map(|_| ()),
                _ => Ok(()),
            }
        }
    }

    #[test]
    fn custom_hook_drives_lifecycle() {
        let market = replay(&[
            ("2024-01-02", &[("AAPL", "100")]),
            ("2024-01-03", &[("AAPL", "105")]),
            ("2024-01-04", &[("AAPL", "110")]),
            ("2024-01-05", &[("AAPL", "150")]),
        ]);
        let mut p = Portfolio::new(money("10000"), None, None, market)
            .with_hooks(Box::new(CloseOnThirdTick { ticks: 0 }));

        let summary = simulation::run(&mut p).unwrap();

        let pos = &p.positions()[0];
        assert!(!pos.is_active());
        assert_eq!(pos.close_price(), Some(money("110")));
        assert_eq!(pos.nett_gain(), money("79"));
        assert_eq!(summary.equity, money("1100"));
        // No realization hook: cash only reflects the opening debit.
        assert_eq!(summary.cash, money("9000"));
    }

    struct RealizeOnClose {
        ticks: usize,
    }

    impl StrategyHooks<ReplayMarket> for RealizeOnClose {
        fn execute(&mut self, p: &mut Portfolio<ReplayMarket>) -> Result<(), SimfolioError> {
            self.ticks += 1;
            match self.ticks {
                1 => p.open_position_by_value("AAPL", money("1000")).map(|_| ()),
                3 => p.close_position(0).map(|_| ()),
                _ => Ok(()),
            }
        }

        fn process_close(
            &mut self,
            p: &mut Portfolio<ReplayMarket>,
            index: usize,
        ) -> Result<(), SimfolioError> {
            let pos = &p.positions()[index];
            let realized = pos.close_value().unwrap_or_default() - pos.total_commission();
            p.adjust_cash(realized)
        }
    }

    #[test]
    fn close_made_by_a_hook_is_realized_by_that_hook() {
        let market = replay(&[
            ("2024-01-02", &[("AAPL", "100")]),
            ("2024-01-03", &[("AAPL", "105")]),
            ("2024-01-04", &[("AAPL", "110")]),
            ("2024-01-05", &[("AAPL", "150")]),
        ]);
        let mut p = Portfolio::new(money("10000"), None, None, market)
            .with_hooks(Box::new(RealizeOnClose { ticks: 0 }));

        let summary = simulation::run(&mut p).unwrap();

        // 1100 returned at close, minus 10 + 11 commission.
        assert_eq!(p.positions()[0].nett_gain(), money("79"));
        assert_eq!(summary.cash, money("10079"));
        assert_eq!(summary.cash, money("10000") + summary.total_nett_gain);
    }

    #[test]
    fn summary_totals_match_positions() {
        let market = replay(&[("2024-01-02", &[("AAPL", "50")])]);
        let mut p = Portfolio::new(money("1000"), None, None, market);
        p.open_position_by_value("AAPL", money("500")).unwrap();

        let summary = simulation::run(&mut p).unwrap();

        assert_eq!(summary.total_commission, Money::from(5));
        assert_eq!(summary.total_nett_gain, Money::from(-5));
        assert_eq!(summary.margin, Money::from(1000));
    }
}
