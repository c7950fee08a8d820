//! Portfolio state and equity tracking.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::error::MacrossError;
use super::position::{Position, TradeAction, TradeRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub cash: f64,
    pub position_value: f64,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_cash: f64,
    pub positions: HashMap<String, Position>,
    pub ledger: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_cash: f64) -> Self {
        Portfolio {
            cash: initial_cash,
            initial_cash,
            positions: HashMap::new(),
            ledger: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn get_position(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(ticker)
    }

    pub fn has_position(&self, ticker: &str) -> bool {
        self.positions.contains_key(ticker)
    }

    /// Spends `allocation` of the available cash on `ticker` at `price`.
    pub fn buy(
        &mut self,
        ticker: &str,
        date: NaiveDate,
        price: f64,
        allocation: f64,
    ) -> Result<&TradeRecord, MacrossError> {
        if self.has_position(ticker) {
            return Err(MacrossError::PositionAlreadyOpen {
                ticker: ticker.to_string(),
                date,
            });
        }

        let budget = self.cash * allocation;
        let shares = budget / price;
        self.cash = (self.cash - budget).max(0.0);

        self.positions.insert(
            ticker.to_string(),
            Position {
                ticker: ticker.to_string(),
                shares,
                entry_date: date,
                entry_price: price,
            },
        );
        Ok(self.append(TradeRecord {
            date,
            ticker: ticker.to_string(),
            action: TradeAction::Buy,
            shares,
            price,
            realized_pnl: None,
        }))
    }

    /// Liquidates the whole position in `ticker` at `price`.
    pub fn sell(
        &mut self,
        ticker: &str,
        date: NaiveDate,
        price: f64,
    ) -> Result<&TradeRecord, MacrossError> {
        let position = self
            .positions
            .remove(ticker)
            .ok_or_else(|| MacrossError::NoPositionToSell {
                ticker: ticker.to_string(),
                date,
            })?;

        self.cash += position.market_value(price);
        Ok(self.append(TradeRecord {
            date,
            ticker: ticker.to_string(),
            action: TradeAction::Sell,
            shares: position.shares,
            price,
            realized_pnl: Some(position.unrealized_pnl(price)),
        }))
    }

    fn append(&mut self, record: TradeRecord) -> &TradeRecord {
        self.ledger.push(record);
        &self.ledger[self.ledger.len() - 1]
    }

    /// Marks open positions to `price_map`. Positions without a price count as zero.
    pub fn position_value(&self, price_map: &HashMap<String, f64>) -> f64 {
        self.positions
            .values()
            .filter_map(|pos| {
                price_map
                    .get(&pos.ticker)
                    .map(|&price| pos.market_value(price))
            })
            .sum()
    }

    pub fn record_equity(&mut self, date: NaiveDate, price_map: &HashMap<String, f64>) {
        let position_value = self.position_value(price_map);
        self.equity_curve.push(EquityPoint {
            date,
            cash: self.cash,
            position_value,
            equity: self.cash + position_value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn prices(ticker: &str, price: f64) -> HashMap<String, f64> {
        HashMap::from([(ticker.to_string(), price)])
    }

    #[test]
    fn new_portfolio() {
        let portfolio = Portfolio::new(100000.0);
        assert_relative_eq!(portfolio.cash, 100000.0);
        assert_relative_eq!(portfolio.initial_cash, 100000.0);
        assert!(portfolio.positions.is_empty());
        assert!(portfolio.ledger.is_empty());
        assert!(portfolio.equity_curve.is_empty());
    }

    #[test]
    fn buy_spends_allocation_of_cash() {
        let mut portfolio = Portfolio::new(10000.0);
        let trade = portfolio.buy("SPY", date(2), 50.0, 0.5).unwrap().clone();

        assert_eq!(trade.action, TradeAction::Buy);
        assert_relative_eq!(trade.shares, 100.0);
        assert_eq!(trade.realized_pnl, None);
        assert_relative_eq!(portfolio.cash, 5000.0);
        assert!(portfolio.has_position("SPY"));
    }

    #[test]
    fn full_allocation_leaves_no_cash() {
        let mut portfolio = Portfolio::new(1000.0);
        portfolio.buy("SPY", date(2), 3.0, 1.0).unwrap();
        assert_eq!(portfolio.cash, 0.0);
        assert_relative_eq!(portfolio.get_position("SPY").unwrap().shares, 1000.0 / 3.0);
    }

    #[test]
    fn buy_twice_is_rejected() {
        let mut portfolio = Portfolio::new(1000.0);
        portfolio.buy("SPY", date(2), 10.0, 0.5).unwrap();
        let err = portfolio.buy("SPY", date(3), 10.0, 0.5).unwrap_err();
        assert!(matches!(err, MacrossError::PositionAlreadyOpen { .. }));
        assert_eq!(portfolio.ledger.len(), 1);
    }

    #[test]
    fn sell_realizes_pnl() {
        let mut portfolio = Portfolio::new(1000.0);
        portfolio.buy("SPY", date(2), 10.0, 1.0).unwrap();
        let trade = portfolio.sell("SPY", date(5), 12.0).unwrap().clone();

        assert_eq!(trade.action, TradeAction::Sell);
        assert_relative_eq!(trade.shares, 100.0);
        assert_relative_eq!(trade.realized_pnl.unwrap(), 200.0);
        assert_relative_eq!(portfolio.cash, 1200.0);
        assert!(!portfolio.has_position("SPY"));
    }

    #[test]
    fn sell_without_position() {
        let mut portfolio = Portfolio::new(1000.0);
        let err = portfolio.sell("SPY", date(2), 10.0).unwrap_err();
        assert!(matches!(err, MacrossError::NoPositionToSell { .. }));
        assert!(portfolio.ledger.is_empty());
    }

    #[test]
    fn record_equity_splits_cash_and_positions() {
        let mut portfolio = Portfolio::new(1000.0);
        portfolio.buy("SPY", date(2), 10.0, 0.4).unwrap();
        portfolio.record_equity(date(3), &prices("SPY", 15.0));

        let point = &portfolio.equity_curve[0];
        assert_eq!(point.date, date(3));
        assert_relative_eq!(point.cash, 600.0);
        assert_relative_eq!(point.position_value, 600.0);
        assert_relative_eq!(point.equity, point.cash + point.position_value);
    }

    #[test]
    fn empty_portfolio_is_all_cash() {
        let mut portfolio = Portfolio::new(100000.0);
        portfolio.record_equity(date(2), &HashMap::new());
        assert_relative_eq!(portfolio.equity_curve[0].equity, 100000.0);
        assert_relative_eq!(portfolio.equity_curve[0].position_value, 0.0);
    }

    #[test]
    fn unpriced_position_is_not_marked() {
        let mut portfolio = Portfolio::new(1000.0);
        portfolio.buy("SPY", date(2), 10.0, 0.5).unwrap();
        assert_relative_eq!(portfolio.position_value(&prices("QQQ", 99.0)), 0.0);
    }
}
