//! Price data access port trait.

use crate::domain::error::MacrossError;
use crate::domain::price::PricePoint;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily closes for `ticker` between `start_date` and `end_date`
    /// inclusive, in ascending date order.
    fn fetch_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, MacrossError>;

    fn list_tickers(&self) -> Result<Vec<String>, MacrossError>;
}
