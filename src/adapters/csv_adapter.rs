//! CSV file data adapter.
//!
//! One file per ticker, `<base_path>/<TICKER>.csv`, with a header row. Only
//! the `date` (`YYYY-MM-DD`) and `close` columns are read; header matching is
//! case-insensitive and every other column is ignored.

use crate::domain::error::MacrossError;
use crate::domain::price::PricePoint;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, MacrossError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| MacrossError::Data {
            reason: format!("missing {} column", name),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, MacrossError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => MacrossError::NoData {
                ticker: ticker.to_string(),
            },
            _ => MacrossError::Data {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| MacrossError::Data {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let date_col = column_index(headers, "date")?;
        let close_col = column_index(headers, "close")?;

        let mut prices = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| MacrossError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(date_col).ok_or_else(|| MacrossError::Data {
                reason: "missing date value".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                MacrossError::Data {
                    reason: format!("invalid date '{}': {}", date_str, e),
                }
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            let close: f64 = record
                .get(close_col)
                .ok_or_else(|| MacrossError::Data {
                    reason: format!("missing close value on {}", date),
                })?
                .trim()
                .parse()
                .map_err(|e| MacrossError::Data {
                    reason: format!("invalid close value on {}: {}", date, e),
                })?;

            prices.push(PricePoint { date, close });
        }

        prices.sort_by_key(|p| p.date);
        if let Some(pair) = prices.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(MacrossError::InvalidPriceSeries {
                reason: format!("duplicate date {} in {}", pair[0].date, path.display()),
            });
        }
        Ok(prices)
    }

    fn list_tickers(&self) -> Result<Vec<String>, MacrossError> {
        let mut tickers = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let path = entry.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                tickers.push(stem.to_string_lossy().into_owned());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}
