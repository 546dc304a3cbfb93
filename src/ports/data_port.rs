//! Price history access port.

use chrono::NaiveDate;

use crate::domain::error::MeanrevError;
use crate::domain::ohlcv::PriceBar;

pub trait DataPort {
    /// Bars for `code` with `start_date <= date <= end_date`, oldest first.
    fn fetch_bars(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, MeanrevError>;
}
