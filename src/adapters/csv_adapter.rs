//! CSV file data adapter.
//!
//! One file per instrument, `<CODE>.csv`, with a header row naming at least
//! `date,open,high,low,close`. Extra columns such as `volume` are ignored.

use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::domain::error::MeanrevError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl CsvAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{code}.csv"))
    }
}

/// Reads every bar in a price file, sorted by date.
pub fn read_price_file(path: &Path) -> Result<Vec<PriceBar>, MeanrevError> {
    let file = File::open(path)?;
    parse_bars(file, &path.display().to_string())
}

fn parse_bars<R: Read>(reader: R, source: &str) -> Result<Vec<PriceBar>, MeanrevError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();

    for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = result.map_err(|e| MeanrevError::Data {
            reason: format!("{source} row {}: {e}", line + 1),
        })?;
        bars.push(PriceBar::new(row.date, row.open, row.high, row.low, row.close));
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, MeanrevError> {
        let path = self.csv_path(code);
        let mut bars = match read_price_file(&path) {
            Ok(bars) => bars,
            Err(MeanrevError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MeanrevError::NoData { code: code.into() });
            }
            Err(e) => return Err(e),
        };

        bars.retain(|b| b.date >= start_date && b.date <= end_date);
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n";
        fs::write(path.join("BHP.csv"), csv_content).unwrap();
        fs::write(path.join("CBA.csv"), "date,open,high,low,close\n").unwrap();
        fs::write(
            path.join("BAD.csv"),
            "date,open,high,low,close\n2024-01-15,1.0,1.0,1.0,oops\n",
        )
        .unwrap();

        (dir, path)
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn fetch_bars_sorted_and_complete() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_bars("BHP", d(1), d(31)).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, d(15));
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[2].date, d(17));
    }

    #[test]
    fn fetch_bars_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_bars("BHP", d(16), d(16)).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, d(16));
    }

    #[test]
    fn header_only_file_is_empty() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(adapter.fetch_bars("CBA", d(1), d(31)).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_no_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_bars("XYZ", d(1), d(31)).unwrap_err();
        assert!(matches!(err, MeanrevError::NoData { code } if code == "XYZ"));
    }

    #[test]
    fn malformed_value_is_data_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_bars("BAD", d(1), d(31)).unwrap_err();
        assert!(matches!(err, MeanrevError::Data { .. }));
    }

    #[test]
    fn read_price_file_reads_all_rows() {
        let (_dir, path) = setup_test_data();
        let bars = read_price_file(&path.join("BHP.csv")).unwrap();
        assert_eq!(bars.len(), 3);
    }
}
