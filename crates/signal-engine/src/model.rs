//! Price bar model and input validation

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StockError};

/// One daily OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    /// Create a new bar
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    fn check(&self, index: usize) -> Result<()> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (field, value) in prices {
            if !value.is_finite() || value <= 0.0 {
                return Err(StockError::MalformedInput(format!(
                    "bar {index} ({}): {field} must be a positive finite price, got {value}",
                    self.date
                )));
            }
        }

        if self.high < self.low {
            return Err(StockError::MalformedInput(format!(
                "bar {index} ({}): high {} is below low {}",
                self.date, self.high, self.low
            )));
        }

        Ok(())
    }
}

impl ta::Open for PriceBar {
    fn open(&self) -> f64 {
        self.open
    }
}

impl ta::High for PriceBar {
    fn high(&self) -> f64 {
        self.high
    }
}

impl ta::Low for PriceBar {
    fn low(&self) -> f64 {
        self.low
    }
}

impl ta::Close for PriceBar {
    fn close(&self) -> f64 {
        self.close
    }
}

impl ta::Volume for PriceBar {
    fn volume(&self) -> f64 {
        self.volume as f64
    }
}

/// A validated, chronologically ordered, non-empty sequence of bars
///
/// Every constructor rejects malformed input up front so indicator code can
/// assume positive finite prices and strictly increasing dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Validate and wrap a bar sequence
    pub fn new(bars: Vec<PriceBar>) -> Result<Self> {
        if bars.is_empty() {
            return Err(StockError::MalformedInput("no price bars".to_string()));
        }

        for (i, bar) in bars.iter().enumerate() {
            bar.check(i)?;
        }

        if let Some(i) = bars.windows(2).position(|w| w[1].date <= w[0].date) {
            return Err(StockError::MalformedInput(format!(
                "dates are not strictly increasing at bar {}: {} follows {}",
                i + 1,
                bars[i + 1].date,
                bars[i].date
            )));
        }

        Ok(Self { bars })
    }

    /// Build a series from parallel columns, rejecting mismatched lengths
    pub fn from_columns(
        dates: &[NaiveDate],
        open: &[f64],
        high: &[f64],
        low: &[f64],
        close: &[f64],
        volume: &[u64],
    ) -> Result<Self> {
        let n = dates.len();
        let lengths = [
            ("open", open.len()),
            ("high", high.len()),
            ("low", low.len()),
            ("close", close.len()),
            ("volume", volume.len()),
        ];
        if let Some((field, len)) = lengths.iter().find(|(_, len)| *len != n) {
            return Err(StockError::MalformedInput(format!(
                "column length mismatch: {n} dates but {len} {field} values"
            )));
        }

        let bars = (0..n)
            .map(|i| PriceBar::new(dates[i], open[i], high[i], low[i], close[i], volume[i]))
            .collect();

        Self::new(bars)
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Most recent bar
    pub fn latest(&self) -> &PriceBar {
        // Non-empty by construction
        &self.bars[self.bars.len() - 1]
    }

    /// Closing prices in order
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Bars from the last `n` sessions (or all of them if fewer)
    pub fn tail(&self, n: usize) -> &[PriceBar] {
        &self.bars[self.bars.len().saturating_sub(n)..]
    }
}

impl<'de> Deserialize<'de> for PriceSeries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            bars: Vec<PriceBar>,
        }

        let raw = Raw::deserialize(deserializer)?;
        PriceSeries::new(raw.bars).map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, n).unwrap()
    }

    #[test]
    fn test_valid_series() {
        let series = PriceSeries::new(vec![
            PriceBar::new(day(1), 10.0, 11.0, 9.5, 10.5, 100),
            PriceBar::new(day(2), 10.5, 12.0, 10.0, 11.5, 200),
        ])
        .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.latest().close, 11.5);
        assert_eq!(series.closes(), vec![10.5, 11.5]);
        assert_eq!(series.tail(5).len(), 2);
    }

    #[test]
    fn test_rejects_empty() {
        let err = PriceSeries::new(Vec::new()).unwrap_err();
        assert!(matches!(err, StockError::MalformedInput(_)));
    }

    #[test]
    fn test_rejects_unordered_dates() {
        let err = PriceSeries::new(vec![
            PriceBar::new(day(2), 10.0, 11.0, 9.0, 10.0, 1),
            PriceBar::new(day(1), 10.0, 11.0, 9.0, 10.0, 1),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));

        let err = PriceSeries::new(vec![
            PriceBar::new(day(1), 10.0, 11.0, 9.0, 10.0, 1),
            PriceBar::new(day(1), 10.0, 11.0, 9.0, 10.0, 1),
        ])
        .unwrap_err();
        assert!(matches!(err, StockError::MalformedInput(_)));
    }

    #[test]
    fn test_rejects_bad_prices() {
        let err = PriceSeries::new(vec![PriceBar::new(day(1), 0.0, 11.0, 9.0, 10.0, 1)]).unwrap_err();
        assert!(err.to_string().contains("open"));

        let err =
            PriceSeries::new(vec![PriceBar::new(day(1), 10.0, 11.0, 9.0, f64::NAN, 1)]).unwrap_err();
        assert!(err.to_string().contains("close"));

        let err = PriceSeries::new(vec![PriceBar::new(day(1), 10.0, 9.0, 11.0, 10.0, 1)]).unwrap_err();
        assert!(err.to_string().contains("below low"));
    }

    #[test]
    fn test_accepts_close_outside_rounded_range() {
        // vendor rows sometimes round high/low inside the open or close
        let series = PriceSeries::new(vec![
            PriceBar::new(day(1), 10.0, 11.0, 9.0, 10.5, 1),
            PriceBar::new(day(2), 10.5, 11.0, 9.0, 11.02, 1),
        ])
        .unwrap();
        assert_eq!(series.latest().close, 11.02);
    }

    #[test]
    fn test_from_columns_length_mismatch() {
        let err = PriceSeries::from_columns(
            &[day(1), day(2)],
            &[10.0, 10.0],
            &[11.0, 11.0],
            &[9.0],
            &[10.0, 10.0],
            &[1, 1],
        )
        .unwrap_err();
        assert!(err.to_string().contains("1 low values"));
    }

    #[test]
    fn test_from_columns_ok() {
        let series = PriceSeries::from_columns(
            &[day(1), day(2)],
            &[10.0, 10.0],
            &[11.0, 11.0],
            &[9.0, 9.0],
            &[10.0, 10.5],
            &[1, 2],
        )
        .unwrap();
        assert_eq!(series.latest().volume, 2);
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"{"bars":[{"date":"2024-03-02","open":1.0,"high":1.0,"low":1.0,"close":1.0,"volume":1},
                              {"date":"2024-03-01","open":1.0,"high":1.0,"low":1.0,"close":1.0,"volume":1}]}"#;
        assert!(serde_json::from_str::<PriceSeries>(json).is_err());
    }
}
