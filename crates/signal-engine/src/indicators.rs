//! Indicator engine
//!
//! Computes every derived series from a [`PriceSeries`]. Each output is
//! aligned index-for-index with the bars; entries inside an indicator's
//! warm-up window are `None`, never zero.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ta::Next;
use ta::indicators::{
    CommodityChannelIndex, ExponentialMovingAverage, SimpleMovingAverage, StandardDeviation,
};

use crate::demark::{self, DemarkSignal};
use crate::error::{Result, StockError};
use crate::model::PriceSeries;

/// A series aligned with the price bars; `None` before warm-up
pub type Series = Vec<Option<f64>>;

pub const SMA_20: usize = 20;
pub const SMA_50: usize = 50;
pub const SMA_150: usize = 150;
pub const SMA_200: usize = 200;
pub const BOLLINGER_PERIOD: usize = SMA_20;

/// Tunable indicator parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    /// Band width in standard deviations
    pub bollinger_k: f64,
    pub cci_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_k: 2.0,
            cci_period: 20,
        }
    }
}

impl IndicatorParams {
    /// Validate the parameters
    pub fn validate(&self) -> Result<()> {
        let periods = [
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("cci_period", self.cci_period),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(StockError::ConfigError(format!("{name} must be greater than 0")));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(StockError::ConfigError(
                "macd_fast must be shorter than macd_slow".to_string(),
            ));
        }
        if !(self.bollinger_k.is_finite() && self.bollinger_k > 0.0) {
            return Err(StockError::ConfigError(
                "bollinger_k must be a positive number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Direction of a MACD / signal-line crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossDirection {
    /// MACD moved above its signal line
    Bullish,
    /// MACD moved below its signal line
    Bearish,
}

/// A bar at which the MACD line crossed its signal line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacdCrossover {
    pub index: usize,
    pub date: NaiveDate,
    pub direction: CrossDirection,
}

/// Every derived series for one price history
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSeries {
    pub sma20: Series,
    pub sma50: Series,
    pub sma150: Series,
    pub sma200: Series,
    pub rsi: Series,
    pub macd: Series,
    pub macd_signal: Series,
    pub macd_hist: Series,
    pub bb_upper: Series,
    pub bb_middle: Series,
    pub bb_lower: Series,
    pub cci: Series,
    /// Completed Demark setups; `None` when the history is too short to scan
    pub demark: Option<Vec<DemarkSignal>>,
}

impl IndicatorSeries {
    /// Compute all indicators with default parameters
    pub fn compute(series: &PriceSeries) -> Result<Self> {
        Self::compute_with(series, &IndicatorParams::default())
    }

    /// Compute all indicators with explicit parameters
    pub fn compute_with(series: &PriceSeries, params: &IndicatorParams) -> Result<Self> {
        params.validate()?;
        let closes = series.closes();

        let sma20 = sma(&closes, SMA_20)?;
        let sma50 = sma(&closes, SMA_50)?;
        let sma150 = sma(&closes, SMA_150)?;
        let sma200 = sma(&closes, SMA_200)?;

        let (macd, macd_signal, macd_hist) =
            macd(&closes, params.macd_fast, params.macd_slow, params.macd_signal)?;
        let (bb_upper, bb_lower) = bollinger(&closes, &sma20, params.bollinger_k)?;

        let demark = match demark::scan(series) {
            Ok(signals) => Some(signals),
            Err(e) => {
                tracing::debug!("demark omitted: {}", e);
                None
            }
        };

        Ok(Self {
            rsi: rsi(&closes, params.rsi_period),
            cci: cci(series, params.cci_period)?,
            bb_middle: sma20.clone(),
            sma20,
            sma50,
            sma150,
            sma200,
            macd,
            macd_signal,
            macd_hist,
            bb_upper,
            bb_lower,
            demark,
        })
    }

    /// Number of aligned entries (equals the bar count)
    pub fn len(&self) -> usize {
        self.sma20.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sma20.is_empty()
    }

    /// Series keyed by their presentation ids, in a fixed order
    pub fn named(&self) -> [(&'static str, &Series); 11] {
        [
            ("sma20", &self.sma20),
            ("sma50", &self.sma50),
            ("sma150", &self.sma150),
            ("sma200", &self.sma200),
            ("bbUpper", &self.bb_upper),
            ("bbLower", &self.bb_lower),
            ("rsi", &self.rsi),
            ("macd", &self.macd),
            ("macdSignal", &self.macd_signal),
            ("macdHist", &self.macd_hist),
            ("cci", &self.cci),
        ]
    }

    /// MACD/signal crossings within the last `lookback` bars, oldest first
    pub fn macd_crossovers(&self, series: &PriceSeries, lookback: usize) -> Vec<MacdCrossover> {
        let bars = series.bars();
        let start = self.len().saturating_sub(lookback).max(1);
        let gap = |i: usize| match (self.macd[i], self.macd_signal[i]) {
            (Some(m), Some(s)) => Some(m - s),
            _ => None,
        };

        (start..self.len())
            .filter_map(|i| {
                let (prev, curr) = (gap(i - 1)?, gap(i)?);
                let direction = if prev <= 0.0 && curr > 0.0 {
                    CrossDirection::Bullish
                } else if prev >= 0.0 && curr < 0.0 {
                    CrossDirection::Bearish
                } else {
                    return None;
                };
                Some(MacdCrossover {
                    index: i,
                    date: bars[i].date,
                    direction,
                })
            })
            .collect()
    }
}

/// Latest defined value of a series, if the last entry is defined
pub fn latest(series: &Series) -> Option<f64> {
    series.last().copied().flatten()
}

fn indicator_error(name: &str, e: impl std::fmt::Display) -> StockError {
    StockError::ConfigError(format!("{name}: {e}"))
}

/// Feed `values` through a `ta` indicator, masking the first `warmup - 1` outputs
fn warmed<I>(mut indicator: I, values: &[f64], warmup: usize) -> Series
where
    I: Next<f64, Output = f64>,
{
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let out = indicator.next(v);
            (i + 1 >= warmup).then_some(out)
        })
        .collect()
}

/// Simple moving average of the trailing `period` closes
pub fn sma(closes: &[f64], period: usize) -> Result<Series> {
    let indicator = SimpleMovingAverage::new(period).map_err(|e| indicator_error("sma", e))?;
    Ok(warmed(indicator, closes, period))
}

/// Wilder-smoothed RSI, bounded to [0, 100]
///
/// The first value appears at index `period`, seeded with the simple mean of
/// the first `period` changes.
pub fn rsi(closes: &[f64], period: usize) -> Series {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let n = period as f64;
    let seed = &changes[..period];
    let mut avg_gain = seed.iter().map(|c| c.max(0.0)).sum::<f64>() / n;
    let mut avg_loss = seed.iter().map(|c| (-c).max(0.0)).sum::<f64>() / n;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for (i, change) in changes.iter().enumerate().skip(period) {
        avg_gain = (avg_gain * (n - 1.0) + change.max(0.0)) / n;
        avg_loss = (avg_loss * (n - 1.0) + (-change).max(0.0)) / n;
        out[i + 1] = Some(rsi_value(avg_gain, avg_loss));
    }

    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

/// MACD line, signal line and histogram
///
/// The MACD line is defined once the slow EMA has seen `slow` closes; the
/// signal EMA is fed only defined MACD values.
pub fn macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Result<(Series, Series, Series)> {
    let mut ema_fast =
        ExponentialMovingAverage::new(fast).map_err(|e| indicator_error("macd fast", e))?;
    let mut ema_slow =
        ExponentialMovingAverage::new(slow).map_err(|e| indicator_error("macd slow", e))?;
    let mut ema_signal =
        ExponentialMovingAverage::new(signal).map_err(|e| indicator_error("macd signal", e))?;

    let n = closes.len();
    let (mut line, mut sig, mut hist) = (vec![None; n], vec![None; n], vec![None; n]);
    let mut fed = 0usize;

    for (i, &close) in closes.iter().enumerate() {
        let m = ema_fast.next(close) - ema_slow.next(close);
        if i + 1 < slow {
            continue;
        }
        line[i] = Some(m);

        let s = ema_signal.next(m);
        fed += 1;
        if fed >= signal {
            sig[i] = Some(s);
            hist[i] = Some(m - s);
        }
    }

    Ok((line, sig, hist))
}

/// Bollinger upper and lower bands around an existing SMA20 series
pub fn bollinger(closes: &[f64], middle: &Series, k: f64) -> Result<(Series, Series)> {
    let sd = StandardDeviation::new(BOLLINGER_PERIOD).map_err(|e| indicator_error("bollinger", e))?;
    let deviations = warmed(sd, closes, BOLLINGER_PERIOD);

    let (upper, lower) = middle
        .iter()
        .zip(&deviations)
        .map(|(m, d)| match (m, d) {
            (Some(m), Some(d)) => {
                let d = if d.is_finite() { d.max(0.0) } else { 0.0 };
                (Some(m + k * d), Some(m - k * d))
            }
            _ => (None, None),
        })
        .unzip();

    Ok((upper, lower))
}

/// Commodity Channel Index over typical prices; a flat window yields 0
pub fn cci(series: &PriceSeries, period: usize) -> Result<Series> {
    let mut indicator = CommodityChannelIndex::new(period).map_err(|e| indicator_error("cci", e))?;

    Ok(series
        .bars()
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let value = indicator.next(bar);
            (i + 1 >= period).then_some(if value.is_finite() { value } else { 0.0 })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::series_from_closes;

    fn rising_then_falling(n: usize) -> Vec<f64> {
        let half = n / 2;
        (0..n)
            .map(|i| {
                if i < half {
                    100.0 + i as f64
                } else {
                    100.0 + half as f64 - (i - half) as f64 * 1.2
                }
            })
            .collect()
    }

    #[test]
    fn test_sma_constant_series() {
        let closes = vec![42.0; 60];
        let s = sma(&closes, 20).unwrap();
        assert!(s[..19].iter().all(Option::is_none));
        for v in &s[19..] {
            assert!((v.unwrap() - 42.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_sma_trailing_mean() {
        let closes: Vec<f64> = (1..=25).map(f64::from).collect();
        let s = sma(&closes, 20).unwrap();
        // mean of 6..=25
        assert!((s[24].unwrap() - 15.5).abs() < 1e-9);
    }

    #[test]
    fn test_short_history_is_absent() {
        let series = series_from_closes(&[10.0; 15]);
        let ind = IndicatorSeries::compute(&series).unwrap();

        assert_eq!(ind.len(), 15);
        assert!(ind.sma20.iter().all(Option::is_none));
        assert!(ind.sma200.iter().all(Option::is_none));
        assert!(ind.bb_upper.iter().all(Option::is_none));
        assert!(ind.cci.iter().all(Option::is_none));
        assert!(ind.macd.iter().all(Option::is_none));
        assert!(ind.rsi[14].is_some());
        assert!(ind.demark.is_some());
    }

    #[test]
    fn test_rsi_bounds() {
        let closes: Vec<f64> = (0..200)
            .map(|i| 100.0 + (f64::from(i) * 0.7).sin() * 15.0 + f64::from(i % 7))
            .collect();
        let values = rsi(&closes, 14);
        assert!(values[..14].iter().all(Option::is_none));
        for v in values.iter().flatten() {
            assert!((0.0..=100.0).contains(v));
        }
    }

    #[test]
    fn test_rsi_monotonic_extremes() {
        let up: Vec<f64> = (0..30).map(|i| 10.0 + f64::from(i)).collect();
        assert_eq!(latest(&rsi(&up, 14)), Some(100.0));

        let flat = vec![10.0; 30];
        assert_eq!(latest(&rsi(&flat, 14)), Some(50.0));

        let down: Vec<f64> = (0..30).map(|i| 100.0 - f64::from(i)).collect();
        assert_eq!(latest(&rsi(&down, 14)), Some(0.0));
    }

    #[test]
    fn test_macd_warmup_and_histogram() {
        let closes = rising_then_falling(120);
        let (line, signal, hist) = macd(&closes, 12, 26, 9).unwrap();

        assert!(line[..25].iter().all(Option::is_none));
        assert!(line[25].is_some());
        assert!(signal[..33].iter().all(Option::is_none));
        assert!(signal[33].is_some());

        for i in 33..closes.len() {
            let expected = line[i].unwrap() - signal[i].unwrap();
            assert!((hist[i].unwrap() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_bollinger_ordering() {
        let closes = rising_then_falling(300);
        let series = series_from_closes(&closes);
        let ind = IndicatorSeries::compute(&series).unwrap();

        for i in 0..ind.len() {
            if let (Some(u), Some(m), Some(l)) = (ind.bb_upper[i], ind.bb_middle[i], ind.bb_lower[i]) {
                assert!(u >= m && m >= l, "bands out of order at {i}");
            }
        }
        assert_eq!(ind.bb_middle, ind.sma20);
    }

    #[test]
    fn test_bollinger_constant_collapses() {
        let closes = vec![50.0; 30];
        let middle = sma(&closes, 20).unwrap();
        let (upper, lower) = bollinger(&closes, &middle, 2.0).unwrap();
        assert!((upper[29].unwrap() - 50.0).abs() < 1e-9);
        assert!((lower[29].unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_cci_deterministic_and_flat() {
        let closes = rising_then_falling(80);
        let series = series_from_closes(&closes);
        let a = cci(&series, 20).unwrap();
        let b = cci(&series, 20).unwrap();
        assert_eq!(a, b);
        assert!(a[..19].iter().all(Option::is_none));
        assert!(a[19].is_some());

        let flat = series_from_closes(&[20.0; 25]);
        assert_eq!(latest(&cci(&flat, 20).unwrap()), Some(0.0));
    }

    #[test]
    fn test_macd_crossovers_detected() {
        let closes = rising_then_falling(200);
        let series = series_from_closes(&closes);
        let ind = IndicatorSeries::compute(&series).unwrap();

        let crossings = ind.macd_crossovers(&series, 200);
        assert!(
            crossings
                .iter()
                .any(|c| c.direction == CrossDirection::Bearish && c.index > 100)
        );
        assert!(ind.macd_crossovers(&series, 0).is_empty());
    }

    #[test]
    fn test_params_validation() {
        assert!(IndicatorParams::default().validate().is_ok());
        let bad = IndicatorParams {
            rsi_period: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = IndicatorParams {
            macd_fast: 30,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
