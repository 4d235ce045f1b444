//! Single-ticker analysis assembly
//!
//! Runs the pure pipeline over one price history and reshapes the output
//! into the result object consumed by the presentation layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::demark::{DemarkDirection, DemarkSignal};
use crate::error::{Result, StockError};
use crate::indicators::{IndicatorParams, IndicatorSeries, MacdCrossover, Series, latest};
use crate::levels::{SupportResistanceLevel, detect_levels};
use crate::model::PriceSeries;
use crate::recommendation::Recommendation;
use crate::sentiment::SentimentResult;
use crate::signals::{ClassifierConfig, SignalSet, classify};
use crate::targets::PriceTargets;

/// Trading sessions in a year, for the 52-week range
pub const SESSIONS_52W: usize = 252;
/// Sessions averaged for the average volume
pub const AVERAGE_VOLUME_SESSIONS: usize = 63;

/// Company metadata and quote figures, passed through untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySnapshot {
    pub name: String,
    pub sector: Option<String>,
    pub current_price: f64,
    pub previous_close: Option<f64>,
    pub day_change: Option<f64>,
    pub day_change_percent: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume: Option<u64>,
    pub average_volume: Option<f64>,
    pub pe: Option<f64>,
    pub eps: Option<f64>,
    pub dividend: Option<f64>,
}

impl CompanySnapshot {
    /// Quote figures derivable from daily bars alone; fundamentals stay empty
    pub fn from_history(name: impl Into<String>, series: &PriceSeries) -> Self {
        let last = series.latest();
        let previous_close = series
            .len()
            .checked_sub(2)
            .map(|i| series.bars()[i].close);
        let day_change = previous_close.map(|p| last.close - p);
        let day_change_percent = previous_close
            .zip(day_change)
            .map(|(p, change)| change / p * 100.0);

        let year = series.tail(SESSIONS_52W);
        let low = year.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let high = year.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);

        let recent = series.tail(AVERAGE_VOLUME_SESSIONS);
        let average_volume =
            recent.iter().map(|b| b.volume as f64).sum::<f64>() / recent.len() as f64;

        Self {
            name: name.into(),
            current_price: last.close,
            previous_close,
            day_change,
            day_change_percent,
            fifty_two_week_low: Some(low),
            fifty_two_week_high: Some(high),
            volume: Some(last.volume),
            average_volume: Some(average_volume),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalAnalysis {
    pub score: f64,
    pub signals: SignalSet,
    pub macd_crossovers: Vec<MacdCrossover>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
}

/// Indicator series reshaped into parallel arrays for charting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub dates: Vec<String>,
    pub ohlc: Ohlc,
    pub volume: Vec<u64>,
    pub indicators: BTreeMap<String, Series>,
}

impl ChartData {
    pub fn new(series: &PriceSeries, indicators: &IndicatorSeries) -> Self {
        let bars = series.bars();
        Self {
            dates: bars.iter().map(|b| b.date.format("%Y-%m-%d").to_string()).collect(),
            ohlc: Ohlc {
                open: bars.iter().map(|b| b.open).collect(),
                high: bars.iter().map(|b| b.high).collect(),
                low: bars.iter().map(|b| b.low).collect(),
                close: bars.iter().map(|b| b.close).collect(),
            },
            volume: bars.iter().map(|b| b.volume).collect(),
            indicators: indicators
                .named()
                .into_iter()
                .map(|(key, values)| (key.to_string(), values.clone()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatestData {
    pub close: f64,
    pub volume: u64,
    pub rsi: Option<f64>,
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
}

/// Completed Demark setups split by direction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemarkChart {
    pub buy_signals: Vec<DemarkSignal>,
    pub sell_signals: Vec<DemarkSignal>,
}

impl DemarkChart {
    pub fn from_signals(signals: &[DemarkSignal]) -> Self {
        let (buy_signals, sell_signals): (Vec<_>, Vec<_>) = signals
            .iter()
            .copied()
            .partition(|s| s.direction == DemarkDirection::Buy);
        Self {
            buy_signals,
            sell_signals,
        }
    }
}

/// Full single-ticker result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAnalysis {
    pub ticker: String,
    pub company_info: CompanySnapshot,
    pub technical_analysis: TechnicalAnalysis,
    pub sentiment_analysis: SentimentResult,
    pub recommendation: Recommendation,
    pub price_targets: Option<PriceTargets>,
    pub support_resistance: Vec<SupportResistanceLevel>,
    pub chart_data: ChartData,
    pub latest_data: LatestData,
    pub demark: DemarkChart,
}

/// Tuning for one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    pub indicators: IndicatorParams,
    pub classifier: ClassifierConfig,
    /// Bars scanned for MACD crossovers
    pub crossover_lookback: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            indicators: IndicatorParams::default(),
            classifier: ClassifierConfig::default(),
            crossover_lookback: 30,
        }
    }
}

/// Analyze one ticker with default options
pub fn analyze_series(
    ticker: &str,
    series: &PriceSeries,
    sentiment: SentimentResult,
    snapshot: CompanySnapshot,
) -> Result<StockAnalysis> {
    analyze_series_with(ticker, series, sentiment, snapshot, &AnalysisOptions::default())
}

/// Analyze one ticker
///
/// Indicators the history is too short for are omitted from the result.
/// Price targets are dropped when the bands are undefined and keep no ratio
/// when the price sits at or below the lower band.
pub fn analyze_series_with(
    ticker: &str,
    series: &PriceSeries,
    sentiment: SentimentResult,
    snapshot: CompanySnapshot,
    options: &AnalysisOptions,
) -> Result<StockAnalysis> {
    let indicators = IndicatorSeries::compute_with(series, &options.indicators)?;
    let last = series.latest();
    let close = last.close;

    let signals = classify(series, &indicators, &options.classifier);
    let sma20 = latest(&indicators.sma20);
    let recommendation = Recommendation::score(&signals, sentiment.score, close, sma20);

    let price_targets = match PriceTargets::compute(close, &indicators) {
        Ok(targets) => Some(targets),
        Err(StockError::InvalidRange {
            current_price,
            stop_loss,
        }) => {
            tracing::warn!(
                ticker,
                current_price,
                stop_loss,
                "price at or below stop loss, omitting risk/reward ratio"
            );
            match (latest(&indicators.bb_upper), latest(&indicators.bb_lower)) {
                (Some(upper), Some(lower)) => Some(PriceTargets::from_bands(close, upper, lower)),
                _ => None,
            }
        }
        Err(StockError::InsufficientHistory { .. }) => {
            tracing::debug!(ticker, "price targets omitted: bands not yet defined");
            None
        }
        Err(e) => return Err(e),
    };

    let demark = indicators
        .demark
        .as_deref()
        .map(DemarkChart::from_signals)
        .unwrap_or_default();

    Ok(StockAnalysis {
        ticker: ticker.to_string(),
        company_info: snapshot,
        technical_analysis: TechnicalAnalysis {
            score: recommendation.technical_score,
            macd_crossovers: indicators.macd_crossovers(series, options.crossover_lookback),
            signals,
        },
        sentiment_analysis: sentiment,
        recommendation,
        price_targets,
        support_resistance: detect_levels(close, &indicators),
        chart_data: ChartData::new(series, &indicators),
        latest_data: LatestData {
            close,
            volume: last.volume,
            rsi: latest(&indicators.rsi),
            sma20,
            sma50: latest(&indicators.sma50),
        },
        demark,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::series_from_closes;
    use crate::recommendation::RecommendationLabel;
    use crate::signals::IndicatorId;

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + (i as f64 / 7.0).sin() * 8.0).collect()
    }

    #[test]
    fn test_short_history_still_analyzes() {
        let series = series_from_closes(&[10.0, 10.2, 10.1]);
        let analysis = analyze_series("TINY", &series, SentimentResult::neutral(), CompanySnapshot::default())
            .unwrap();

        assert!(analysis.technical_analysis.signals.is_empty());
        assert_eq!(analysis.recommendation.technical_score, 0.0);
        assert_eq!(analysis.recommendation.label, RecommendationLabel::Hold);
        assert!(analysis.price_targets.is_none());
        assert!(analysis.support_resistance.is_empty());
        assert_eq!(analysis.latest_data.rsi, None);
        assert!(analysis.demark.buy_signals.is_empty());
    }

    #[test]
    fn test_full_history_shape() {
        let series = series_from_closes(&wave(260));
        let analysis = analyze_series(
            "WAVE",
            &series,
            SentimentResult::with_score(40.0),
            CompanySnapshot::from_history("Wave Corp", &series),
        )
        .unwrap();

        assert_eq!(analysis.technical_analysis.signals.len(), IndicatorId::ALL.len());
        assert_eq!(analysis.chart_data.dates.len(), 260);
        assert_eq!(analysis.chart_data.dates[0], "2024-01-01");
        assert_eq!(analysis.chart_data.indicators.len(), 11);
        assert!(analysis.chart_data.indicators["sma200"][198].is_none());
        assert!(analysis.chart_data.indicators["sma200"][199].is_some());
        assert_eq!(analysis.support_resistance.len(), 6);
        assert_eq!(analysis.recommendation.sentiment_score, 40.0);
        assert_eq!(analysis.company_info.name, "Wave Corp");
        assert!(analysis.latest_data.sma50.is_some());
    }

    #[test]
    fn test_price_below_lower_band_keeps_targets_without_ratio() {
        let mut closes = vec![100.0; 40];
        closes.push(80.0);
        let series = series_from_closes(&closes);
        let analysis =
            analyze_series("DROP", &series, SentimentResult::neutral(), CompanySnapshot::default()).unwrap();

        let targets = analysis.price_targets.unwrap();
        assert!(targets.risk_reward_ratio.is_none());
        assert!(targets.stop_loss >= 80.0);
    }

    #[test]
    fn test_serialized_keys() {
        let series = series_from_closes(&wave(60));
        let analysis =
            analyze_series("KEYS", &series, SentimentResult::neutral(), CompanySnapshot::default()).unwrap();
        let json = serde_json::to_value(&analysis).unwrap();

        for key in [
            "companyInfo",
            "technicalAnalysis",
            "sentimentAnalysis",
            "recommendation",
            "priceTargets",
            "supportResistance",
            "chartData",
            "latestData",
            "demark",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json["chartData"]["indicators"]["sma200"][0].is_null());
        assert!(json["technicalAnalysis"]["macdCrossovers"].is_array());
    }

    #[test]
    fn test_snapshot_from_history() {
        let series = series_from_closes(&[10.0, 12.0, 11.0]);
        let snapshot = CompanySnapshot::from_history("ACME", &series);

        assert_eq!(snapshot.current_price, 11.0);
        assert_eq!(snapshot.previous_close, Some(12.0));
        assert_eq!(snapshot.day_change, Some(-1.0));
        assert!((snapshot.fifty_two_week_high.unwrap() - 12.12).abs() < 1e-9);
        assert!((snapshot.fifty_two_week_low.unwrap() - 9.9).abs() < 1e-9);
        assert_eq!(snapshot.average_volume, Some(1_000_000.0));
        assert!(snapshot.pe.is_none());
    }

    #[test]
    fn test_demark_chart_split() {
        let mut closes = vec![100.0; 4];
        for i in 0..9 {
            closes.push(closes[i] - 1.0);
        }
        let series = series_from_closes(&closes);
        let analysis =
            analyze_series("DM", &series, SentimentResult::neutral(), CompanySnapshot::default()).unwrap();
        assert_eq!(analysis.demark.buy_signals.len(), 1);
        assert!(analysis.demark.sell_signals.is_empty());
    }
}
