//! Signal classifier
//!
//! Maps the latest value of each indicator to a Bullish / Bearish / Neutral
//! label. Indicators without a defined latest value are left out of the set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::demark::{self, DemarkDirection};
use crate::indicators::{IndicatorSeries, Series, latest};
use crate::model::PriceSeries;

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const CCI_OVERSOLD: f64 = -100.0;
pub const CCI_OVERBOUGHT: f64 = 100.0;

/// Indicators that produce a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndicatorId {
    #[serde(rename = "SMA_20")]
    Sma20,
    #[serde(rename = "SMA_50")]
    Sma50,
    #[serde(rename = "SMA_150")]
    Sma150,
    #[serde(rename = "SMA_200")]
    Sma200,
    #[serde(rename = "RSI")]
    Rsi,
    #[serde(rename = "MACD")]
    Macd,
    #[serde(rename = "Bollinger_Bands")]
    Bollinger,
    #[serde(rename = "CCI")]
    Cci,
    #[serde(rename = "Demark")]
    Demark,
}

impl IndicatorId {
    /// Every signal-producing indicator
    pub const ALL: [IndicatorId; 9] = [
        IndicatorId::Sma20,
        IndicatorId::Sma50,
        IndicatorId::Sma150,
        IndicatorId::Sma200,
        IndicatorId::Rsi,
        IndicatorId::Macd,
        IndicatorId::Bollinger,
        IndicatorId::Cci,
        IndicatorId::Demark,
    ];

    /// Moving-average indicators, shortest first
    pub const MOVING_AVERAGES: [IndicatorId; 4] = [
        IndicatorId::Sma20,
        IndicatorId::Sma50,
        IndicatorId::Sma150,
        IndicatorId::Sma200,
    ];

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            IndicatorId::Sma20 => "SMA 20",
            IndicatorId::Sma50 => "SMA 50",
            IndicatorId::Sma150 => "SMA 150",
            IndicatorId::Sma200 => "SMA 200",
            IndicatorId::Rsi => "RSI",
            IndicatorId::Macd => "MACD",
            IndicatorId::Bollinger => "Bollinger Bands",
            IndicatorId::Cci => "CCI",
            IndicatorId::Demark => "Demark",
        }
    }

    /// The SMA series backing a moving-average id
    pub fn sma_series<'a>(&self, indicators: &'a IndicatorSeries) -> Option<&'a Series> {
        match self {
            IndicatorId::Sma20 => Some(&indicators.sma20),
            IndicatorId::Sma50 => Some(&indicators.sma50),
            IndicatorId::Sma150 => Some(&indicators.sma150),
            IndicatorId::Sma200 => Some(&indicators.sma200),
            _ => None,
        }
    }
}

impl fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classified state of one indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalLabel {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for SignalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignalLabel::Bullish => "Bullish",
            SignalLabel::Bearish => "Bearish",
            SignalLabel::Neutral => "Neutral",
        })
    }
}

/// Classified indicators keyed by id
pub type SignalSet = BTreeMap<IndicatorId, SignalLabel>;

/// Classifier tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// MACD gaps within this fraction of the close are Neutral
    pub macd_neutral_band: f64,
    /// A Demark setup counts only if completed within this many bars
    pub demark_recency_bars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            macd_neutral_band: 0.0001,
            demark_recency_bars: 5,
        }
    }
}

/// Classify the latest bar against every available indicator
pub fn classify(
    series: &PriceSeries,
    indicators: &IndicatorSeries,
    config: &ClassifierConfig,
) -> SignalSet {
    let close = series.latest().close;
    let mut signals = SignalSet::new();

    for id in IndicatorId::MOVING_AVERAGES {
        if let Some(sma) = id.sma_series(indicators).and_then(latest) {
            signals.insert(id, classify_price_vs_average(close, sma));
        }
    }

    if let Some(rsi) = latest(&indicators.rsi) {
        signals.insert(IndicatorId::Rsi, classify_rsi(rsi));
    }

    if let (Some(m), Some(s)) = (latest(&indicators.macd), latest(&indicators.macd_signal)) {
        signals.insert(
            IndicatorId::Macd,
            classify_macd(m, s, close * config.macd_neutral_band),
        );
    }

    if let (Some(upper), Some(lower)) = (latest(&indicators.bb_upper), latest(&indicators.bb_lower)) {
        signals.insert(IndicatorId::Bollinger, classify_bollinger(close, upper, lower));
    }

    if let Some(cci) = latest(&indicators.cci) {
        signals.insert(IndicatorId::Cci, classify_cci(cci));
    }

    if let Some(setups) = &indicators.demark {
        let label = match demark::recent(setups, series.len(), config.demark_recency_bars) {
            Some(s) if s.direction == DemarkDirection::Buy => SignalLabel::Bullish,
            Some(_) => SignalLabel::Bearish,
            None => SignalLabel::Neutral,
        };
        signals.insert(IndicatorId::Demark, label);
    }

    tracing::debug!(
        classified = signals.len(),
        "classified {} of {} indicators",
        signals.len(),
        IndicatorId::ALL.len()
    );
    signals
}

pub fn classify_price_vs_average(close: f64, average: f64) -> SignalLabel {
    if close > average {
        SignalLabel::Bullish
    } else if close < average {
        SignalLabel::Bearish
    } else {
        SignalLabel::Neutral
    }
}

/// Oversold reads as a reversal-up expectation
pub fn classify_rsi(rsi: f64) -> SignalLabel {
    if rsi < RSI_OVERSOLD {
        SignalLabel::Bullish
    } else if rsi > RSI_OVERBOUGHT {
        SignalLabel::Bearish
    } else {
        SignalLabel::Neutral
    }
}

/// `band` is an absolute gap; `|macd - signal| <= band` is Neutral
pub fn classify_macd(macd: f64, signal: f64, band: f64) -> SignalLabel {
    let gap = macd - signal;
    if gap.abs() <= band.abs() {
        SignalLabel::Neutral
    } else if gap > 0.0 {
        SignalLabel::Bullish
    } else {
        SignalLabel::Bearish
    }
}

pub fn classify_bollinger(close: f64, upper: f64, lower: f64) -> SignalLabel {
    if close <= lower {
        SignalLabel::Bullish
    } else if close >= upper {
        SignalLabel::Bearish
    } else {
        SignalLabel::Neutral
    }
}

pub fn classify_cci(cci: f64) -> SignalLabel {
    if cci < CCI_OVERSOLD {
        SignalLabel::Bullish
    } else if cci > CCI_OVERBOUGHT {
        SignalLabel::Bearish
    } else {
        SignalLabel::Neutral
    }
}
