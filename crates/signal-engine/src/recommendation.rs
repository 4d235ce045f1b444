//! Recommendation scorer
//!
//! Blends a weighted vote over the classified signals with the news sentiment
//! score and maps the result onto a five-step label.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::signals::{IndicatorId, SignalLabel, SignalSet};

pub const TECHNICAL_WEIGHT: f64 = 0.7;
pub const SENTIMENT_WEIGHT: f64 = 0.3;

const STRONG_THRESHOLD: f64 = 30.0;
const THRESHOLD: f64 = 10.0;
/// Price distance from SMA20 worth mentioning, in percent
const SMA20_DISTANCE_NOTE: f64 = 5.0;

/// Vote weight of each indicator
pub fn weight(id: IndicatorId) -> f64 {
    match id {
        IndicatorId::Sma20 | IndicatorId::Sma50 | IndicatorId::Macd | IndicatorId::Bollinger => 1.0,
        IndicatorId::Sma150 | IndicatorId::Cci | IndicatorId::Demark => 1.5,
        IndicatorId::Sma200 | IndicatorId::Rsi => 2.0,
    }
}

/// Weighted vote in [-100, 100]; 0 when no signal is directional
pub fn technical_score(signals: &SignalSet) -> f64 {
    let (bull, bear) = signals
        .iter()
        .fold((0.0, 0.0), |(bull, bear), (id, label)| match label {
            SignalLabel::Bullish => (bull + weight(*id), bear),
            SignalLabel::Bearish => (bull, bear + weight(*id)),
            SignalLabel::Neutral => (bull, bear),
        });

    let total = bull + bear;
    if total == 0.0 {
        0.0
    } else {
        (bull - bear) / total * 100.0
    }
}

pub fn combined_score(technical: f64, sentiment: f64) -> f64 {
    TECHNICAL_WEIGHT * technical + SENTIMENT_WEIGHT * sentiment
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecommendationLabel {
    #[serde(rename = "STRONG BUY")]
    StrongBuy,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "HOLD")]
    Hold,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "STRONG SELL")]
    StrongSell,
}

impl RecommendationLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationLabel::StrongBuy => "STRONG BUY",
            RecommendationLabel::Buy => "BUY",
            RecommendationLabel::Hold => "HOLD",
            RecommendationLabel::Sell => "SELL",
            RecommendationLabel::StrongSell => "STRONG SELL",
        }
    }
}

impl fmt::Display for RecommendationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step function of the combined score
pub fn label_for(combined: f64) -> RecommendationLabel {
    if combined > STRONG_THRESHOLD {
        RecommendationLabel::StrongBuy
    } else if combined > THRESHOLD {
        RecommendationLabel::Buy
    } else if combined < -STRONG_THRESHOLD {
        RecommendationLabel::StrongSell
    } else if combined < -THRESHOLD {
        RecommendationLabel::Sell
    } else {
        RecommendationLabel::Hold
    }
}

/// |combined| capped at 100
pub fn confidence(combined: f64) -> f64 {
    if combined.is_finite() {
        combined.abs().min(100.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(rename = "recommendation")]
    pub label: RecommendationLabel,
    pub confidence: f64,
    pub technical_score: f64,
    pub sentiment_score: f64,
    pub combined_score: f64,
    pub description: String,
}

impl Recommendation {
    /// Score a signal set against a sentiment score
    ///
    /// `close` and `sma20` only feed the narrative.
    pub fn score(signals: &SignalSet, sentiment: f64, close: f64, sma20: Option<f64>) -> Self {
        let technical = technical_score(signals);
        let combined = combined_score(technical, sentiment);
        Self {
            label: label_for(combined),
            confidence: confidence(combined),
            technical_score: technical,
            sentiment_score: sentiment,
            combined_score: combined,
            description: describe(signals, technical, sentiment, close, sma20),
        }
    }
}

/// Short narrative explaining a recommendation
pub fn describe(
    signals: &SignalSet,
    technical: f64,
    sentiment: f64,
    close: f64,
    sma20: Option<f64>,
) -> String {
    let mut sentences = Vec::new();

    sentences.push(
        if technical > 20.0 {
            "Strong technical indicators suggest bullish momentum"
        } else if technical > 0.0 {
            "Technical indicators are moderately bullish"
        } else if technical < -20.0 {
            "Technical indicators show bearish signals"
        } else if technical < 0.0 {
            "Technical indicators are slightly bearish"
        } else {
            "Technical indicators are neutral"
        }
        .to_string(),
    );

    let factors = key_factors(signals);
    if !factors.is_empty() {
        sentences.push(format!("Key factors: {}", factors.join(", ")));
    }

    sentences.push(
        if sentiment > 20.0 {
            "News sentiment is strongly positive"
        } else if sentiment > 0.0 {
            "News sentiment is slightly positive"
        } else if sentiment < -20.0 {
            "News sentiment is strongly negative"
        } else if sentiment < 0.0 {
            "News sentiment is slightly negative"
        } else {
            "News sentiment is neutral"
        }
        .to_string(),
    );

    if let Some(sma) = sma20.filter(|s| *s > 0.0) {
        let distance = (close - sma) / sma * 100.0;
        if distance > SMA20_DISTANCE_NOTE {
            sentences.push(format!("Price is {distance:.1}% above 20-day average"));
        } else if distance < -SMA20_DISTANCE_NOTE {
            sentences.push(format!("Price is {:.1}% below 20-day average", distance.abs()));
        }
    }

    format!("{}.", sentences.join(". "))
}

fn key_factors(signals: &SignalSet) -> Vec<String> {
    let mut factors = Vec::new();

    let (above, below) = IndicatorId::MOVING_AVERAGES
        .iter()
        .filter_map(|id| signals.get(id))
        .fold((0, 0), |(above, below), label| match label {
            SignalLabel::Bullish => (above + 1, below),
            SignalLabel::Bearish => (above, below + 1),
            SignalLabel::Neutral => (above, below),
        });
    if above > below {
        factors.push(format!("price is above {above} key moving averages"));
    } else if below > above {
        factors.push(format!("price is below {below} key moving averages"));
    }

    match signals.get(&IndicatorId::Rsi) {
        Some(SignalLabel::Bullish) => {
            factors.push("RSI indicates oversold conditions (potential bounce)".to_string());
        }
        Some(SignalLabel::Bearish) => {
            factors.push("RSI shows overbought conditions (potential pullback)".to_string());
        }
        _ => {}
    }

    match signals.get(&IndicatorId::Macd) {
        Some(SignalLabel::Bullish) => factors.push("MACD shows bullish crossover".to_string()),
        Some(SignalLabel::Bearish) => factors.push("MACD shows bearish crossover".to_string()),
        _ => {}
    }

    match signals.get(&IndicatorId::Bollinger) {
        Some(SignalLabel::Bullish) => {
            factors.push("price touched lower Bollinger Band (oversold)".to_string());
        }
        Some(SignalLabel::Bearish) => {
            factors.push("price touched upper Bollinger Band (overbought)".to_string());
        }
        _ => {}
    }

    factors
}
