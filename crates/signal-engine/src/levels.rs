//! Support/resistance detector
//!
//! A fixed rule table over the latest Bollinger Bands and moving averages.
//! Strength is a weight per source technique, not a fitted statistic.

use serde::{Deserialize, Serialize};

use crate::indicators::{IndicatorSeries, latest};
use crate::signals::IndicatorId;

/// Strength assigned to Bollinger band levels
pub const BOLLINGER_STRENGTH: u8 = 70;
/// Strength assigned to moving-average levels
pub const MOVING_AVERAGE_STRENGTH: u8 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelKind {
    Support,
    Resistance,
}

/// Technique that produced a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LevelSource {
    BollingerUpper,
    BollingerLower,
    MovingAverage(IndicatorId),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportResistanceLevel {
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: LevelKind,
    /// 0-100
    pub strength: u8,
    pub source: LevelSource,
}

/// Candidate levels from the latest bar, one per available source
///
/// Order: Bollinger upper, Bollinger lower, then SMA 20/50/150/200. A moving
/// average sitting exactly at the current price counts as support.
pub fn detect_levels(current_price: f64, indicators: &IndicatorSeries) -> Vec<SupportResistanceLevel> {
    let mut levels = Vec::with_capacity(6);

    if let Some(upper) = latest(&indicators.bb_upper) {
        levels.push(SupportResistanceLevel {
            price: upper,
            kind: LevelKind::Resistance,
            strength: BOLLINGER_STRENGTH,
            source: LevelSource::BollingerUpper,
        });
    }

    if let Some(lower) = latest(&indicators.bb_lower) {
        levels.push(SupportResistanceLevel {
            price: lower,
            kind: LevelKind::Support,
            strength: BOLLINGER_STRENGTH,
            source: LevelSource::BollingerLower,
        });
    }

    for id in IndicatorId::MOVING_AVERAGES {
        let Some(sma) = id.sma_series(indicators).and_then(latest) else {
            continue;
        };
        let kind = if sma <= current_price {
            LevelKind::Support
        } else {
            LevelKind::Resistance
        };
        levels.push(SupportResistanceLevel {
            price: sma,
            kind,
            strength: MOVING_AVERAGE_STRENGTH,
            source: LevelSource::MovingAverage(id),
        });
    }

    levels
}
