//! Price target calculator

use serde::{Deserialize, Serialize};

use crate::error::{Result, StockError};
use crate::indicators::{BOLLINGER_PERIOD, IndicatorSeries, latest};

/// Second target sits this far above the first
pub const TARGET2_MULTIPLIER: f64 = 1.05;

/// Stop-loss and targets derived from the latest Bollinger Bands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTargets {
    pub current_price: f64,
    pub stop_loss: f64,
    pub target1: f64,
    pub target2: f64,
    /// `None` when the current price is not above the stop loss
    pub risk_reward_ratio: Option<f64>,
}

impl PriceTargets {
    /// Derive targets from the latest bands
    ///
    /// Fails with `InsufficientHistory` when the bands are not yet defined and
    /// with `InvalidRange` when `current_price <= stop_loss`.
    pub fn compute(current_price: f64, indicators: &IndicatorSeries) -> Result<Self> {
        let (Some(upper), Some(lower)) = (latest(&indicators.bb_upper), latest(&indicators.bb_lower))
        else {
            return Err(StockError::InsufficientHistory {
                indicator: "bollinger".to_string(),
                required: BOLLINGER_PERIOD,
                available: indicators.len(),
            });
        };

        let targets = Self::from_bands(current_price, upper, lower);
        let ratio = risk_reward_ratio(current_price, targets.target1, targets.stop_loss)?;
        Ok(Self {
            risk_reward_ratio: Some(ratio),
            ..targets
        })
    }

    /// Targets without a ratio; never fails
    pub fn from_bands(current_price: f64, upper: f64, lower: f64) -> Self {
        Self {
            current_price,
            stop_loss: lower,
            target1: upper,
            target2: upper * TARGET2_MULTIPLIER,
            risk_reward_ratio: None,
        }
    }
}

/// (target1 - current) / (current - stop_loss)
pub fn risk_reward_ratio(current_price: f64, target1: f64, stop_loss: f64) -> Result<f64> {
    let risk = current_price - stop_loss;
    if risk <= 0.0 {
        return Err(StockError::InvalidRange {
            current_price,
            stop_loss,
        });
    }
    Ok((target1 - current_price) / risk)
}
