//! Demark setup counter
//!
//! A single ordered pass over the closes. A bar extends a *buy* run when it
//! closes below the close four bars earlier and a *sell* run when it closes
//! above it. Nine consecutive qualifying bars complete a setup: one signal is
//! emitted at the ninth bar and the counter resets. Equal closes break the run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StockError};
use crate::model::PriceSeries;

/// Bars between the compared closes
pub const LOOKBACK: usize = 4;
/// Consecutive qualifying bars needed to complete a setup
pub const SETUP_LENGTH: u32 = 9;
/// Minimum history before the counter is run at all
pub const MIN_BARS: usize = 13;

/// Direction of a completed setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemarkDirection {
    /// Completed down-run, exhaustion of sellers
    Buy,
    /// Completed up-run, exhaustion of buyers
    Sell,
}

impl DemarkDirection {
    /// +1 for buy, -1 for sell
    pub fn value(self) -> i8 {
        match self {
            DemarkDirection::Buy => 1,
            DemarkDirection::Sell => -1,
        }
    }
}

/// One completed setup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemarkSignal {
    pub date: NaiveDate,
    pub price: f64,
    pub value: i8,
    pub direction: DemarkDirection,
    /// Index of the completing bar in the source series
    pub index: usize,
}

/// Counter state carried through the fold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RunState {
    direction: Option<DemarkDirection>,
    run_length: u32,
}

impl RunState {
    /// Advance by one comparison; returns the new state and whether a setup completed
    fn step(self, qualifying: Option<DemarkDirection>) -> (Self, Option<DemarkDirection>) {
        let Some(dir) = qualifying else {
            return (Self::default(), None);
        };

        let run_length = if self.direction == Some(dir) {
            self.run_length + 1
        } else {
            1
        };

        if run_length == SETUP_LENGTH {
            (Self::default(), Some(dir))
        } else {
            (
                Self {
                    direction: Some(dir),
                    run_length,
                },
                None,
            )
        }
    }
}

/// Compare a close with the close `LOOKBACK` bars earlier
fn qualify(close: f64, earlier: f64) -> Option<DemarkDirection> {
    if close < earlier {
        Some(DemarkDirection::Buy)
    } else if close > earlier {
        Some(DemarkDirection::Sell)
    } else {
        None
    }
}

/// Scan a series and return every completed setup, oldest first
pub fn scan(series: &PriceSeries) -> Result<Vec<DemarkSignal>> {
    let bars = series.bars();
    if bars.len() < MIN_BARS {
        return Err(StockError::InsufficientHistory {
            indicator: "demark".to_string(),
            required: MIN_BARS,
            available: bars.len(),
        });
    }

    let (_, signals) = bars.iter().enumerate().skip(LOOKBACK).fold(
        (RunState::default(), Vec::new()),
        |(state, mut signals), (i, bar)| {
            let (next, completed) = state.step(qualify(bar.close, bars[i - LOOKBACK].close));
            if let Some(direction) = completed {
                signals.push(DemarkSignal {
                    date: bar.date,
                    price: bar.close,
                    value: direction.value(),
                    direction,
                    index: i,
                });
            }
            (next, signals)
        },
    );

    Ok(signals)
}

/// Most recent signal completed within the last `recency` bars of a `len`-bar series
pub fn recent(signals: &[DemarkSignal], len: usize, recency: usize) -> Option<&DemarkSignal> {
    let cutoff = len.saturating_sub(recency);
    signals.last().filter(|s| s.index >= cutoff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::series_from_closes;

    /// Four flat seed bars followed by one bar per entry of `moves`:
    /// `-1` closes below the bar four back, `+1` above, `0` equal.
    fn closes_for(moves: &[i8]) -> Vec<f64> {
        let mut closes = vec![100.0; LOOKBACK];
        for (i, m) in moves.iter().enumerate() {
            let earlier = closes[i];
            closes.push(earlier + f64::from(*m));
        }
        closes
    }

    #[test]
    fn test_eight_then_break_then_nine_emits_once() {
        let mut moves = vec![-1; 8];
        moves.push(0);
        moves.extend(vec![-1; 9]);
        let series = series_from_closes(&closes_for(&moves));

        let signals = scan(&series).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].direction, DemarkDirection::Buy);
        assert_eq!(signals[0].value, 1);
        // 4 seed bars + 8 + 1 break + 9
        assert_eq!(signals[0].index, LOOKBACK + 17);
        assert_eq!(signals[0].price, series.bars()[LOOKBACK + 17].close);
    }

    #[test]
    fn test_partial_count_emits_nothing() {
        let series = series_from_closes(&closes_for(&[0, 1, 1, 1, 1, 1, 1, 1, 1]));
        assert!(scan(&series).unwrap().is_empty());
    }

    #[test]
    fn test_sell_setup_and_reset() {
        // 18 qualifying bars complete two setups, at the 9th and 18th
        let series = series_from_closes(&closes_for(&[1; 18]));
        let signals = scan(&series).unwrap();

        assert_eq!(signals.len(), 2);
        assert!(signals.iter().all(|s| s.direction == DemarkDirection::Sell));
        assert_eq!(signals[0].index, LOOKBACK + 8);
        assert_eq!(signals[1].index, LOOKBACK + 17);
    }

    #[test]
    fn test_direction_change_restarts_run() {
        let mut moves = vec![-1; 5];
        moves.extend(vec![1; 8]);
        let series = series_from_closes(&closes_for(&moves));
        assert!(scan(&series).unwrap().is_empty());

        moves.push(1);
        let series = series_from_closes(&closes_for(&moves));
        let signals = scan(&series).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].direction, DemarkDirection::Sell);
    }

    #[test]
    fn test_insufficient_history() {
        let series = series_from_closes(&[1.0; 12]);
        assert!(matches!(
            scan(&series),
            Err(StockError::InsufficientHistory { required: 13, .. })
        ));
    }

    #[test]
    fn test_recent_window() {
        let series = series_from_closes(&closes_for(&[-1; 9]));
        let signals = scan(&series).unwrap();
        let len = series.len();

        assert!(recent(&signals, len, 5).is_some());
        assert!(recent(&signals, len + 10, 5).is_none());
        assert!(recent(&[], len, 5).is_none());
    }
}
