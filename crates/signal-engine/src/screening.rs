//! Screening orchestrator
//!
//! Fans the single-ticker pipeline out over a universe with a bounded stream,
//! then folds every `(symbol, outcome)` pair into one ranked result. A failing,
//! slow or panicking symbol is recorded and never aborts the batch.

use futures::FutureExt;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use crate::analysis::StockAnalysis;
use crate::config::EngineConfig;
use crate::error::{Result, StockError};
use crate::provider::Analyzer;
use crate::recommendation::RecommendationLabel;
use crate::universe::Universe;

/// Sessions looked back for momentum
pub const MOMENTUM_SESSIONS: usize = 20;

/// One ranked screening entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopStock {
    pub symbol: String,
    pub name: String,
    pub sector: Option<String>,
    pub current_price: f64,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub recommendation: RecommendationLabel,
    pub combined_score: f64,
    pub technical_score: f64,
    pub sentiment_score: f64,
    pub confidence: f64,
    #[serde(rename = "pricePosition52w")]
    pub price_position_52w: f64,
    pub volume_ratio: f64,
    #[serde(rename = "momentum20d")]
    pub momentum_20d: f64,
    pub attractiveness_score: f64,
    pub description: String,
}

impl TopStock {
    /// Ranking metrics for one analyzed symbol
    pub fn from_analysis(analysis: &StockAnalysis) -> Self {
        let info = &analysis.company_info;
        let rec = &analysis.recommendation;
        let price = analysis.latest_data.close;

        let position = price_position_52w(price, info.fifty_two_week_low, info.fifty_two_week_high);
        let volume = volume_ratio(info.volume, info.average_volume);
        let momentum = momentum_20d(&analysis.chart_data.ohlc.close);

        Self {
            symbol: analysis.ticker.clone(),
            name: if info.name.is_empty() {
                analysis.ticker.clone()
            } else {
                info.name.clone()
            },
            sector: info.sector.clone(),
            current_price: price,
            market_cap: info.market_cap,
            pe_ratio: info.pe,
            recommendation: rec.label,
            combined_score: rec.combined_score,
            technical_score: rec.technical_score,
            sentiment_score: rec.sentiment_score,
            confidence: rec.confidence,
            price_position_52w: position,
            volume_ratio: volume,
            momentum_20d: momentum,
            attractiveness_score: attractiveness(rec.combined_score, momentum, position, volume, rec.confidence),
            description: rec.description.clone(),
        }
    }
}

/// Position in the 52-week range, 0-100; 50 when the range is unknown or flat
pub fn price_position_52w(price: f64, low: Option<f64>, high: Option<f64>) -> f64 {
    match (low, high) {
        (Some(low), Some(high)) if high > low => (price - low) / (high - low) * 100.0,
        _ => 50.0,
    }
}

/// Latest volume over average volume; 1 when the average is unknown
pub fn volume_ratio(volume: Option<u64>, average: Option<f64>) -> f64 {
    match (volume, average) {
        (Some(v), Some(avg)) if avg > 0.0 => v as f64 / avg,
        _ => 1.0,
    }
}

/// Percent change of the last close against the close 20 sessions back
pub fn momentum_20d(closes: &[f64]) -> f64 {
    match closes {
        [.., last] if closes.len() >= MOMENTUM_SESSIONS => {
            let base = closes[closes.len() - MOMENTUM_SESSIONS];
            (last - base) / base * 100.0
        }
        _ => 0.0,
    }
}

/// Ranking score blending conviction, momentum, room to the 52-week high,
/// unusual volume and confidence
pub fn attractiveness(
    combined: f64,
    momentum: f64,
    position: f64,
    volume_ratio: f64,
    confidence: f64,
) -> f64 {
    let momentum_term = if momentum > 0.0 {
        momentum.min(20.0) * 0.2
    } else {
        momentum * 0.1
    };
    let position_term = if position < 80.0 {
        (100.0 - position) * 0.15
    } else {
        (100.0 - position) * 0.05
    };
    let volume_term = if volume_ratio > 1.0 {
        (volume_ratio - 1.0).min(1.0) * 10.0
    } else {
        0.0
    };

    combined * 0.4 + momentum_term + position_term + volume_term + confidence * 0.15
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningResult {
    pub top_stocks: Vec<TopStock>,
    /// Symbols analyzed successfully
    pub total_analyzed: usize,
    pub failed_symbols: Vec<String>,
}

impl ScreeningResult {
    /// Fold per-symbol outcomes into a ranked result
    pub fn from_outcomes<I>(outcomes: I, top_n: usize) -> Self
    where
        I: IntoIterator<Item = (String, Result<TopStock>)>,
    {
        let (mut ranked, mut failed) = outcomes.into_iter().fold(
            (Vec::new(), Vec::new()),
            |(mut ok, mut failed), (symbol, outcome)| {
                match outcome {
                    Ok(stock) => ok.push(stock),
                    Err(e) => {
                        tracing::warn!(symbol = %symbol, error = %e, "symbol failed");
                        failed.push(symbol);
                    }
                }
                (ok, failed)
            },
        );

        ranked.sort_by(|a: &TopStock, b: &TopStock| {
            b.attractiveness_score
                .total_cmp(&a.attractiveness_score)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        let total_analyzed = ranked.len();
        ranked.truncate(top_n);
        failed.sort();

        Self {
            top_stocks: ranked,
            total_analyzed,
            failed_symbols: failed,
        }
    }
}

/// Runs the analysis pipeline across a universe
pub struct Screener {
    analyzer: Analyzer,
    max_concurrency: usize,
    symbol_timeout: Duration,
    top_n: usize,
}

impl Screener {
    pub fn new(analyzer: Analyzer, config: &EngineConfig) -> Self {
        Self {
            analyzer,
            max_concurrency: config.max_concurrency.max(1),
            symbol_timeout: config.symbol_timeout,
            top_n: config.top_n,
        }
    }

    /// Screener backed by the configured network providers
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(Analyzer::from_config(config)?, config))
    }

    /// Screen every symbol of `universe`
    pub async fn screen(&self, universe: &Universe) -> ScreeningResult {
        let symbols = universe.symbols();
        tracing::info!(
            universe = %universe,
            symbols = symbols.len(),
            concurrency = self.max_concurrency,
            "screening started"
        );

        let outcomes: Vec<(String, Result<TopStock>)> = stream::iter(symbols)
            .map(|symbol| self.screen_symbol(symbol))
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let result = ScreeningResult::from_outcomes(outcomes, self.top_n);
        tracing::info!(
            analyzed = result.total_analyzed,
            failed = result.failed_symbols.len(),
            "screening finished"
        );
        result
    }

    /// Market data runs under the per-symbol timeout; sentiment has its own
    /// budget inside the analyzer and only ever degrades to neutral.
    async fn screen_symbol(&self, symbol: String) -> (String, Result<TopStock>) {
        let market = tokio::time::timeout(
            self.symbol_timeout,
            AssertUnwindSafe(self.analyzer.fetch_market(&symbol)).catch_unwind(),
        )
        .await;

        let (history, snapshot) = match market {
            Ok(Ok(Ok(fetched))) => fetched,
            Ok(Ok(Err(e))) => return (symbol, Err(e)),
            Ok(Err(_)) => {
                let err = StockError::Panicked {
                    symbol: symbol.clone(),
                };
                return (symbol, Err(err));
            }
            Err(_) => {
                let err = StockError::Timeout {
                    symbol: symbol.clone(),
                    after: self.symbol_timeout,
                };
                return (symbol, Err(err));
            }
        };

        let sentiment = self.analyzer.fetch_sentiment(&symbol).await;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.analyzer
                .analyze_fetched(&symbol, &history, snapshot, sentiment)
                .map(|analysis| TopStock::from_analysis(&analysis))
        }))
        .unwrap_or_else(|_| {
            Err(StockError::Panicked {
                symbol: symbol.clone(),
            })
        });

        (symbol, outcome)
    }
}
