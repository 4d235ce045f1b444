//! Technical and sentiment signal engine
//!
//! This crate turns a daily price history and a news sentiment score into a
//! trading recommendation. It includes:
//!
//! - Indicator series (SMA 20/50/150/200, RSI, MACD, Bollinger Bands, CCI)
//! - Tom DeMark sequential setup detection
//! - Per-indicator bullish/bearish/neutral classification
//! - Support/resistance levels and price targets with risk/reward
//! - Weighted technical score blended with sentiment into a recommendation
//! - Concurrent screening of a ticker universe ranked by attractiveness
//!
//! # Architecture
//!
//! The analysis pipeline ([`analyze_series`]) is pure: it takes a
//! [`PriceSeries`], a [`SentimentResult`] and a [`CompanySnapshot`] and never
//! touches the network. Market data and news arrive through the
//! [`MarketDataProvider`] and [`SentimentProvider`] traits, with Yahoo Finance
//! and Alpha Vantage adapters in [`api`]. Market data calls share one
//! [`ProviderGate`]; news calls keep their own quota and fall back to neutral
//! sentiment when they run out of time.
//!
//! # Example
//!
//! ```rust,ignore
//! use signal_engine::{EngineConfig, Screener, Universe};
//!
//! #[tokio::main]
//! async fn main() -> signal_engine::Result<()> {
//!     let config = EngineConfig::builder().with_env_api_key().build()?;
//!
//!     let screener = Screener::from_config(&config)?;
//!     let result = screener.screen(&Universe::Nasdaq100).await;
//!
//!     for stock in &result.top_stocks {
//!         println!("{} {:.1}", stock.symbol, stock.attractiveness_score);
//!     }
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod api;
pub mod cache;
pub mod config;
pub mod demark;
pub mod error;
pub mod indicators;
pub mod levels;
pub mod model;
pub mod provider;
pub mod recommendation;
pub mod screening;
pub mod sentiment;
pub mod signals;
pub mod targets;
pub mod universe;

// Re-export main types for convenience
pub use analysis::{AnalysisOptions, CompanySnapshot, StockAnalysis, analyze_series, analyze_series_with};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::{Result, StockError};
pub use indicators::{IndicatorParams, IndicatorSeries};
pub use levels::SupportResistanceLevel;
pub use model::{PriceBar, PriceSeries};
pub use provider::{Analyzer, MarketDataProvider, NeutralSentiment, ProviderGate, SentimentProvider};
pub use recommendation::{Recommendation, RecommendationLabel};
pub use screening::{Screener, ScreeningResult, TopStock};
pub use sentiment::{NewsArticle, SentimentResult};
pub use signals::{IndicatorId, SignalLabel};
pub use targets::PriceTargets;
pub use universe::Universe;
