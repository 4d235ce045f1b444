//! Provider seams and the single-ticker service entry point
//!
//! The core pipeline is pure; everything that talks to the outside world sits
//! behind [`MarketDataProvider`] and [`SentimentProvider`]. Market data calls
//! go through one shared [`ProviderGate`] so concurrency and request rate are
//! bounded centrally rather than per task. News providers keep their own
//! quota and are called outside the gate under a separate time budget.

use async_trait::async_trait;
use futures::FutureExt;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::future::Future;
use std::num::NonZeroU32;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::analysis::{AnalysisOptions, CompanySnapshot, StockAnalysis, analyze_series_with};
use crate::api::{AlphaVantageClient, YahooFinanceClient};
use crate::cache::CachedMarketData;
use crate::config::{DEFAULT_SENTIMENT_TIMEOUT, EngineConfig};
use crate::error::{Result, StockError};
use crate::model::PriceSeries;
use crate::sentiment::SentimentResult;

/// Source of daily price history and company metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars for `symbol`, oldest first
    async fn fetch_history(&self, symbol: &str) -> Result<PriceSeries>;

    /// Company snapshot; `history` is the series just fetched for `symbol`
    async fn fetch_snapshot(&self, symbol: &str, history: &PriceSeries) -> Result<CompanySnapshot>;
}

/// Source of scored news sentiment
///
/// Implementations that enforce their own request quota wait on it inside
/// `fetch_sentiment`; callers bound that wait with a timeout.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SentimentProvider: Send + Sync {
    async fn fetch_sentiment(&self, symbol: &str) -> Result<SentimentResult>;
}

/// Sentiment provider that always reports neutral news
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralSentiment;

#[async_trait]
impl SentimentProvider for NeutralSentiment {
    async fn fetch_sentiment(&self, _symbol: &str) -> Result<SentimentResult> {
        Ok(SentimentResult::neutral())
    }
}

type SharedRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Central throttle for outbound provider calls
///
/// A semaphore caps requests in flight and a direct rate limiter caps
/// requests per minute. Share one gate by `Arc` across every task.
pub struct ProviderGate {
    permits: Semaphore,
    rate_limiter: SharedRateLimiter,
}

impl ProviderGate {
    pub fn new(max_in_flight: usize, requests_per_minute: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));
        Self {
            permits: Semaphore::new(max_in_flight.max(1)),
            rate_limiter: RateLimiter::direct(quota),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_in_flight_requests, config.requests_per_minute)
    }

    /// Run one outbound call once a permit and a rate-limit slot are free
    pub async fn run<F, T>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _permit = self.permits.acquire().await.map_err(|_| StockError::RateLimitExceeded {
            provider: "provider gate closed".to_string(),
        })?;
        self.rate_limiter.until_ready().await;
        call.await
    }

    /// Permits currently free
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

/// Fetches inputs through the providers and runs the analysis pipeline
#[derive(Clone)]
pub struct Analyzer {
    market: Arc<dyn MarketDataProvider>,
    sentiment: Arc<dyn SentimentProvider>,
    gate: Arc<ProviderGate>,
    options: AnalysisOptions,
    sentiment_timeout: Duration,
}

impl Analyzer {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        sentiment: Arc<dyn SentimentProvider>,
        gate: Arc<ProviderGate>,
    ) -> Self {
        Self {
            market,
            sentiment,
            gate,
            options: AnalysisOptions::default(),
            sentiment_timeout: DEFAULT_SENTIMENT_TIMEOUT,
        }
    }

    /// Override the analysis options
    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    /// Override the budget for one sentiment fetch
    pub fn with_sentiment_timeout(mut self, timeout: Duration) -> Self {
        self.sentiment_timeout = timeout;
        self
    }

    /// Wire up the Yahoo Finance and Alpha Vantage adapters
    ///
    /// Without an Alpha Vantage key every symbol gets neutral sentiment.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;

        let yahoo = YahooFinanceClient::new(&config.history_range)?;
        let market: Arc<dyn MarketDataProvider> = match config.cache_ttl {
            Some(ttl) => Arc::new(CachedMarketData::new(yahoo, ttl)),
            None => Arc::new(yahoo),
        };

        let sentiment: Arc<dyn SentimentProvider> = match &config.alpha_vantage_api_key {
            Some(key) => Arc::new(AlphaVantageClient::new(
                key.clone(),
                config.news_requests_per_minute,
                config.request_timeout,
            )?),
            None => {
                tracing::info!("no Alpha Vantage key configured, news sentiment disabled");
                Arc::new(NeutralSentiment)
            }
        };

        Ok(Self::new(market, sentiment, Arc::new(ProviderGate::from_config(config)))
            .with_options(config.analysis_options())
            .with_sentiment_timeout(config.sentiment_timeout))
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Fetch history and snapshot for one symbol through the gate
    pub async fn fetch_market(&self, symbol: &str) -> Result<(PriceSeries, CompanySnapshot)> {
        let history = self
            .gate
            .run(self.market.fetch_history(symbol))
            .await
            .map_err(|e| upstream_error(symbol, e))?;

        let snapshot = self
            .gate
            .run(self.market.fetch_snapshot(symbol, &history))
            .await
            .map_err(|e| upstream_error(symbol, e))?;

        Ok((history, snapshot))
    }

    /// Fetch news sentiment for one symbol; never fails
    ///
    /// Runs outside the gate, bounded by the sentiment timeout. An error, a
    /// timeout or a panic in the provider yields neutral sentiment.
    pub async fn fetch_sentiment(&self, symbol: &str) -> SentimentResult {
        let call = AssertUnwindSafe(async { self.sentiment.fetch_sentiment(symbol).await }).catch_unwind();

        let reason = match tokio::time::timeout(self.sentiment_timeout, call).await {
            Ok(Ok(Ok(sentiment))) => return sentiment,
            Ok(Ok(Err(e))) => e.to_string(),
            Ok(Err(_)) => "sentiment provider panicked".to_string(),
            Err(_) => format!("no response within {:?}", self.sentiment_timeout),
        };

        tracing::warn!(symbol, error = %reason, "sentiment unavailable, using neutral");
        SentimentResult::neutral()
    }

    /// Run the pure pipeline on already fetched inputs
    pub fn analyze_fetched(
        &self,
        symbol: &str,
        history: &PriceSeries,
        snapshot: CompanySnapshot,
        sentiment: SentimentResult,
    ) -> Result<StockAnalysis> {
        tracing::debug!(symbol, bars = history.len(), "analyzing");
        analyze_series_with(symbol, history, sentiment, snapshot, &self.options)
    }

    /// Fetch and analyze one symbol
    ///
    /// History and snapshot failures are fatal; sentiment degrades to neutral.
    pub async fn analyze(&self, symbol: &str) -> Result<StockAnalysis> {
        let (history, snapshot) = self.fetch_market(symbol).await?;
        let sentiment = self.fetch_sentiment(symbol).await;
        self.analyze_fetched(symbol, &history, snapshot, sentiment)
    }
}

/// Provider errors surface as upstream failures; rejected input keeps its kind
fn upstream_error(symbol: &str, error: StockError) -> StockError {
    match error {
        StockError::UpstreamFetchFailure { .. } | StockError::MalformedInput(_) => error,
        other => StockError::upstream(symbol, other),
    }
}
