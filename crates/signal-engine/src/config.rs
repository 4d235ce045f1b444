//! Configuration for analysis and screening runs

use crate::analysis::AnalysisOptions;
use crate::error::{Result, StockError};
use crate::signals::ClassifierConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the Alpha Vantage key
pub const ALPHA_VANTAGE_KEY_ENV: &str = "ALPHA_VANTAGE_API_KEY";

/// Default budget for one news sentiment fetch
pub const DEFAULT_SENTIMENT_TIMEOUT: Duration = Duration::from_secs(15);

/// History ranges the market data provider understands
pub const HISTORY_RANGES: [&str; 8] = ["3mo", "6mo", "ytd", "1y", "2y", "5y", "10y", "max"];

/// Configuration for analysis and screening runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Daily history requested per symbol, e.g. "1y"
    pub history_range: String,

    /// Symbols analyzed concurrently during screening
    pub max_concurrency: usize,

    /// Outbound provider requests allowed in flight at once
    pub max_in_flight_requests: usize,

    /// Outbound market data requests per minute, across all tasks
    pub requests_per_minute: u32,

    /// News API requests per minute (5 on the free tier)
    pub news_requests_per_minute: u32,

    /// Budget for one symbol's market data fetch + analysis
    pub symbol_timeout: Duration,

    /// Budget for one sentiment fetch; on expiry sentiment is neutral
    pub sentiment_timeout: Duration,

    /// HTTP request timeout
    pub request_timeout: Duration,

    /// Ranked stocks returned by a screen
    pub top_n: usize,

    /// A Demark setup counts only if completed within this many bars
    pub demark_recency_bars: usize,

    /// TTL for cached price history; `None` disables caching
    pub cache_ttl: Option<Duration>,

    /// Alpha Vantage API key (optional)
    pub alpha_vantage_api_key: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_range: "1y".to_string(),
            max_concurrency: 8,
            max_in_flight_requests: 4,
            requests_per_minute: 120,
            news_requests_per_minute: 5,
            symbol_timeout: Duration::from_secs(60),
            sentiment_timeout: DEFAULT_SENTIMENT_TIMEOUT,
            request_timeout: Duration::from_secs(30),
            top_n: 10,
            demark_recency_bars: 5,
            cache_ttl: None,
            alpha_vantage_api_key: None,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Load Alpha Vantage API key from environment
    pub fn with_env_api_key(mut self) -> Self {
        if let Ok(key) = std::env::var(ALPHA_VANTAGE_KEY_ENV) {
            self.alpha_vantage_api_key = Some(key);
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !HISTORY_RANGES.contains(&self.history_range.as_str()) {
            return Err(StockError::ConfigError(format!(
                "unsupported history range '{}', expected one of {}",
                self.history_range,
                HISTORY_RANGES.join(", ")
            )));
        }

        let counts = [
            ("max_concurrency", self.max_concurrency),
            ("max_in_flight_requests", self.max_in_flight_requests),
            ("top_n", self.top_n),
            ("demark_recency_bars", self.demark_recency_bars),
        ];
        if let Some((name, _)) = counts.iter().find(|(_, v)| *v == 0) {
            return Err(StockError::ConfigError(format!("{name} must be greater than 0")));
        }

        if self.requests_per_minute == 0 || self.news_requests_per_minute == 0 {
            return Err(StockError::ConfigError(
                "request rates must be greater than 0".to_string(),
            ));
        }

        if self.symbol_timeout.is_zero()
            || self.sentiment_timeout.is_zero()
            || self.request_timeout.is_zero()
        {
            return Err(StockError::ConfigError(
                "timeouts must be non-zero".to_string(),
            ));
        }

        if self.cache_ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(StockError::ConfigError(
                "cache_ttl must be non-zero when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Per-analysis options derived from this configuration
    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            classifier: ClassifierConfig {
                demark_recency_bars: self.demark_recency_bars,
                ..ClassifierConfig::default()
            },
            ..AnalysisOptions::default()
        }
    }
}

/// Builder for EngineConfig
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    history_range: Option<String>,
    max_concurrency: Option<usize>,
    max_in_flight_requests: Option<usize>,
    requests_per_minute: Option<u32>,
    news_requests_per_minute: Option<u32>,
    symbol_timeout: Option<Duration>,
    sentiment_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    top_n: Option<usize>,
    demark_recency_bars: Option<usize>,
    cache_ttl: Option<Duration>,
    alpha_vantage_api_key: Option<String>,
}

impl EngineConfigBuilder {
    pub fn history_range(mut self, range: impl Into<String>) -> Self {
        self.history_range = Some(range.into());
        self
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    pub fn max_in_flight_requests(mut self, n: usize) -> Self {
        self.max_in_flight_requests = Some(n);
        self
    }

    pub fn requests_per_minute(mut self, n: u32) -> Self {
        self.requests_per_minute = Some(n);
        self
    }

    pub fn news_requests_per_minute(mut self, n: u32) -> Self {
        self.news_requests_per_minute = Some(n);
        self
    }

    /// Set the per-symbol timeout
    pub fn symbol_timeout(mut self, duration: Duration) -> Self {
        self.symbol_timeout = Some(duration);
        self
    }

    /// Set the sentiment fetch timeout
    pub fn sentiment_timeout(mut self, duration: Duration) -> Self {
        self.sentiment_timeout = Some(duration);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    pub fn demark_recency_bars(mut self, bars: usize) -> Self {
        self.demark_recency_bars = Some(bars);
        self
    }

    /// Enable the price history cache
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Set Alpha Vantage API key
    pub fn alpha_vantage_api_key(mut self, key: impl Into<String>) -> Self {
        self.alpha_vantage_api_key = Some(key.into());
        self
    }

    /// Load Alpha Vantage API key from environment
    pub fn with_env_api_key(mut self) -> Self {
        if let Ok(key) = std::env::var(ALPHA_VANTAGE_KEY_ENV) {
            self.alpha_vantage_api_key = Some(key);
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<EngineConfig> {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            history_range: self.history_range.unwrap_or(defaults.history_range),
            max_concurrency: self.max_concurrency.unwrap_or(defaults.max_concurrency),
            max_in_flight_requests: self
                .max_in_flight_requests
                .unwrap_or(defaults.max_in_flight_requests),
            requests_per_minute: self.requests_per_minute.unwrap_or(defaults.requests_per_minute),
            news_requests_per_minute: self
                .news_requests_per_minute
                .unwrap_or(defaults.news_requests_per_minute),
            symbol_timeout: self.symbol_timeout.unwrap_or(defaults.symbol_timeout),
            sentiment_timeout: self.sentiment_timeout.unwrap_or(defaults.sentiment_timeout),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            top_n: self.top_n.unwrap_or(defaults.top_n),
            demark_recency_bars: self.demark_recency_bars.unwrap_or(defaults.demark_recency_bars),
            cache_ttl: self.cache_ttl.or(defaults.cache_ttl),
            alpha_vantage_api_key: self.alpha_vantage_api_key,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.history_range, "1y");
        assert_eq!(config.top_n, 10);
        assert_eq!(config.symbol_timeout, Duration::from_secs(60));
        assert_eq!(config.sentiment_timeout, DEFAULT_SENTIMENT_TIMEOUT);
        assert!(config.cache_ttl.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::builder()
            .history_range("2y")
            .max_concurrency(16)
            .top_n(25)
            .cache_ttl(Duration::from_secs(300))
            .alpha_vantage_api_key("demo")
            .build()
            .unwrap();

        assert_eq!(config.history_range, "2y");
        assert_eq!(config.max_concurrency, 16);
        assert_eq!(config.top_n, 25);
        assert_eq!(config.cache_ttl, Some(Duration::from_secs(300)));
        assert_eq!(config.alpha_vantage_api_key.as_deref(), Some("demo"));
    }

    #[test]
    fn test_validation_rejects_zero_counts() {
        let err = EngineConfig::builder().max_concurrency(0).build().unwrap_err();
        assert!(err.to_string().contains("max_concurrency"));

        let config = EngineConfig {
            requests_per_minute: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_unknown_range() {
        let err = EngineConfig::builder().history_range("1d").build().unwrap_err();
        assert!(matches!(err, StockError::ConfigError(_)));
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let config = EngineConfig {
            symbol_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let err = EngineConfig::builder()
            .sentiment_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, StockError::ConfigError(_)));
    }

    #[test]
    fn test_analysis_options_carry_recency() {
        let config = EngineConfig::builder().demark_recency_bars(9).build().unwrap();
        assert_eq!(config.analysis_options().classifier.demark_recency_bars, 9);
    }
}
