//! Error types for signal engine operations

use std::time::Duration;
use thiserror::Error;

/// Signal engine errors
#[derive(Debug, Error)]
pub enum StockError {
    /// Fewer bars than an indicator's minimum window
    #[error("Insufficient history for {indicator}: need {required} bars, have {available}")]
    InsufficientHistory {
        indicator: String,
        required: usize,
        available: usize,
    },

    /// Price target denominator is not positive
    #[error("Invalid range: current price {current_price} is not above stop loss {stop_loss}")]
    InvalidRange { current_price: f64, stop_loss: f64 },

    /// External data or sentiment provider failed for one symbol
    #[error("Upstream fetch failed for {symbol}: {reason}")]
    UpstreamFetchFailure { symbol: String, reason: String },

    /// Input series rejected before any indicator runs
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Per-symbol pipeline exceeded its time budget
    #[error("Analysis of {symbol} timed out after {after:?}")]
    Timeout { symbol: String, after: Duration },

    /// Per-symbol pipeline panicked; caught by the screener
    #[error("Analysis of {symbol} panicked")]
    Panicked { symbol: String },

    /// Rate limit exceeded for API
    #[error("Rate limit exceeded for {provider}")]
    RateLimitExceeded { provider: String },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Alpha Vantage API error
    #[error("Alpha Vantage error: {0}")]
    AlphaVantageError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for signal engine operations
pub type Result<T> = std::result::Result<T, StockError>;

impl StockError {
    /// Wrap any provider-side error as an upstream failure for `symbol`
    pub fn upstream(symbol: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        StockError::UpstreamFetchFailure {
            symbol: symbol.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error originated outside the engine (provider, network, rate limit)
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            StockError::UpstreamFetchFailure { .. }
                | StockError::RateLimitExceeded { .. }
                | StockError::NetworkError(_)
                | StockError::YahooFinanceError(_)
                | StockError::AlphaVantageError(_)
                | StockError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StockError::MalformedInput("no price bars".to_string());
        assert_eq!(err.to_string(), "Malformed input: no price bars");

        let err = StockError::UpstreamFetchFailure {
            symbol: "AAPL".to_string(),
            reason: "No data found".to_string(),
        };
        assert_eq!(err.to_string(), "Upstream fetch failed for AAPL: No data found");

        let err = StockError::InsufficientHistory {
            indicator: "sma200".to_string(),
            required: 200,
            available: 120,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient history for sma200: need 200 bars, have 120"
        );
    }

    #[test]
    fn test_upstream_classification() {
        assert!(StockError::upstream("MSFT", "boom").is_upstream());
        assert!(
            StockError::Timeout {
                symbol: "MSFT".to_string(),
                after: Duration::from_secs(1),
            }
            .is_upstream()
        );
        assert!(!StockError::MalformedInput("x".to_string()).is_upstream());
        assert!(
            !StockError::InvalidRange {
                current_price: 1.0,
                stop_loss: 2.0,
            }
            .is_upstream()
        );
    }
}
