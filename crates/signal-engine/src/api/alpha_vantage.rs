//! Alpha Vantage news sentiment client

use crate::config::ALPHA_VANTAGE_KEY_ENV;
use crate::error::{Result, StockError};
use crate::provider::SentimentProvider;
use crate::sentiment::{NewsArticle, SentimentResult};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Feed items scored per request
pub const FEED_LIMIT: usize = 10;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Alpha Vantage API client
#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl AlphaVantageClient {
    /// Create a new Alpha Vantage client with API key and rate limit
    ///
    /// # Arguments
    /// * `api_key` - Alpha Vantage API key
    /// * `rate_limit` - Maximum requests per minute (5 on the free tier)
    /// * `timeout` - HTTP request timeout
    pub fn new(api_key: impl Into<String>, rate_limit: u32, timeout: Duration) -> Result<Self> {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key: api_key.into(),
            rate_limiter,
        })
    }

    /// Create from the ALPHA_VANTAGE_API_KEY environment variable with the free tier limit
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(ALPHA_VANTAGE_KEY_ENV).map_err(|_| {
            StockError::ConfigError(format!("{ALPHA_VANTAGE_KEY_ENV} environment variable not set"))
        })?;

        Self::new(api_key, 5, Duration::from_secs(30))
    }

    /// Get scored news articles mentioning `symbol`, newest first
    pub async fn get_news_sentiment(&self, symbol: &str) -> Result<Vec<NewsArticle>> {
        // Wait for rate limiter
        self.rate_limiter.until_ready().await;

        let mut params = HashMap::new();
        params.insert("function", "NEWS_SENTIMENT");
        params.insert("tickers", symbol);
        params.insert("apikey", &self.api_key);

        let response = self.client.get(BASE_URL).query(&params).send().await?;

        if !response.status().is_success() {
            return Err(StockError::AlphaVantageError(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let data: Value = response.json().await?;
        parse_feed(&data)
    }
}

/// Extract scored articles from a NEWS_SENTIMENT response body
pub fn parse_feed(data: &Value) -> Result<Vec<NewsArticle>> {
    // Check for API error messages
    if let Some(error) = data.get("Error Message") {
        return Err(StockError::AlphaVantageError(error.to_string()));
    }

    if data.get("Note").is_some() || data.get("Information").is_some() {
        return Err(StockError::RateLimitExceeded {
            provider: "Alpha Vantage".to_string(),
        });
    }

    let Some(feed) = data.get("feed").and_then(Value::as_array) else {
        return Err(StockError::AlphaVantageError("No news feed found".to_string()));
    };

    Ok(feed.iter().take(FEED_LIMIT).map(parse_article).collect())
}

fn parse_article(item: &Value) -> NewsArticle {
    let text = |key: &str| item.get(key).and_then(Value::as_str).unwrap_or_default().to_string();

    // Scores arrive as numbers or numeric strings
    let sentiment = match item.get("overall_sentiment_score") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    };

    let published = text("time_published");
    let date = NaiveDateTime::parse_from_str(&published, "%Y%m%dT%H%M%S")
        .map(|dt| dt.date().format("%Y-%m-%d").to_string())
        .unwrap_or(published);

    NewsArticle {
        title: text("title"),
        url: text("url"),
        source: text("source"),
        sentiment: if sentiment.is_finite() {
            sentiment.clamp(-1.0, 1.0)
        } else {
            0.0
        },
        date,
        summary: text("summary"),
    }
}

#[async_trait]
impl SentimentProvider for AlphaVantageClient {
    async fn fetch_sentiment(&self, symbol: &str) -> Result<SentimentResult> {
        let articles = self.get_news_sentiment(symbol).await?;
        tracing::debug!(symbol, articles = articles.len(), "scored news feed");
        Ok(SentimentResult::from_articles(articles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_creation() {
        let client = AlphaVantageClient::new("test_key", 5, Duration::from_secs(5)).unwrap();
        assert_eq!(client.api_key, "test_key");
    }

    #[test]
    fn test_parse_feed() {
        let body = json!({
            "items": "2",
            "feed": [
                {
                    "title": "Chipmaker beats estimates",
                    "url": "https://example.com/a",
                    "time_published": "20240501T133000",
                    "summary": "Revenue up",
                    "source": "Reuters",
                    "overall_sentiment_score": 0.42
                },
                {
                    "title": "Guidance cut",
                    "url": "https://example.com/b",
                    "time_published": "garbled",
                    "summary": "",
                    "source": "Benzinga",
                    "overall_sentiment_score": "-1.7"
                }
            ]
        });

        let articles = parse_feed(&body).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].date, "2024-05-01");
        assert_eq!(articles[0].sentiment, 0.42);
        assert_eq!(articles[1].sentiment, -1.0);
        assert_eq!(articles[1].date, "garbled");
    }

    #[test]
    fn test_parse_feed_limits_items() {
        let items: Vec<_> = (0..25)
            .map(|i| json!({"title": format!("t{i}"), "source": "S", "overall_sentiment_score": 0.1}))
            .collect();
        let articles = parse_feed(&json!({ "feed": items })).unwrap();
        assert_eq!(articles.len(), FEED_LIMIT);
    }

    #[test]
    fn test_parse_feed_errors() {
        assert!(matches!(
            parse_feed(&json!({"Note": "Thank you for using Alpha Vantage!"})),
            Err(StockError::RateLimitExceeded { .. })
        ));
        assert!(matches!(
            parse_feed(&json!({"Error Message": "Invalid API call"})),
            Err(StockError::AlphaVantageError(_))
        ));
        assert!(parse_feed(&json!({})).is_err());
    }

    #[tokio::test]
    #[ignore] // Requires API key and network access
    async fn test_fetch_sentiment() {
        let client = AlphaVantageClient::from_env().unwrap();
        let result = client.fetch_sentiment("AAPL").await.unwrap();
        assert!((-100.0..=100.0).contains(&result.score));
    }
}
