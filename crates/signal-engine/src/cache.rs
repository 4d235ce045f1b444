//! Caching layer for fetched price history
//!
//! Only raw provider output is cached. Indicators, signals and scores are
//! always recomputed from it.

use async_trait::async_trait;
use cached::{Cached, TimedCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::analysis::CompanySnapshot;
use crate::error::Result;
use crate::model::PriceSeries;
use crate::provider::MarketDataProvider;

/// TTL cache decorator over any market data provider
pub struct CachedMarketData<P> {
    inner: P,
    history: Arc<RwLock<TimedCache<String, PriceSeries>>>,
}

impl<P: MarketDataProvider> CachedMarketData<P> {
    /// Wrap `inner`, keeping fetched history for `ttl`
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            history: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Drop the cached history for one symbol
    pub async fn invalidate(&self, symbol: &str) {
        let mut cache = self.history.write().await;
        let _ = cache.cache_remove(&normalize(symbol));
    }

    /// Clear all cached entries
    pub async fn clear(&self) {
        let mut cache = self.history.write().await;
        cache.cache_clear();
    }

    /// Get the number of cached entries
    pub async fn len(&self) -> usize {
        let cache = self.history.read().await;
        cache.cache_size()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

#[async_trait]
impl<P: MarketDataProvider> MarketDataProvider for CachedMarketData<P> {
    async fn fetch_history(&self, symbol: &str) -> Result<PriceSeries> {
        let key = normalize(symbol);

        // cache_get updates hit counters, so it needs the write lock
        let hit = self.history.write().await.cache_get(&key).cloned();
        if let Some(series) = hit {
            tracing::debug!("Cache hit for {}", key);
            return Ok(series);
        }

        tracing::debug!("Cache miss for {}", key);
        let series = self.inner.fetch_history(symbol).await?;

        let mut cache = self.history.write().await;
        let _ = cache.cache_set(key, series.clone());
        Ok(series)
    }

    async fn fetch_snapshot(&self, symbol: &str, history: &PriceSeries) -> Result<CompanySnapshot> {
        self.inner.fetch_snapshot(symbol, history).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StockError;
    use crate::model::test_support::series_from_closes;
    use crate::provider::MockMarketDataProvider;

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let mut inner = MockMarketDataProvider::new();
        inner
            .expect_fetch_history()
            .times(1)
            .returning(|_| Ok(series_from_closes(&[10.0, 11.0])));

        let cached = CachedMarketData::new(inner, Duration::from_secs(60));
        let first = cached.fetch_history("aapl").await.unwrap();
        let second = cached.fetch_history("AAPL ").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cached.len().await, 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let mut inner = MockMarketDataProvider::new();
        inner
            .expect_fetch_history()
            .times(2)
            .returning(|s| Err(StockError::upstream(s, "down")));

        let cached = CachedMarketData::new(inner, Duration::from_secs(60));
        assert!(cached.fetch_history("MSFT").await.is_err());
        assert!(cached.fetch_history("MSFT").await.is_err());
        assert!(cached.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let mut inner = MockMarketDataProvider::new();
        inner
            .expect_fetch_history()
            .times(3)
            .returning(|_| Ok(series_from_closes(&[5.0])));

        let cached = CachedMarketData::new(inner, Duration::from_secs(60));
        cached.fetch_history("A").await.unwrap();
        cached.fetch_history("B").await.unwrap();
        assert_eq!(cached.len().await, 2);

        cached.invalidate("a").await;
        assert_eq!(cached.len().await, 1);
        cached.fetch_history("A").await.unwrap();

        cached.clear().await;
        assert!(cached.is_empty().await);
    }

    #[tokio::test]
    async fn test_snapshot_passes_through() {
        let mut inner = MockMarketDataProvider::new();
        inner
            .expect_fetch_snapshot()
            .times(2)
            .returning(|s, h| Ok(CompanySnapshot::from_history(s, h)));

        let cached = CachedMarketData::new(inner, Duration::from_secs(60));
        let history = series_from_closes(&[1.0, 2.0]);
        cached.fetch_snapshot("X", &history).await.unwrap();
        let snapshot = cached.fetch_snapshot("X", &history).await.unwrap();
        assert_eq!(snapshot.current_price, 2.0);
    }
}
