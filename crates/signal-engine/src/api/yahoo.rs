//! Yahoo Finance market data adapter

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;

use crate::analysis::CompanySnapshot;
use crate::config::HISTORY_RANGES;
use crate::error::{Result, StockError};
use crate::model::{PriceBar, PriceSeries};
use crate::provider::MarketDataProvider;

/// Yahoo Finance API client
pub struct YahooFinanceClient {
    connector: yahoo::YahooConnector,
    range: String,
}

impl YahooFinanceClient {
    /// Create a client fetching `range` of daily history, e.g. "1y"
    pub fn new(range: impl Into<String>) -> Result<Self> {
        let range = range.into();
        if !HISTORY_RANGES.contains(&range.as_str()) {
            return Err(StockError::ConfigError(format!("Invalid range: {range}")));
        }

        let connector =
            yahoo::YahooConnector::new().map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        Ok(Self { connector, range })
    }

    /// Get daily quotes between two instants
    pub async fn get_historical_quotes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<yahoo::Quote>> {
        // Convert chrono DateTime to time OffsetDateTime
        let start_odt = OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| StockError::YahooFinanceError(format!("Invalid start timestamp: {e}")))?;
        let end_odt = OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| StockError::YahooFinanceError(format!("Invalid end timestamp: {e}")))?;

        let response = self
            .connector
            .get_quote_history(symbol, start_odt, end_odt)
            .await
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        response
            .quotes()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))
    }
}

/// Start of a named history range ending at `end`
pub fn range_start(range: &str, end: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let days = match range {
        "3mo" => 90,
        "6mo" => 180,
        "1y" => 365,
        "2y" => 730,
        "5y" => 1825,
        "10y" => 3650,
        "max" => 36500, // ~100 years
        "ytd" => {
            return NaiveDate::from_ymd_opt(end.year(), 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
                .ok_or_else(|| StockError::ConfigError("Invalid range: ytd".to_string()));
        }
        _ => return Err(StockError::ConfigError(format!("Invalid range: {range}"))),
    };
    Ok(end - chrono::Duration::days(days))
}

/// (unix timestamp, open, high, low, close, volume)
type QuoteRow = (i64, f64, f64, f64, f64, u64);

/// Convert raw quotes into a validated series
pub fn quotes_to_series(quotes: &[yahoo::Quote]) -> Result<PriceSeries> {
    rows_to_series(
        quotes
            .iter()
            .map(|q| (q.timestamp as i64, q.open, q.high, q.low, q.close, q.volume))
            .collect(),
    )
}

/// Rows are sorted by timestamp and collapsed to one bar per session (the
/// last row of a day wins, which drops the intraday quote Yahoo appends for
/// the current session).
fn rows_to_series(mut rows: Vec<QuoteRow>) -> Result<PriceSeries> {
    rows.sort_by_key(|row| row.0);

    let mut bars: Vec<PriceBar> = Vec::with_capacity(rows.len());
    for (timestamp, open, high, low, close, volume) in rows {
        let date = DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| StockError::MalformedInput(format!("invalid quote timestamp {timestamp}")))?
            .date_naive();
        let bar = PriceBar::new(date, open, high, low, close, volume);

        match bars.last_mut() {
            Some(last) if last.date == date => *last = bar,
            _ => bars.push(bar),
        }
    }

    PriceSeries::new(bars)
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn fetch_history(&self, symbol: &str) -> Result<PriceSeries> {
        let end = Utc::now();
        let start = range_start(&self.range, end)?;
        let quotes = self.get_historical_quotes(symbol, start, end).await?;
        if quotes.is_empty() {
            return Err(StockError::upstream(symbol, "No data found"));
        }

        let series = quotes_to_series(&quotes)?;
        tracing::debug!(symbol, bars = series.len(), range = %self.range, "fetched history");
        Ok(series)
    }

    /// The Rust client exposes no profile endpoint, so the snapshot is derived
    /// from history and fundamentals stay empty
    async fn fetch_snapshot(&self, symbol: &str, history: &PriceSeries) -> Result<CompanySnapshot> {
        Ok(CompanySnapshot::from_history(symbol, history))
    }
}
