//! News sentiment input
//!
//! Scoring individual articles belongs to the news provider. This module holds
//! the consumed shape and the aggregation rule providers use to roll
//! per-article scores into one number.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Articles kept on a result, most impactful first
pub const MAX_ARTICLES: usize = 10;
/// Distinct sources needed for the full diversity bonus
const DIVERSITY_SOURCES: f64 = 5.0;
/// Maximum relative boost from source diversity
const DIVERSITY_BONUS: f64 = 0.1;

/// One scored news article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
    pub source: String,
    /// Article sentiment in [-1, 1]
    pub sentiment: f64,
    pub date: String,
    pub summary: String,
}

/// Aggregated news sentiment for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// Overall score in [-100, 100]
    pub score: f64,
    pub description: String,
    pub articles: Vec<NewsArticle>,
}

impl Default for SentimentResult {
    fn default() -> Self {
        Self::neutral()
    }
}

impl SentimentResult {
    /// Score 0, no articles
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            description: describe(0.0).to_string(),
            articles: Vec::new(),
        }
    }

    /// Result with a fixed score and no articles
    pub fn with_score(score: f64) -> Self {
        let score = clamp_score(score);
        Self {
            score,
            description: describe(score).to_string(),
            articles: Vec::new(),
        }
    }

    /// Aggregate scored articles
    ///
    /// Mean article sentiment, boosted by up to 10% for source diversity
    /// (five distinct sources earn the full bonus), scaled to [-100, 100].
    pub fn from_articles(mut articles: Vec<NewsArticle>) -> Self {
        for article in &mut articles {
            article.sentiment = if article.sentiment.is_finite() {
                article.sentiment.clamp(-1.0, 1.0)
            } else {
                0.0
            };
        }

        if articles.is_empty() {
            return Self::neutral();
        }

        let mean = articles.iter().map(|a| a.sentiment).sum::<f64>() / articles.len() as f64;
        let sources: HashSet<&str> = articles
            .iter()
            .map(|a| a.source.as_str())
            .filter(|s| !s.is_empty())
            .collect();
        let bonus = (sources.len() as f64 / DIVERSITY_SOURCES).min(1.0) * DIVERSITY_BONUS;
        let score = clamp_score(mean * (1.0 + bonus) * 100.0);

        articles.sort_by(|a, b| b.sentiment.abs().total_cmp(&a.sentiment.abs()));
        articles.truncate(MAX_ARTICLES);

        Self {
            score,
            description: describe(score).to_string(),
            articles,
        }
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(-100.0, 100.0)
    } else {
        0.0
    }
}

/// Positive / Negative / Neutral by sign
pub fn describe(score: f64) -> &'static str {
    if score > 0.0 {
        "Positive"
    } else if score < 0.0 {
        "Negative"
    } else {
        "Neutral"
    }
}
