// src/analysis/mod.rs
//! Impact-analysis records: the structured result recovered from free-form
//! model narrative, and the complete per-move `Analysis` stored in history.

pub mod cleanup;
pub mod impact;

use serde::{Deserialize, Serialize};

use crate::market::PriceChange;
use crate::news::{Importance, RankedNewsItem};

/// News item as presented inside an impact result. Carries BOTH tier
/// assignments: `score_importance` comes from the filter's relevance score,
/// `importance` is the positional display tier (top 3 High, next 3 Medium,
/// rest Low). The presentation layer reads the positional one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayNewsItem {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub source: String,
    pub timestamp: String,
    pub relevance_score: f64,
    pub score_importance: Importance,
    pub importance: Importance,
}

impl DisplayNewsItem {
    pub fn from_ranked(ranked: &RankedNewsItem, rank: usize) -> Self {
        Self {
            title: ranked.scored.item.title.clone(),
            url: ranked.scored.item.url.clone(),
            snippet: ranked.scored.item.snippet.clone(),
            source: ranked.scored.item.source.clone(),
            timestamp: ranked.scored.item.timestamp.clone(),
            relevance_score: ranked.scored.relevance_score,
            score_importance: ranked.importance,
            importance: Importance::from_rank(rank),
        }
    }
}

/// Structured impact analysis. Narrative fields are always populated with
/// non-empty placeholders when extraction fails; only the provider-error
/// path leaves `key_factors` empty and sets `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactResult {
    pub ticker: String,
    pub price_change: PriceChange,
    pub key_factors: Vec<String>,
    pub impact_analysis: String,
    pub ranked_news: Vec<DisplayNewsItem>,
    pub insights: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One completed pipeline pass for one significant move. Immutable once
/// inserted into the recent-analysis store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub ticker: String,
    pub price_change: PriceChange,
    pub news_articles: Vec<RankedNewsItem>,
    pub analysis: ImpactResult,
}
