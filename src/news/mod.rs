// src/news/mod.rs
//! Staged news records. Each pipeline stage adds exactly the field it is
//! responsible for: retrieval yields `RawNewsItem`, stage-2 scoring yields
//! `ScoredNewsItem`, tier assignment yields `RankedNewsItem`. Earlier stages
//! cannot read fields that do not exist yet.

pub mod filter;
pub mod search;

use serde::{Deserialize, Serialize};

/// Hosts models commonly emit as filler; such URLs are rejected outright.
pub const PLACEHOLDER_DOMAIN: &str = "example.com";

/// A validated candidate article straight out of retrieval parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNewsItem {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub source: String,
    pub timestamp: String,
}

/// Retrieval item plus the stage-2 model relevance score in [0.0, 1.0].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredNewsItem {
    #[serde(flatten)]
    pub item: RawNewsItem,
    pub relevance_score: f64,
}

/// Scored item plus its score-derived importance tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedNewsItem {
    #[serde(flatten)]
    pub scored: ScoredNewsItem,
    pub importance: Importance,
}

impl RankedNewsItem {
    pub fn from_scored(scored: ScoredNewsItem) -> Self {
        let importance = Importance::from_score(scored.relevance_score);
        Self { scored, importance }
    }
}

/// Importance tiers partition [0, 1] at 0.5 and 0.8 with no gap or overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Importance {
    High,
    Medium,
    Low,
}

impl Importance {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Importance::High
        } else if score >= 0.5 {
            Importance::Medium
        } else {
            Importance::Low
        }
    }

    /// Positional display tier: top 3 High, next 3 Medium, remainder Low.
    pub fn from_rank(rank: usize) -> Self {
        if rank < 3 {
            Importance::High
        } else if rank < 6 {
            Importance::Medium
        } else {
            Importance::Low
        }
    }
}

/// Syntactic URL gate: scheme-prefixed and not a known placeholder host.
/// Reachability is explicitly not checked.
pub fn is_acceptable_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://"))
        && !lower.contains(PLACEHOLDER_DOMAIN)
}

/// Truncate on a char boundary; model text is not guaranteed ASCII.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
