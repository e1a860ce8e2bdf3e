// src/news/filter.rs
//! Two-stage relevance filter: deterministic keyword inclusion, then
//! model-based scalar scoring. Stage 1 is deliberately lenient: short
//! candidate lists and items without any text pass through, deferring the
//! decision to stage 2.

use metrics::counter;
use tracing::{debug, info};

use crate::llm::{ChatMessage, DynLlmClient};
use crate::news::{RankedNewsItem, RawNewsItem, ScoredNewsItem};

/// Candidate lists at or below this size are treated as pre-filtered by
/// retrieval and skip the keyword gate.
const PREFILTERED_MAX: usize = 5;

const NEUTRAL_SCORE: f64 = 0.5;

/// Static ticker -> company/asset synonyms for the keyword stage.
const TICKER_SYNONYMS: &[(&str, &[&str])] = &[
    ("TSLA", &["tesla", "tesla inc", "tesla motors"]),
    ("SPY", &["s&p 500", "sp500", "s&p"]),
    ("QQQ", &["nasdaq"]),
    ("GLD", &["gold"]),
    ("BTC", &["bitcoin", "crypto", "cryptocurrency"]),
];

/// Generic financial vocabulary; any hit keeps an item in stage 1.
const FINANCIAL_KEYWORDS: &[&str] = &[
    "market",
    "financial",
    "economy",
    "fed",
    "federal reserve",
    "inflation",
    "cpi",
    "earnings",
    "stock",
    "equity",
    "shares",
    "treasury",
    "bond",
    "crypto",
    "bitcoin",
    "gold",
    "trading",
    "investor",
    "investment",
    "price",
    "share price",
    "revenue",
    "profit",
    "loss",
    "quarterly",
    "annual",
];

pub struct NewsFilter {
    llm: DynLlmClient,
}

impl NewsFilter {
    pub fn new(llm: DynLlmClient) -> Self {
        Self { llm }
    }

    /// Narrow and rank candidates. Output is sorted non-increasing by
    /// relevance score, stable for ties, each item annotated with its
    /// score-derived importance tier.
    pub async fn filter_news(
        &self,
        items: Vec<RawNewsItem>,
        context: &str,
        ticker: &str,
    ) -> Vec<RankedNewsItem> {
        let total = items.len();
        let kept = stage_one(items, ticker);
        info!(
            ticker,
            before = total,
            after = kept.len(),
            "keyword filter applied"
        );
        counter!("news_filtered_out_total").increment((total - kept.len()) as u64);

        let mut scored = Vec::with_capacity(kept.len());
        for item in kept {
            let score = self.score_relevance(&item, context, ticker).await;
            scored.push(ScoredNewsItem {
                item,
                relevance_score: score,
            });
        }

        // Stable sort preserves stage-1 order for equal scores.
        scored.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        scored.into_iter().map(RankedNewsItem::from_scored).collect()
    }

    /// Ask the model for a scalar in [0, 1]. Anything off-protocol (a parse
    /// failure, an out-of-range number, a provider error) degrades to the
    /// neutral 0.5 instead of failing the item.
    async fn score_relevance(&self, item: &RawNewsItem, context: &str, ticker: &str) -> f64 {
        let prompt = format!(
            r#"Rate the relevance of this news article to our strategic goals and the ticker {ticker}.

Strategic Context:
{context}

News Article:
Title: {title}
Content: {snippet}

Rate the relevance on a scale of 0.0 to 1.0, where:
- 1.0 = Highly relevant and directly impacts our strategic goals
- 0.5 = Moderately relevant
- 0.0 = Not relevant

Respond with only a number between 0.0 and 1.0."#,
            title = item.title,
            snippet = item.snippet,
        );
        let messages = [ChatMessage::user(prompt)];

        match self.llm.complete(&messages, 0.3, 10).await {
            Ok(text) => {
                let score = parse_score(&text).unwrap_or(NEUTRAL_SCORE);
                debug!(ticker, title = %item.title, score, "relevance scored");
                score
            }
            Err(e) => {
                debug!(ticker, error = %e, "relevance scoring failed; neutral default");
                counter!("news_score_errors_total").increment(1);
                NEUTRAL_SCORE
            }
        }
    }
}

/// Stage 1: keep an item when its text mentions the ticker, a synonym, or any
/// financial keyword, or when the gate cannot judge it (short list, no text).
pub fn stage_one(items: Vec<RawNewsItem>, ticker: &str) -> Vec<RawNewsItem> {
    if items.len() <= PREFILTERED_MAX {
        return items;
    }
    let keywords = keyword_set(ticker);
    items
        .into_iter()
        .filter(|item| {
            let content = format!("{} {}", item.title, item.snippet)
                .trim()
                .to_lowercase();
            content.is_empty() || keywords.iter().any(|k| content.contains(k))
        })
        .collect()
}

/// Lower-cased keyword set: ticker variants + synonyms + financial terms.
pub fn keyword_set(ticker: &str) -> Vec<String> {
    let mut keywords = vec![ticker.to_lowercase()];
    if let Some((_, syns)) = TICKER_SYNONYMS.iter().find(|(t, _)| *t == ticker) {
        keywords.extend(syns.iter().map(|s| s.to_string()));
    }
    keywords.extend(FINANCIAL_KEYWORDS.iter().map(|s| s.to_string()));
    keywords
}

/// Strict protocol: the trimmed completion must parse as a number in [0, 1].
pub fn parse_score(text: &str) -> Option<f64> {
    let score: f64 = text.trim().parse().ok()?;
    if (0.0..=1.0).contains(&score) {
        Some(score)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, snippet: &str) -> RawNewsItem {
        RawNewsItem {
            title: title.to_string(),
            url: "https://news.site/a".to_string(),
            snippet: snippet.to_string(),
            source: "Reuters".to_string(),
            timestamp: String::new(),
        }
    }

    #[test]
    fn score_protocol_is_strict() {
        assert_eq!(parse_score("0.85"), Some(0.85));
        assert_eq!(parse_score("  1.0\n"), Some(1.0));
        assert_eq!(parse_score("0"), Some(0.0));
        assert_eq!(parse_score("1.5"), None);
        assert_eq!(parse_score("-0.2"), None);
        assert_eq!(parse_score("Highly relevant: 0.9"), None);
        assert_eq!(parse_score(""), None);
    }

    #[test]
    fn short_lists_skip_the_keyword_gate() {
        let items = vec![item("Celebrity gossip", "nothing financial here")];
        let kept = stage_one(items, "TSLA");
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn keyword_gate_drops_unrelated_items() {
        let mut items: Vec<RawNewsItem> = (0..6)
            .map(|i| item(&format!("Cooking show episode {i}"), "recipes and pans"))
            .collect();
        items.push(item("Tesla beats delivery estimates", "tesla shares jump"));
        let kept = stage_one(items, "TSLA");
        assert_eq!(kept.len(), 1);
        assert!(kept[0].title.contains("Tesla"));
    }

    #[test]
    fn empty_content_passes_through_to_stage_two() {
        let mut items: Vec<RawNewsItem> = (0..6)
            .map(|i| item(&format!("Cooking show episode {i}"), "recipes"))
            .collect();
        items.push(item("", ""));
        let kept = stage_one(items, "TSLA");
        assert_eq!(kept.len(), 1);
        assert!(kept[0].title.is_empty());
    }

    #[test]
    fn synonyms_count_as_ticker_mentions() {
        let keywords = keyword_set("BTC");
        assert!(keywords.contains(&"bitcoin".to_string()));
        assert!(keywords.contains(&"btc".to_string()));
        // generic vocabulary rides along for every ticker
        assert!(keywords.contains(&"earnings".to_string()));
    }
}
