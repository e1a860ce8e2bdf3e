// tests/impact_sections.rs
//
// Impact analyzer through its async entry point: provider failure yields the
// error-marked result, and the display re-tiering deliberately diverges from
// the filter's score-based tiers (both must be preserved).

use anyhow::{bail, Result};
use chrono::{DateTime, FixedOffset, TimeZone};

use market_move_analyzer::analysis::impact::{analyze_impact, FAILED_NARRATIVE};
use market_move_analyzer::llm::{ChatMessage, LlmClient, MockLlm};
use market_move_analyzer::market::PriceChange;
use market_move_analyzer::news::{Importance, RankedNewsItem, RawNewsItem, ScoredNewsItem};

fn session_ts() -> DateTime<FixedOffset> {
    FixedOffset::west_opt(4 * 3600)
        .unwrap()
        .with_ymd_and_hms(2026, 8, 4, 16, 0, 0)
        .unwrap()
}

fn pc() -> PriceChange {
    PriceChange::new("TSLA", 252.30, 250.00, session_ts())
}

fn ranked(title: &str, score: f64) -> RankedNewsItem {
    RankedNewsItem::from_scored(ScoredNewsItem {
        item: RawNewsItem {
            title: title.to_string(),
            url: "https://news.site/x".to_string(),
            snippet: "snippet".to_string(),
            source: "Reuters".to_string(),
            timestamp: String::new(),
        },
        relevance_score: score,
    })
}

struct FailingLlm;

#[async_trait::async_trait]
impl LlmClient for FailingLlm {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String> {
        bail!("model endpoint unreachable")
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

#[tokio::test]
async fn provider_failure_yields_error_marked_result() {
    let news = vec![ranked("a", 0.9)];
    let r = analyze_impact(&FailingLlm, "TSLA", &pc(), &news, "ctx").await;

    assert!(r.error.is_some());
    assert!(r.key_factors.is_empty());
    assert_eq!(r.impact_analysis, FAILED_NARRATIVE);
    assert!(r.ranked_news.is_empty());
    assert!(r.insights.is_empty());
}

#[tokio::test]
async fn sectioned_narrative_parses_through_async_path() {
    let narrative = "\
KEY FACTORS:
1. Fed commentary

IMPACT ANALYSIS:
Rates did the work.

FUTURE OUTLOOK:
Watch the next print.";
    let llm = MockLlm::fixed(narrative);
    let r = analyze_impact(&llm, "TSLA", &pc(), &[], "ctx").await;

    assert_eq!(r.key_factors, vec!["Fed commentary"]);
    assert_eq!(r.impact_analysis, "Rates did the work.");
    assert_eq!(r.insights, "Watch the next print.");
    assert!(r.error.is_none());
}

/// Display tiers are positional (top 3 / next 3 / rest) and can disagree
/// with the score tiers. Both fields must survive serialization.
#[tokio::test]
async fn display_retiering_diverges_from_score_tiers_and_keeps_both() {
    // All items scored below 0.5: every score tier is Low.
    let news: Vec<RankedNewsItem> = (0..5).map(|i| ranked(&format!("n{i}"), 0.3)).collect();
    let llm = MockLlm::fixed("prose only");
    let r = analyze_impact(&llm, "TSLA", &pc(), &news, "ctx").await;

    assert_eq!(r.ranked_news.len(), 5);
    for item in &r.ranked_news {
        assert_eq!(item.score_importance, Importance::Low);
    }
    assert_eq!(r.ranked_news[0].importance, Importance::High);
    assert_eq!(r.ranked_news[3].importance, Importance::Medium);

    // divergence visible on the wire too
    let v = serde_json::to_value(&r).unwrap();
    assert_eq!(v["ranked_news"][0]["importance"], "High");
    assert_eq!(v["ranked_news"][0]["score_importance"], "Low");
    assert_eq!(v["ranked_news"][0]["relevance_score"], 0.3);
}
