// tests/filter_ranking.rs
//
// Two-stage relevance filter over a scripted model: keyword narrowing,
// descending score order with stable ties, and exact tier boundaries.

use std::sync::Arc;

use market_move_analyzer::llm::MockLlm;
use market_move_analyzer::news::filter::NewsFilter;
use market_move_analyzer::news::{Importance, RawNewsItem};

fn item(title: &str, snippet: &str) -> RawNewsItem {
    RawNewsItem {
        title: title.to_string(),
        url: "https://news.site/a".to_string(),
        snippet: snippet.to_string(),
        source: "Reuters".to_string(),
        timestamp: String::new(),
    }
}

/// 12 candidates, 8 of which mention the ticker or financial vocabulary.
fn twelve_candidates() -> Vec<RawNewsItem> {
    let mut items: Vec<RawNewsItem> = (0..8)
        .map(|i| item(&format!("Tesla update {i}"), "tesla shares and earnings"))
        .collect();
    for i in 0..4 {
        items.push(item(&format!("Travel diary {i}"), "beaches and sunsets"));
    }
    items
}

#[tokio::test]
async fn twelve_in_eight_scored_descending_with_exact_boundaries() {
    let scores = ["0.95", "0.9", "0.85", "0.8", "0.5", "0.4", "0.2", "0.1"];
    let llm = Arc::new(MockLlm::scripted(scores, "0.5"));
    let filter = NewsFilter::new(llm);

    let out = filter
        .filter_news(twelve_candidates(), "context", "TSLA")
        .await;

    assert_eq!(out.len(), 8, "stage 1 must narrow 12 -> 8");

    // non-increasing by relevance score
    for pair in out.windows(2) {
        assert!(pair[0].scored.relevance_score >= pair[1].scored.relevance_score);
    }

    let tiers: Vec<Importance> = out.iter().map(|n| n.importance).collect();
    assert_eq!(
        tiers,
        vec![
            Importance::High,   // 0.95
            Importance::High,   // 0.90
            Importance::High,   // 0.85
            Importance::High,   // exactly 0.80
            Importance::Medium, // exactly 0.50
            Importance::Low,    // 0.40
            Importance::Low,    // 0.20
            Importance::Low,    // 0.10
        ]
    );
}

#[tokio::test]
async fn equal_scores_preserve_stage_one_order() {
    let llm = Arc::new(MockLlm::fixed("0.5"));
    let filter = NewsFilter::new(llm);

    let items: Vec<RawNewsItem> = (0..4)
        .map(|i| item(&format!("market note {i}"), "stock market commentary"))
        .collect();
    let out = filter.filter_news(items, "context", "SPY").await;

    assert_eq!(out.len(), 4);
    for (i, n) in out.iter().enumerate() {
        assert_eq!(n.scored.item.title, format!("market note {i}"));
        assert_eq!(n.importance, Importance::Medium);
    }
}

#[tokio::test]
async fn off_protocol_scores_default_to_neutral() {
    let llm = Arc::new(MockLlm::scripted(
        ["definitely relevant!", "1.7", "0.9"],
        "0.5",
    ));
    let filter = NewsFilter::new(llm);

    let items = vec![
        item("a", "market"),
        item("b", "market"),
        item("c", "market"),
    ];
    let out = filter.filter_news(items, "context", "SPY").await;

    assert_eq!(out.len(), 3);
    // "0.9" ranks first; the prose and out-of-range answers both became 0.5
    assert_eq!(out[0].scored.item.title, "c");
    assert_eq!(out[0].scored.relevance_score, 0.9);
    assert_eq!(out[1].scored.relevance_score, 0.5);
    assert_eq!(out[2].scored.relevance_score, 0.5);
    // neutral ties keep their stage-1 order
    assert_eq!(out[1].scored.item.title, "a");
    assert_eq!(out[2].scored.item.title, "b");
}
