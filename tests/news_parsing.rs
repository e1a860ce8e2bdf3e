// tests/news_parsing.rs
//
// News retrieval through `search_news`: the parsing chain behind a scripted
// model, and the empty-list recovery on provider failure.

use anyhow::{bail, Result};

use market_move_analyzer::llm::{ChatMessage, LlmClient, MockLlm};
use market_move_analyzer::news::search::search_news;

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
async fn clean_json_response_is_parsed() {
    let llm = MockLlm::fixed(
        r#"{"articles":[{"title":"Gold rallies","url":"https://news.site/gold","snippet":"gold is up","source":"Reuters","timestamp":"2026-08-04"}]}"#,
    );
    let out = search_news(&llm, "GLD price movement financial news", 10).await;
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].title, "Gold rallies");
    assert_eq!(out[0].url, "https://news.site/gold");
}

#[tokio::test]
async fn fenced_response_with_placeholder_urls_keeps_only_real_ones() {
    let llm = MockLlm::fixed(
        "```json\n{\"articles\":[\
         {\"title\":\"Real one\",\"url\":\"https://news.site/r\",\"snippet\":\"s\",\"source\":\"R\",\"timestamp\":\"\"},\
         {\"title\":\"Filler\",\"url\":\"https://example.com/f\",\"snippet\":\"s\",\"source\":\"R\",\"timestamp\":\"\"}\
         ]}\n```",
    );
    let out = search_news(&llm, "SPY", 10).await;
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].title, "Real one");
    assert!(out.iter().all(|i| i.url.starts_with("http")));
    assert!(out.iter().all(|i| !i.url.contains("example.com")));
}

#[tokio::test]
async fn prose_with_urls_falls_back_to_synthesis() {
    let llm = MockLlm::fixed(
        "I could not produce JSON, but see coverage here.\n\
         Nasdaq slides on chip weakness https://news.site/qqq-story",
    );
    let out = search_news(&llm, "QQQ", 10).await;
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].title, "Nasdaq slides on chip weakness");
    assert_eq!(out[0].url, "https://news.site/qqq-story");
    assert_eq!(out[0].snippet, out[0].title);
}

#[tokio::test]
async fn provider_failure_returns_empty_list() {
    let out = search_news(&FailingLlm, "BTC", 10).await;
    assert!(out.is_empty());
}

#[tokio::test]
async fn max_results_caps_the_output() {
    let items: Vec<String> = (0..12)
        .map(|i| {
            format!(
                r#"{{"title":"t{i}","url":"https://news.site/{i}","snippet":"s","source":"R","timestamp":""}}"#
            )
        })
        .collect();
    let llm = MockLlm::fixed(format!(r#"{{"articles":[{}]}}"#, items.join(",")));
    let out = search_news(&llm, "SPY", 5).await;
    assert_eq!(out.len(), 5);
}
