// src/news/search.rs
//! News retrieval through the model plus the defensive parsing chain.
//!
//! The model is asked for a fixed JSON shape, but its output is unreliable.
//! Parsing walks an ordered list of strategies, each a pure function, and a
//! later strategy runs only when the earlier ones produced no valid item:
//!   1. fence-stripped JSON (array or `{"articles": [...]}`),
//!   2. regex extraction of object literals from raw text,
//!   3. validation (URL gate, snippet backfill),
//!   4. bare-URL scan with synthesized titles.

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::llm::{ChatMessage, LlmClient};
use crate::news::{is_acceptable_url, truncate_chars, RawNewsItem};

const SNIPPET_MAX_CHARS: usize = 200;
const DEFAULT_SOURCE: &str = "Financial News";

/// Search for recent articles about `query`. Provider errors yield an empty
/// list, never an error to the caller.
pub async fn search_news(llm: &dyn LlmClient, query: &str, max_results: usize) -> Vec<RawNewsItem> {
    let messages = [
        ChatMessage::system(
            "You are a financial news search assistant. You have access to recent \
             financial news and can provide real article URLs from major financial \
             news sources.",
        ),
        ChatMessage::user(search_prompt(query, max_results)),
    ];

    match llm.complete(&messages, 0.7, 3000).await {
        Ok(content) => parse_news_response(&content, query, max_results),
        Err(e) => {
            warn!(query, error = %e, "news search failed");
            counter!("news_search_errors_total").increment(1);
            Vec::new()
        }
    }
}

fn search_prompt(query: &str, max_results: usize) -> String {
    format!(
        r#"Search for recent financial news articles about: {query}

Please provide {max_results} recent news articles in the following JSON format:
{{
  "articles": [
    {{
      "title": "Article title",
      "url": "Full URL to the article",
      "snippet": "Brief summary or excerpt",
      "source": "News source name",
      "timestamp": "Publication date/time"
    }}
  ]
}}

Requirements:
- Use real, recent news articles from reputable financial news sources
- Include actual URLs that can be accessed
- Focus on articles published within the last 24-48 hours
- Make sure URLs are complete and valid
- Provide meaningful snippets that summarize the article content

Return ONLY valid JSON, no additional text or markdown formatting."#
    )
}

/// Loosely-typed candidate before validation; any field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Full fallback chain. Idempotent on already-valid JSON input.
pub fn parse_news_response(content: &str, query: &str, max_results: usize) -> Vec<RawNewsItem> {
    let stripped = strip_code_fences(content);

    let mut candidates = parse_json_candidates(&stripped).unwrap_or_default();
    if candidates.is_empty() {
        warn!("news JSON parse yielded nothing; trying object-literal extraction");
        counter!("news_parse_regex_fallback_total").increment(1);
        candidates = extract_object_literals(content);
    }

    let mut validated = validate_candidates(candidates, max_results);
    if validated.is_empty() {
        warn!("no valid articles after validation; scanning for bare URLs");
        counter!("news_parse_url_fallback_total").increment(1);
        validated = bare_url_fallback(content, query, max_results);
    }

    validated.truncate(max_results);
    validated
}

/// Strategy 1 precursor: drop markdown code-fence lines.
pub fn strip_code_fences(content: &str) -> String {
    static RE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^```[\w]*\s*").unwrap());
    static RE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)```\s*$").unwrap());
    let out = RE_OPEN.replace_all(content.trim(), "");
    RE_CLOSE.replace_all(&out, "").trim().to_string()
}

/// Strategy 1: parse as JSON, accepting a direct list or an object carrying
/// an `articles` field. `None` means the text was not JSON at all.
pub fn parse_json_candidates(text: &str) -> Option<Vec<CandidateItem>> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let entries = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("articles") {
            Some(serde_json::Value::Array(items)) => items,
            _ => return Some(Vec::new()),
        },
        _ => return Some(Vec::new()),
    };
    Some(
        entries
            .into_iter()
            .filter_map(|e| serde_json::from_value::<CandidateItem>(e).ok())
            .collect(),
    )
}

/// Strategy 2: pull `{title,url,snippet,source,timestamp}` object literals
/// out of otherwise unparsable text.
pub fn extract_object_literals(content: &str) -> Vec<CandidateItem> {
    static RE_OBJ: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r#"(?s)\{"title":\s*"([^"]+)",\s*"url":\s*"([^"]+)",\s*"snippet":\s*"([^"]+)",\s*"source":\s*"([^"]+)",\s*"timestamp":\s*"([^"]+)"\}"#,
        )
        .unwrap()
    });
    RE_OBJ
        .captures_iter(content)
        .map(|c| CandidateItem {
            title: c[1].to_string(),
            url: c[2].to_string(),
            snippet: c[3].to_string(),
            source: c[4].to_string(),
            timestamp: c[5].to_string(),
        })
        .collect()
}

/// Strategy 3: enforce the URL gate and backfill missing fields. Items with
/// an unusable URL are dropped here, not during filtering.
pub fn validate_candidates(candidates: Vec<CandidateItem>, max_results: usize) -> Vec<RawNewsItem> {
    candidates
        .into_iter()
        .take(max_results)
        .filter_map(|c| {
            if !is_acceptable_url(&c.url) {
                return None;
            }
            let title = if c.title.is_empty() {
                "No title".to_string()
            } else {
                c.title
            };
            let snippet = if c.snippet.is_empty() {
                truncate_chars(&title, SNIPPET_MAX_CHARS)
            } else {
                c.snippet
            };
            let source = if c.source.is_empty() {
                DEFAULT_SOURCE.to_string()
            } else {
                c.source
            };
            Some(RawNewsItem {
                title,
                url: c.url,
                snippet,
                source,
                timestamp: c.timestamp,
            })
        })
        .collect()
}

/// Strategy 4: scan the raw text for bare URLs and synthesize titles from the
/// text immediately preceding each one.
pub fn bare_url_fallback(content: &str, query: &str, max_results: usize) -> Vec<RawNewsItem> {
    static RE_URL: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).unwrap());

    RE_URL
        .find_iter(content)
        .take(max_results)
        .enumerate()
        .filter_map(|(i, m)| {
            let url = m.as_str().to_string();
            if !is_acceptable_url(&url) {
                return None;
            }
            let title = preceding_text(content, m.start())
                .unwrap_or_else(|| format!("News article {} about {query}", i + 1));
            let title = truncate_chars(&title, SNIPPET_MAX_CHARS);
            Some(RawNewsItem {
                snippet: title.clone(),
                title,
                url,
                source: DEFAULT_SOURCE.to_string(),
                timestamp: String::new(),
            })
        })
        .collect()
}

/// Text between the previous sentence/line break and `pos`, if any.
fn preceding_text(content: &str, pos: usize) -> Option<String> {
    let before = &content[..pos];
    let start = before
        .rfind(['\n', '.'])
        .map(|i| i + 1)
        .unwrap_or(0);
    let candidate = before[start..]
        .trim()
        .trim_end_matches([':', '-', '('])
        .trim();
    if candidate.is_empty() {
        None
    } else {
        Some(candidate.to_string())
    }
}
