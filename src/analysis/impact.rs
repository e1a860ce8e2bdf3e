// src/analysis/impact.rs
//! Impact analyzer: asks the model for a three-section narrative and
//! recovers a structured `ImpactResult` from whatever comes back.
//!
//! Section extraction is header-scoped: every recognized header is located
//! first, and a section runs from its header to the next recognized header
//! (or end of text). Absent sections degrade to placeholders, never to
//! missing fields.

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::analysis::cleanup::clean_model_text;
use crate::analysis::{DisplayNewsItem, ImpactResult};
use crate::llm::{ChatMessage, LlmClient};
use crate::market::PriceChange;
use crate::news::RankedNewsItem;

/// At most this many ranked summaries are embedded in the prompt.
const PROMPT_NEWS_LIMIT: usize = 10;
const KEY_FACTORS_MAX: usize = 5;

pub const FALLBACK_KEY_FACTOR: &str = "Analysis in progress";
pub const FALLBACK_INSIGHTS: &str = "See impact analysis above.";
pub const FAILED_NARRATIVE: &str = "Analysis failed due to error.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    KeyFactors,
    ImpactAnalysis,
    FutureOutlook,
}

static HEADER_PATTERNS: Lazy<Vec<(Section, Regex)>> = Lazy::new(|| {
    vec![
        (
            Section::KeyFactors,
            Regex::new(r"(?im)^[ \t]*key factors[:\s]*$").unwrap(),
        ),
        (
            Section::ImpactAnalysis,
            Regex::new(r"(?im)^[ \t]*impact analysis[:\s]*$").unwrap(),
        ),
        (
            Section::FutureOutlook,
            Regex::new(r"(?im)^[ \t]*future outlook[:\s]*$").unwrap(),
        ),
    ]
});

/// Run the deep-dive analysis. A provider error yields an error-marked
/// result with a fixed narrative, never an error to the caller.
pub async fn analyze_impact(
    llm: &dyn LlmClient,
    ticker: &str,
    price_change: &PriceChange,
    ranked_news: &[RankedNewsItem],
    context: &str,
) -> ImpactResult {
    let messages = [
        ChatMessage::system(
            "You are an expert financial analyst. Provide detailed, structured \
             analysis of market movements and news impact.",
        ),
        ChatMessage::user(build_prompt(ticker, price_change, ranked_news, context)),
    ];

    match llm.complete(&messages, 0.7, 3000).await {
        Ok(content) => {
            counter!("analyses_completed_total").increment(1);
            parse_analysis_response(&content, ticker, price_change, ranked_news)
        }
        Err(e) => {
            warn!(ticker, error = %e, "impact analysis failed");
            counter!("analysis_errors_total").increment(1);
            ImpactResult {
                ticker: ticker.to_string(),
                price_change: price_change.clone(),
                key_factors: Vec::new(),
                impact_analysis: FAILED_NARRATIVE.to_string(),
                ranked_news: Vec::new(),
                insights: String::new(),
                error: Some(e.to_string()),
            }
        }
    }
}

fn build_prompt(
    ticker: &str,
    price_change: &PriceChange,
    ranked_news: &[RankedNewsItem],
    context: &str,
) -> String {
    let news_summary = ranked_news
        .iter()
        .take(PROMPT_NEWS_LIMIT)
        .map(|n| format!("- {}: {}", n.scored.item.title, n.scored.item.snippet))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a financial market analyst. Analyze how the following news might impact the price movement of {ticker}.

Strategic Context:
{context}

Price Movement:
- Symbol: {symbol}
- Current Price: ${current:.2}
- Previous Price: ${previous:.2}
- Change: {percent:.2}%

Recent News Articles:
{news_summary}

Provide a comprehensive analysis in the following format:

KEY FACTORS:
List the 3-5 key driving factors from the news that explain this price movement.

IMPACT ANALYSIS:
Provide a detailed, well-written explanation (2-3 paragraphs) of how these factors relate to the price movement. Write in clear, professional language without markdown formatting or code blocks.

FUTURE OUTLOOK:
Provide insights on potential future impact (1-2 paragraphs).

Write your response in plain text format, using clear section headers. Do not use JSON, markdown code blocks, or excessive formatting."#,
        symbol = price_change.symbol,
        current = price_change.current_price,
        previous = price_change.previous_price,
        percent = price_change.change_percent,
    )
}

/// Turn the free-text narrative into a structured result. Pure and total:
/// any input shape yields a fully-populated record.
pub fn parse_analysis_response(
    content: &str,
    ticker: &str,
    price_change: &PriceChange,
    ranked_news: &[RankedNewsItem],
) -> ImpactResult {
    let cleaned = clean_model_text(content);

    let key_factors = section_text(&cleaned, Section::KeyFactors)
        .map(extract_key_factors)
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| vec![FALLBACK_KEY_FACTOR.to_string()]);

    let impact_analysis = section_text(&cleaned, Section::ImpactAnalysis)
        .map(clean_model_text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| cleaned.clone());

    let insights = section_text(&cleaned, Section::FutureOutlook)
        .map(clean_model_text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_INSIGHTS.to_string());

    let display_news = ranked_news
        .iter()
        .enumerate()
        .map(|(i, n)| DisplayNewsItem::from_ranked(n, i))
        .collect();

    ImpactResult {
        ticker: ticker.to_string(),
        price_change: price_change.clone(),
        key_factors,
        impact_analysis,
        ranked_news: display_news,
        insights,
        error: None,
    }
}

/// Slice of `text` belonging to `wanted`: from the end of its header line to
/// the start of the next recognized header, or end of text.
fn section_text(text: &str, wanted: Section) -> Option<&str> {
    let mut headers: Vec<(Section, usize, usize)> = Vec::new();
    for (kind, re) in HEADER_PATTERNS.iter() {
        for m in re.find_iter(text) {
            headers.push((*kind, m.start(), m.end()));
        }
    }
    headers.sort_by_key(|&(_, start, _)| start);

    let pos = headers.iter().position(|&(kind, _, _)| kind == wanted)?;
    let content_start = headers[pos].2;
    let content_end = headers
        .get(pos + 1)
        .map(|&(_, start, _)| start)
        .unwrap_or(text.len());
    Some(text[content_start..content_end].trim())
}

/// Enumerated/bulleted lines first; if none match, non-empty lines. Capped.
fn extract_key_factors(section: &str) -> Vec<String> {
    static RE_ITEM: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)^\s*(?:\d+[.)]|[-*\u{2022}])\s*(.+)$").unwrap());

    let items: Vec<String> = RE_ITEM
        .captures_iter(section)
        .map(|c| c[1].trim().to_string())
        .take(KEY_FACTORS_MAX)
        .collect();
    if !items.is_empty() {
        return items;
    }
    section
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .take(KEY_FACTORS_MAX)
        .collect()
}
