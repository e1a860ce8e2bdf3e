// src/analysis/cleanup.rs
//! Narrative text cleanup applied to every model-produced field before
//! storage: code fences, stray JSON artifacts, markdown headers, excess
//! blank lines, leading list markers.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[\w]*\n?").unwrap());
static RE_JSON_START: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^\s*\{[\s\n]*""#).unwrap());
static RE_JSON_END: Lazy<Regex> = Lazy::new(|| Regex::new(r#""\s*\}\s*$"#).unwrap());
static RE_BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static RE_MD_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#+\s*").unwrap());
static RE_QUOTED_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)":\s*"#).unwrap());
static RE_LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*[-*]\s*").unwrap());

/// Strip formatting noise from model narrative text. Empty input stays empty.
pub fn clean_model_text(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }

    let mut out = RE_FENCE_OPEN.replace_all(content, "").to_string();
    out = out.replace("```", "");
    out = RE_JSON_START.replace(&out, "").to_string();
    out = RE_JSON_END.replace(&out, "").to_string();
    out = RE_BLANK_RUNS.replace_all(&out, "\n\n").to_string();
    out = RE_MD_HEADER.replace_all(&out, "").to_string();
    out = RE_QUOTED_KEY.replace_all(&out, "$1: ").to_string();
    out = RE_LIST_MARKER.replace_all(&out, "").to_string();
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_code_fences() {
        let s = "```json\n{\"analysis\": \"text\"}\n```";
        let out = clean_model_text(s);
        assert!(!out.contains("```"));
        assert!(!out.contains("json\n"));
    }

    #[test]
    fn strips_markdown_headers_and_bullets() {
        let s = "# Overview\n- first point\n* second point\nplain line";
        let out = clean_model_text(s);
        assert_eq!(out, "Overview\nfirst point\nsecond point\nplain line");
    }

    #[test]
    fn collapses_blank_line_runs() {
        let s = "para one\n\n\n\n\npara two";
        assert_eq!(clean_model_text(s), "para one\n\npara two");
    }

    #[test]
    fn unquotes_json_keys() {
        let s = r#""impact_analysis": the move reflects rate expectations"#;
        assert_eq!(
            clean_model_text(s),
            "impact_analysis: the move reflects rate expectations"
        );
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(clean_model_text(""), "");
    }
}
