// src/llm.rs
//! LLM provider abstraction: role-tagged messages in, one text completion
//! out. No structured-output guarantee is assumed anywhere; all structure is
//! recovered by the parsers in `news::search` and `analysis::impact`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Request one completion. Errors are recovered by each caller per its
    /// own contract (empty result, neutral score, error-marker analysis).
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String>;
    fn name(&self) -> &'static str;
}

pub type DynLlmClient = Arc<dyn LlmClient>;

/// Factory: `LLM_TEST_MODE=mock` yields a deterministic mock, otherwise the
/// OpenAI-compatible HTTP provider.
pub fn build_llm_client(cfg: &LlmConfig) -> DynLlmClient {
    if std::env::var("LLM_TEST_MODE").map(|v| v == "mock").unwrap_or(false) {
        return Arc::new(MockLlm::fixed("0.5"));
    }
    Arc::new(OpenAiCompatClient::from_config(cfg))
}

// ------------------------------------------------------------
// OpenAI-compatible provider
// ------------------------------------------------------------

/// Chat-completions client against a configurable base URL. Requires
/// `LLM_API_KEY`.
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiCompatClient {
    pub fn from_config(cfg: &LlmConfig) -> Self {
        let api_key = std::env::var("LLM_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!("LLM_API_KEY not set; model calls will fail and degrade");
        }
        let http = reqwest::Client::builder()
            .user_agent("market-move-analyzer/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        if self.api_key.is_empty() {
            bail!("LLM_API_KEY is not configured");
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: &'a [ChatMessage],
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages,
            temperature,
            max_tokens,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("LLM request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("LLM returned {status}: {body}");
        }

        let body: Resp = resp.json().await.context("LLM response decode")?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.is_empty() {
            bail!("LLM returned an empty completion");
        }
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openai-compat"
    }
}

// ------------------------------------------------------------
// Mock provider for tests/local runs
// ------------------------------------------------------------

/// Scripted mock: pops queued responses in order, then repeats the fallback.
pub struct MockLlm {
    queue: Mutex<VecDeque<String>>,
    fallback: String,
}

impl MockLlm {
    pub fn fixed(response: impl Into<String>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: response.into(),
        }
    }

    pub fn scripted<I, S>(responses: I, fallback: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(responses.into_iter().map(Into::into).collect()),
            fallback: fallback.into(),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlm {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String> {
        let mut q = self.queue.lock().expect("mock queue poisoned");
        Ok(q.pop_front().unwrap_or_else(|| self.fallback.clone()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_mock_pops_then_repeats_fallback() {
        let mock = MockLlm::scripted(["a", "b"], "z");
        let msgs = [ChatMessage::user("x")];
        assert_eq!(mock.complete(&msgs, 0.0, 10).await.unwrap(), "a");
        assert_eq!(mock.complete(&msgs, 0.0, 10).await.unwrap(), "b");
        assert_eq!(mock.complete(&msgs, 0.0, 10).await.unwrap(), "z");
        assert_eq!(mock.complete(&msgs, 0.0, 10).await.unwrap(), "z");
    }
}
