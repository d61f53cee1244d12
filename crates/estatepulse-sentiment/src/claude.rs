//! Minimal client for the Claude Messages API.
//!
//! Only the single-turn text completion the classifier and the research
//! collector need: one user message in, concatenated text blocks out.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::{decode_json, ensure_success, SentimentError};
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const PROVIDER: &str = "Claude";
const API_KEY_VAR: &str = "CLAUDE_API_KEY";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Client for the Claude Messages endpoint.
///
/// Use [`ClaudeClient::new`] for production or [`ClaudeClient::with_base_url`]
/// to point at a mock server in tests.
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl std::fmt::Debug for ClaudeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl ClaudeClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, SentimentError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`SentimentError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, SentimentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| SentimentError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            base_url: parsed,
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    /// Retry transient failures (timeouts, 429, 5xx) with exponential back-off.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` as a single user message and return the reply text.
    ///
    /// # Errors
    ///
    /// - [`SentimentError::Unauthorized`] on 401/403 (not retried).
    /// - [`SentimentError::RateLimited`] / [`SentimentError::Api`] once retries
    ///   are exhausted.
    /// - [`SentimentError::Deserialize`] if the body is not a Messages response.
    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, SentimentError> {
        self.complete_with_temperature(prompt, max_tokens, None)
            .await
    }

    /// Like [`ClaudeClient::complete`] with an explicit sampling temperature.
    ///
    /// # Errors
    ///
    /// Same as [`ClaudeClient::complete`].
    pub async fn complete_with_temperature(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: Option<f32>,
    ) -> Result<String, SentimentError> {
        let url = self
            .base_url
            .join("v1/messages")
            .map_err(|e| SentimentError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            temperature,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.send_once(url.clone(), &request)
        })
        .await
    }

    async fn send_once(
        &self,
        url: Url,
        request: &MessagesRequest<'_>,
    ) -> Result<String, SentimentError> {
        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;
        let response = ensure_success(PROVIDER, Some(API_KEY_VAR), response).await?;
        let body = response.text().await?;
        let parsed: MessagesResponse = decode_json(&body, "claude messages response")?;

        Ok(parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}
