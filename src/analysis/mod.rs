pub mod normalize;
pub mod prompt;

pub use normalize::{normalize, normalize_parser_validation, parse_suggestions, RawAnalysisPayload};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::Config;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Analysis request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Analysis API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Analysis API returned no text content")]
    EmptyResponse,

    #[error("Malformed analysis response: {0}")]
    Malformed(String),
}

/// Seam between the CLI and the language-model service.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Send one prompt and return the model's text reply.
    async fn complete(&self, prompt: &str) -> Result<String, AnalysisError>;

    /// Model identifier recorded in report metadata.
    fn model(&self) -> &str;
}

#[derive(Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Client for the Anthropic Messages API. One request per call, no retries.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(config: &Config, api_key: String) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.analysis.timeout_secs))
            .user_agent(concat!("repo-validator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model().to_string(),
            max_tokens: config.analysis.max_tokens,
            base_url: config.analysis.base_url.clone(),
        })
    }
}

#[async_trait]
impl AnalysisClient for AnthropicClient {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_bytes = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String, AnalysisError> {
        let request = MessageRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!("sending analysis request");
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let message = response.json::<MessageResponse>().await?;
        let text = message
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");
        debug!(response_bytes = text.len(), "received analysis response");

        if text.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Offline client that answers every prompt with the same canned reply.
pub struct MockClient {
    response: String,
}

impl MockClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }

    /// Client replying with the bundled sample analysis.
    pub fn sample() -> Self {
        Self::new(include_str!("../../tests/fixtures/sample_analysis.json"))
    }
}

#[async_trait]
impl AnalysisClient for MockClient {
    async fn complete(&self, prompt: &str) -> Result<String, AnalysisError> {
        debug!(prompt_bytes = prompt.len(), "answering from mock client");
        Ok(self.response.clone())
    }

    fn model(&self) -> &str {
        "mock"
    }
}

/// Send the analysis prompt and normalize the reply.
#[instrument(skip_all, fields(model = client.model()))]
pub async fn analyze(client: &dyn AnalysisClient, prompt: &str) -> Result<crate::report::AnalysisResult, AnalysisError> {
    let reply = client.complete(prompt).await?;
    normalize(RawAnalysisPayload::from_reply(reply))
}
