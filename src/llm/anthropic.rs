use async_trait::async_trait;
use backon::Retryable;
use governor::DefaultDirectRateLimiter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{CompletionRequest, LlmClient, upstream_error};
use crate::config::LlmConfig;
use crate::error::{IsRetryable, MealwiseError};
use crate::http::default_retry_policy;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
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
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    fn into_text(self) -> String {
        self.content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
    max_tokens: u32,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl AnthropicClient {
    pub fn new(
        cfg: &LlmConfig,
        http: reqwest::Client,
        limiter: Arc<DefaultDirectRateLimiter>,
    ) -> Result<Self, MealwiseError> {
        let base = match &cfg.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL)?,
        };
        Ok(Self {
            http,
            endpoint: base.join("v1/messages")?,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            limiter,
        })
    }

    async fn send(&self, req: &CompletionRequest) -> Result<String, MealwiseError> {
        self.limiter.until_ready().await;
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: req.max_tokens.unwrap_or(self.max_tokens),
            system: &req.system,
            messages: [Message {
                role: "user",
                content: &req.prompt,
            }],
        };
        let resp = self
            .http
            .post(self.endpoint.clone())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(upstream_error(resp).await);
        }
        let parsed: MessagesResponse = resp.json().await?;
        if parsed.stop_reason.as_deref() == Some("max_tokens") {
            warn!("Anthropic reply hit max_tokens; output may be truncated");
        }
        let text = parsed.into_text();
        debug!(chars = text.len(), "Anthropic completion received");
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, req: CompletionRequest) -> Result<String, MealwiseError> {
        if self.api_key.is_empty() {
            return Err(MealwiseError::LlmNotConfigured);
        }
        (|| async { self.send(&req).await })
            .retry(default_retry_policy())
            .when(|e: &MealwiseError| e.is_retryable())
            .notify(|err, dur: Duration| {
                warn!("Anthropic call failed, retrying in {:?}: {}", dur, err);
            })
            .await
    }
}
