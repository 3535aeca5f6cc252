//! Language-model access for plan generation and recipe extraction.
//!
//! Layout:
//! - `anthropic.rs` / `openai.rs`: concrete chat completion clients
//! - `json.rs`: pulling a JSON payload out of free-form model text
//! - `decode.rs`: lenient conversion of model JSON into `Recipe`s
//! - `prompts.rs`: prompt builders

pub mod anthropic;
pub mod decode;
pub mod json;
pub mod openai;
pub mod prompts;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{LlmConfig, LlmProvider};
use crate::error::MealwiseError;
use crate::http::build_http_client;

pub use anthropic::AnthropicClient;
pub use decode::{optional_recipe_from_text, recipes_from_text};
pub use json::extract_json;
pub use openai::OpenAiClient;

/// One single-turn completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    /// Falls back to the configured limit.
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            max_tokens: None,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the raw text of the model's reply.
    async fn complete(&self, req: CompletionRequest) -> Result<String, MealwiseError>;
}

pub type SharedLlm = Arc<dyn LlmClient>;

/// Build the configured provider client.
///
/// A missing API key still yields a client; every call then fails with
/// `LlmNotConfigured` so the rest of the service keeps working.
pub fn build_client(cfg: &LlmConfig) -> Result<SharedLlm, MealwiseError> {
    let http = build_http_client(Duration::from_secs(cfg.timeout_secs.max(1)))?;
    let limiter = Arc::new(rate_limiter(cfg.requests_per_minute));
    info!(
        provider = ?cfg.provider,
        model = %cfg.model,
        configured = !cfg.api_key.is_empty(),
        "LLM client ready"
    );
    let client: SharedLlm = match cfg.provider {
        LlmProvider::Anthropic => Arc::new(AnthropicClient::new(cfg, http, limiter)?),
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(cfg, http, limiter)?),
    };
    Ok(client)
}

pub(crate) fn rate_limiter(per_minute: u32) -> DefaultDirectRateLimiter {
    let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_minute(per_minute))
}

/// Map a non-success provider response into an error, keeping a bounded body.
pub(crate) async fn upstream_error(resp: reqwest::Response) -> MealwiseError {
    let status = resp.status();
    let mut body = resp.text().await.unwrap_or_default();
    if body.len() > 512 {
        let cut = (0..=512).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        body.truncate(cut);
    }
    MealwiseError::LlmUpstream { status, body }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_is_clamped() {
        let limiter = rate_limiter(0);
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn builds_both_providers() {
        let mut cfg = LlmConfig::default();
        assert!(build_client(&cfg).is_ok());
        cfg.provider = LlmProvider::OpenAi;
        cfg.model = "gpt-4o-mini".into();
        assert!(build_client(&cfg).is_ok());
    }
}
