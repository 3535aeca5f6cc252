use async_trait::async_trait;
use backon::Retryable;
use governor::DefaultDirectRateLimiter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{CompletionRequest, LlmClient, upstream_error};
use crate::config::LlmConfig;
use crate::error::{IsRetryable, MealwiseError};
use crate::http::default_retry_policy;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 2],
    response_format: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
    max_tokens: u32,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl OpenAiClient {
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
            endpoint: base.join("v1/chat/completions")?,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            limiter,
        })
    }

    async fn send(&self, req: &CompletionRequest) -> Result<String, MealwiseError> {
        self.limiter.until_ready().await;
        // every prompt asks for a JSON object, so JSON mode is always on
        let body = ChatRequest {
            model: &self.model,
            max_tokens: req.max_tokens.unwrap_or(self.max_tokens),
            messages: [
                ChatMessage {
                    role: "system",
                    content: &req.system,
                },
                ChatMessage {
                    role: "user",
                    content: &req.prompt,
                },
            ],
            response_format: json!({ "type": "json_object" }),
        };
        let resp = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(upstream_error(resp).await);
        }
        let parsed: ChatResponse = resp.json().await?;
        let Some(choice) = parsed.choices.into_iter().next() else {
            return Err(MealwiseError::LlmOutput("no choices in response".to_string()));
        };
        if choice.finish_reason.as_deref() == Some("length") {
            warn!("OpenAI reply hit max_tokens; output may be truncated");
        }
        let text = choice.message.content.unwrap_or_default();
        debug!(chars = text.len(), "OpenAI completion received");
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, req: CompletionRequest) -> Result<String, MealwiseError> {
        if self.api_key.is_empty() {
            return Err(MealwiseError::LlmNotConfigured);
        }
        (|| async { self.send(&req).await })
            .retry(default_retry_policy())
            .when(|e: &MealwiseError| e.is_retryable())
            .notify(|err, dur: Duration| {
                warn!("OpenAI call failed, retrying in {:?}: {}", dur, err);
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;

    fn mock_client(server: &MockServer) -> OpenAiClient {
        let cfg = LlmConfig {
            api_key: "k".into(),
            model: "gpt-test".into(),
            base_url: Some(Url::parse(&server.url("/")).unwrap()),
            ..Default::default()
        };
        let limiter = Arc::new(crate::llm::rate_limiter(600));
        OpenAiClient::new(&cfg, reqwest::Client::new(), limiter).unwrap()
    }

    #[test]
    fn request_shape() {
        let body = ChatRequest {
            model: "m",
            max_tokens: 10,
            messages: [
                ChatMessage { role: "system", content: "s" },
                ChatMessage { role: "user", content: "p" },
            ],
            response_format: json!({ "type": "json_object" }),
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["messages"][1]["content"], "p");
        assert_eq!(v["response_format"]["type"], "json_object");
    }

    #[test]
    fn default_endpoint() {
        let cfg = LlmConfig::default();
        let limiter = Arc::new(governor::RateLimiter::direct(governor::Quota::per_minute(
            std::num::NonZeroU32::MIN,
        )));
        let client = OpenAiClient::new(&cfg, reqwest::Client::new(), limiter).unwrap();
        assert_eq!(
            client.endpoint.as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn sends_bearer_and_json_mode() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer k")
                    .json_body_includes(
                        r#"{"model":"gpt-test","response_format":{"type":"json_object"}}"#,
                    );
                then.status(200).json_body(json!({
                    "choices": [{
                        "message": {"content": "{\"meals\":[]}"},
                        "finish_reason": "stop"
                    }]
                }));
            })
            .await;
        let text = mock_client(&server)
            .complete(CompletionRequest::new("s", "p"))
            .await
            .unwrap();
        assert_eq!(text, "{\"meals\":[]}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limited_calls_are_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(429).body("slow down");
            })
            .await;
        let err = mock_client(&server)
            .complete(CompletionRequest::new("s", "p"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MealwiseError::LlmUpstream { status, .. } if status == reqwest::StatusCode::TOO_MANY_REQUESTS
        ));
        // first attempt plus three retries
        mock.assert_hits_async(4).await;
    }

    #[tokio::test]
    async fn bad_request_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(400).body("é".repeat(600));
            })
            .await;
        let err = mock_client(&server)
            .complete(CompletionRequest::new("s", "p"))
            .await
            .unwrap_err();
        match err {
            MealwiseError::LlmUpstream { status, body } => {
                assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
                // cut lands on a char boundary
                assert_eq!(body.len(), 512);
                assert!(body.chars().all(|c| c == 'é'));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        mock.assert_hits_async(1).await;
    }
}
