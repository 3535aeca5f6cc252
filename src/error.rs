use axum::{Json, http::StatusCode, response::IntoResponse};
use oauth2::basic::BasicErrorResponseType;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum MealwiseError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("page exceeds {0} bytes")]
    PageTooLarge(usize),

    #[error("missing or invalid service key")]
    Unauthorized,

    #[error("missing x-user-id header")]
    MissingUser,

    #[error("profile missing or onboarding incomplete")]
    ProfileIncomplete,

    #[error("recipe already saved: {0}")]
    DuplicateRecipe(String),

    #[error("LLM is not configured")]
    LlmNotConfigured,

    #[error("LLM upstream returned {status}: {body}")]
    LlmUpstream { status: StatusCode, body: String },

    #[error("unusable LLM output: {0}")]
    LlmOutput(String),

    #[error("OAuth2 token request error: {0}")]
    Oauth2Token(String),

    #[error("OAuth2 server error: {error}")]
    Oauth2Server { error: String },

    #[error("OAuth flow error: {0}")]
    OauthFlowError(String),

    #[error("Pinterest account not connected")]
    PinterestNotConnected,

    #[error("Pinterest authorization expired; reconnect required")]
    PinterestReconnect,

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("no recipe information")]
    NoRecipeInformation,
}

/// Whether a failed upstream call is worth another attempt.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for MealwiseError {
    fn is_retryable(&self) -> bool {
        match self {
            MealwiseError::Reqwest(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            MealwiseError::LlmUpstream { status, .. } | MealwiseError::UpstreamStatus(status) => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            _ => false,
        }
    }
}

impl
    From<
        RequestTokenError<
            HttpClientError<reqwest::Error>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for MealwiseError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<reqwest::Error>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => MealwiseError::Oauth2Server {
                error: err.error().to_string(),
            },
            RequestTokenError::Request(req_e) => {
                MealwiseError::Oauth2Token(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => {
                MealwiseError::Json(parse_err.into_inner())
            }
            RequestTokenError::Other(s) => MealwiseError::Oauth2Token(s),
        }
    }
}

impl IntoResponse for MealwiseError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            MealwiseError::DatabaseError(e) => {
                error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred.".to_string(),
                )
            }
            MealwiseError::Json(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred.".to_string(),
            ),
            MealwiseError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{what} not found."),
            ),
            MealwiseError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg.clone())
            }
            MealwiseError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                "request body too large".to_string(),
            ),
            MealwiseError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "invalid or missing key".to_string(),
            ),
            MealwiseError::MissingUser => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "missing user identity".to_string(),
            ),
            MealwiseError::ProfileIncomplete => (
                StatusCode::CONFLICT,
                "PROFILE_INCOMPLETE",
                "Complete onboarding before generating a plan.".to_string(),
            ),
            MealwiseError::DuplicateRecipe(name) => (
                StatusCode::CONFLICT,
                "DUPLICATE_RECIPE",
                format!("A recipe named \"{name}\" is already saved."),
            ),
            MealwiseError::LlmNotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "LLM_UNAVAILABLE",
                "Recipe generation is not configured.".to_string(),
            ),
            MealwiseError::LlmUpstream { status, .. } => match *status {
                StatusCode::TOO_MANY_REQUESTS => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMIT",
                    "Upstream rate limit exceeded.".to_string(),
                ),
                _ => (
                    StatusCode::BAD_GATEWAY,
                    "LLM_UPSTREAM",
                    "Recipe generation failed upstream.".to_string(),
                ),
            },
            MealwiseError::LlmOutput(_) => (
                StatusCode::BAD_GATEWAY,
                "LLM_OUTPUT",
                "Recipe generation returned unusable output.".to_string(),
            ),
            MealwiseError::Oauth2Token(_)
            | MealwiseError::Oauth2Server { .. }
            | MealwiseError::OauthFlowError(_) => (
                StatusCode::BAD_REQUEST,
                "OAUTH_ERROR",
                self.to_string(),
            ),
            MealwiseError::PinterestNotConnected => (
                StatusCode::CONFLICT,
                "PINTEREST_NOT_CONNECTED",
                "Connect a Pinterest account first.".to_string(),
            ),
            MealwiseError::PinterestReconnect => (
                StatusCode::UNAUTHORIZED,
                "PINTEREST_RECONNECT",
                "Pinterest authorization expired; reconnect.".to_string(),
            ),
            MealwiseError::Reqwest(_)
            | MealwiseError::UrlParse(_)
            | MealwiseError::PageTooLarge(_) => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "Upstream service is unavailable.".to_string(),
            ),
            MealwiseError::UpstreamStatus(code) => {
                let (err_code, msg) = match *code {
                    StatusCode::TOO_MANY_REQUESTS => ("RATE_LIMIT", "Upstream rate limit exceeded."),
                    StatusCode::UNAUTHORIZED => ("UNAUTHORIZED", "Upstream authentication failed."),
                    StatusCode::FORBIDDEN => ("FORBIDDEN", "Upstream permission denied."),
                    StatusCode::NOT_FOUND => ("NOT_FOUND", "Upstream resource not found."),
                    _ => ("UPSTREAM_ERROR", "An upstream error occurred."),
                };
                let status = if code.is_client_error() && *code != StatusCode::TOO_MANY_REQUESTS {
                    *code
                } else {
                    StatusCode::BAD_GATEWAY
                };
                (status, err_code, msg.to_string())
            }
            MealwiseError::NoRecipeInformation => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "NO_RECIPE",
                self.to_string(),
            ),
        };
        let body = ApiErrorResponse {
            error: ApiErrorBody {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        let rate = MealwiseError::LlmUpstream {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
        };
        let server = MealwiseError::UpstreamStatus(StatusCode::BAD_GATEWAY);
        let client = MealwiseError::UpstreamStatus(StatusCode::BAD_REQUEST);
        assert!(rate.is_retryable());
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(!MealwiseError::ProfileIncomplete.is_retryable());
    }

    #[test]
    fn error_envelope_status() {
        let resp = MealwiseError::NotFound("meal plan").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = MealwiseError::DuplicateRecipe("Soup".into()).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
