use crate::config::{PINTEREST_AUTH_URL, PINTEREST_SCOPES, PinterestConfig};
use crate::error::{IsRetryable, MealwiseError};
use crate::http::default_retry_policy;

use super::types::{Board, Page, PinSummary, RawBoard, RawPin, UserAccount};
use backon::Retryable;
use oauth2::{
    AuthUrl, AuthorizationCode, Client as OAuth2Client, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, ExtraTokenFields, RedirectUrl, RefreshToken, Scope,
    StandardRevocableToken, StandardTokenResponse, TokenUrl,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenType,
    },
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Pinterest caps list pages at 100 items.
const PAGE_SIZE: &str = "25";

/// Stateless Pinterest OAuth and REST endpoints.
pub(super) struct PinterestEndpoints;

impl PinterestEndpoints {
    /// Consent URL plus the CSRF state the callback must echo.
    pub(super) fn authorize_url(cfg: &PinterestConfig) -> Result<(Url, CsrfToken), MealwiseError> {
        let client = build_oauth2_client(cfg)?;
        let (url, csrf) = client
            .authorize_url(CsrfToken::new_random)
            // Pinterest wants a comma-separated scope list
            .add_scope(Scope::new(PINTEREST_SCOPES.join(",")))
            .url();
        Ok((url, csrf))
    }

    pub(super) async fn exchange_code(
        cfg: &PinterestConfig,
        code: String,
        http_client: &reqwest::Client,
    ) -> Result<PinterestTokenResponse, MealwiseError> {
        let client = build_oauth2_client(cfg)?;
        let token = client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(http_client)
            .await?;
        debug!("Pinterest authorization code exchanged");
        Ok(token)
    }

    pub(super) async fn refresh_access_token(
        cfg: &PinterestConfig,
        refresh_token: &str,
        http_client: &reqwest::Client,
    ) -> Result<PinterestTokenResponse, MealwiseError> {
        let client = build_oauth2_client(cfg)?;
        let token = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(http_client)
            .await?;
        debug!("Pinterest access token refreshed");
        Ok(token)
    }

    pub(super) async fn user_account(
        cfg: &PinterestConfig,
        access_token: &str,
        http_client: &reqwest::Client,
    ) -> Result<UserAccount, MealwiseError> {
        let url = cfg.api_base.join("user_account")?;
        get_json(http_client, url, access_token).await
    }

    pub(super) async fn list_boards(
        cfg: &PinterestConfig,
        access_token: &str,
        bookmark: Option<&str>,
        http_client: &reqwest::Client,
    ) -> Result<Page<Board>, MealwiseError> {
        let url = paged(cfg.api_base.join("boards")?, bookmark);
        let page: Page<RawBoard> = get_json(http_client, url, access_token).await?;
        Ok(page.map(Board::from))
    }

    pub(super) async fn list_board_pins(
        cfg: &PinterestConfig,
        access_token: &str,
        board_id: &str,
        bookmark: Option<&str>,
        http_client: &reqwest::Client,
    ) -> Result<Page<PinSummary>, MealwiseError> {
        check_id(board_id)?;
        let url = paged(cfg.api_base.join(&format!("boards/{board_id}/pins"))?, bookmark);
        let page: Page<RawPin> = get_json(http_client, url, access_token).await?;
        Ok(page.map(PinSummary::from))
    }

    pub(super) async fn get_pin(
        cfg: &PinterestConfig,
        access_token: &str,
        pin_id: &str,
        http_client: &reqwest::Client,
    ) -> Result<PinSummary, MealwiseError> {
        check_id(pin_id)?;
        let url = cfg.api_base.join(&format!("pins/{pin_id}"))?;
        let pin: RawPin = get_json(http_client, url, access_token).await?;
        Ok(pin.into())
    }
}

/// Pinterest ids are numeric; anything else would escape the path.
fn check_id(id: &str) -> Result<(), MealwiseError> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(MealwiseError::Validation(format!("invalid Pinterest id: {id:?}")));
    }
    Ok(())
}

fn paged(mut url: Url, bookmark: Option<&str>) -> Url {
    {
        let mut q = url.query_pairs_mut();
        q.append_pair("page_size", PAGE_SIZE);
        if let Some(b) = bookmark.filter(|b| !b.is_empty()) {
            q.append_pair("bookmark", b);
        }
    }
    url
}

async fn get_json<T: DeserializeOwned>(
    http_client: &reqwest::Client,
    url: Url,
    access_token: &str,
) -> Result<T, MealwiseError> {
    (|| async {
        let resp = http_client
            .get(url.clone())
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MealwiseError::UpstreamStatus(status));
        }
        Ok(resp.json::<T>().await?)
    })
    .retry(default_retry_policy())
    .when(|e: &MealwiseError| e.is_retryable())
    .notify(|err, dur: Duration| {
        warn!("Pinterest API retrying after error {}, sleeping {:?}", err, dur);
    })
    .await
}

fn build_oauth2_client(cfg: &PinterestConfig) -> Result<PinterestOauth2Client, MealwiseError> {
    if cfg.client_id.is_empty() || cfg.client_secret.is_empty() {
        return Err(MealwiseError::OauthFlowError(
            "Pinterest client credentials are not configured".to_string(),
        ));
    }
    let client = OAuth2Client::new(ClientId::new(cfg.client_id.clone()))
        .set_client_secret(ClientSecret::new(cfg.client_secret.clone()))
        .set_auth_uri(AuthUrl::new(PINTEREST_AUTH_URL.to_string())?)
        .set_token_uri(TokenUrl::new(cfg.api_base.join("oauth/token")?.to_string())?)
        .set_redirect_uri(RedirectUrl::new(cfg.redirect_url.to_string())?);
    Ok(client)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(super) struct PinterestTokenFields {
    pub refresh_token_expires_in: Option<i64>,
}
impl ExtraTokenFields for PinterestTokenFields {}

pub(super) type PinterestTokenResponse =
    StandardTokenResponse<PinterestTokenFields, BasicTokenType>;

pub(super) type PinterestOauth2Client = OAuth2Client<
    BasicErrorResponse,
    PinterestTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> PinterestConfig {
        PinterestConfig {
            client_id: "cid".into(),
            client_secret: "secret".into(),
            ..Default::default()
        }
    }

    #[test]
    fn authorize_url_carries_client_scopes_and_state() {
        let (url, csrf) = PinterestEndpoints::authorize_url(&cfg()).unwrap();
        assert!(url.as_str().starts_with(PINTEREST_AUTH_URL));
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "cid");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["scope"], "boards:read,pins:read,user_accounts:read");
        assert_eq!(pairs["state"], *csrf.secret());
        assert_eq!(pairs["redirect_uri"], "http://localhost:8000/pinterest/callback");
    }

    #[test]
    fn unconfigured_client_is_rejected() {
        let err = PinterestEndpoints::authorize_url(&PinterestConfig::default()).unwrap_err();
        assert!(matches!(err, MealwiseError::OauthFlowError(_)));
    }

    #[test]
    fn ids_are_checked_and_pages_carry_bookmark() {
        assert!(check_id("12345").is_ok());
        assert!(check_id("../boards").is_err());
        let url = paged(Url::parse("https://api.test/v5/boards").unwrap(), Some("abc"));
        assert_eq!(url.query(), Some("page_size=25&bookmark=abc"));
    }
}
