use super::endpoints::{PinterestEndpoints, PinterestTokenResponse};
use super::types::{Board, Page, PinSummary};
use crate::config::PinterestConfig;
use crate::db::{PinterestConnection, Storage};
use crate::error::MealwiseError;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use oauth2::{CsrfToken, TokenResponse};
use tracing::{info, warn};
use url::Url;

/// Used when the token response omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Pinterest account linking and browsing on behalf of one user.
#[derive(Clone)]
pub struct PinterestService {
    storage: Storage,
    http: reqwest::Client,
    config: PinterestConfig,
}

impl PinterestService {
    pub fn new(storage: Storage, http: reqwest::Client, config: PinterestConfig) -> Self {
        Self {
            storage,
            http,
            config,
        }
    }

    pub fn authorize_url(&self) -> Result<(Url, CsrfToken), MealwiseError> {
        PinterestEndpoints::authorize_url(&self.config)
    }

    /// Finish the OAuth flow: exchange the code and store the connection.
    pub async fn complete_connect(
        &self,
        user_id: &str,
        code: String,
    ) -> Result<PinterestConnection, MealwiseError> {
        let token = PinterestEndpoints::exchange_code(&self.config, code, &self.http).await?;
        let mut conn = connection_from_token(user_id, &token, None, Utc::now());

        match PinterestEndpoints::user_account(&self.config, &conn.access_token, &self.http).await
        {
            Ok(account) => conn.username = account.username,
            Err(e) => warn!("Pinterest user_account lookup failed for {}: {}", user_id, e),
        }

        self.storage.upsert_pinterest_connection(&conn).await?;
        info!(user_id, username = ?conn.username, "Pinterest account connected");
        Ok(conn)
    }

    pub async fn status(&self, user_id: &str) -> Result<Option<PinterestConnection>, MealwiseError> {
        self.storage.get_pinterest_connection(user_id).await
    }

    pub async fn disconnect(&self, user_id: &str) -> Result<bool, MealwiseError> {
        let removed = self.storage.delete_pinterest_connection(user_id).await?;
        if removed {
            info!(user_id, "Pinterest account disconnected");
        }
        Ok(removed)
    }

    /// A usable access token, refreshed first when it is close to expiry.
    pub async fn valid_access_token(&self, user_id: &str) -> Result<String, MealwiseError> {
        let conn = self
            .storage
            .get_pinterest_connection(user_id)
            .await?
            .ok_or(MealwiseError::PinterestNotConnected)?;
        let now = Utc::now();
        if !conn.needs_refresh(now, self.config.refresh_margin_secs) {
            return Ok(conn.access_token);
        }

        let Some(refresh_token) = conn.refresh_token.clone() else {
            return Err(self.force_reconnect(user_id, "no refresh token").await);
        };
        match PinterestEndpoints::refresh_access_token(&self.config, &refresh_token, &self.http)
            .await
        {
            Ok(token) => {
                let mut fresh = connection_from_token(user_id, &token, Some(refresh_token), now);
                fresh.username = conn.username;
                self.storage.upsert_pinterest_connection(&fresh).await?;
                info!(user_id, expires_at = %fresh.expires_at, "Pinterest token refreshed");
                Ok(fresh.access_token)
            }
            Err(MealwiseError::Oauth2Server { error }) => {
                Err(self.force_reconnect(user_id, &error).await)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list_boards(
        &self,
        user_id: &str,
        bookmark: Option<&str>,
    ) -> Result<Page<Board>, MealwiseError> {
        let token = self.valid_access_token(user_id).await?;
        let res = PinterestEndpoints::list_boards(&self.config, &token, bookmark, &self.http).await;
        self.check_revoked(user_id, res).await
    }

    pub async fn list_board_pins(
        &self,
        user_id: &str,
        board_id: &str,
        bookmark: Option<&str>,
    ) -> Result<Page<PinSummary>, MealwiseError> {
        let token = self.valid_access_token(user_id).await?;
        let res = PinterestEndpoints::list_board_pins(
            &self.config,
            &token,
            board_id,
            bookmark,
            &self.http,
        )
        .await;
        self.check_revoked(user_id, res).await
    }

    pub async fn get_pin(&self, user_id: &str, pin_id: &str) -> Result<PinSummary, MealwiseError> {
        let token = self.valid_access_token(user_id).await?;
        let res = PinterestEndpoints::get_pin(&self.config, &token, pin_id, &self.http).await;
        self.check_revoked(user_id, res).await
    }

    /// A 401 from the API means the grant was revoked on Pinterest's side.
    async fn check_revoked<T>(
        &self,
        user_id: &str,
        res: Result<T, MealwiseError>,
    ) -> Result<T, MealwiseError> {
        match res {
            Err(MealwiseError::UpstreamStatus(StatusCode::UNAUTHORIZED)) => {
                Err(self.force_reconnect(user_id, "access token rejected").await)
            }
            other => other,
        }
    }

    async fn force_reconnect(&self, user_id: &str, reason: &str) -> MealwiseError {
        warn!(user_id, reason, "dropping Pinterest connection; reconnect required");
        if let Err(e) = self.storage.delete_pinterest_connection(user_id).await {
            return e;
        }
        MealwiseError::PinterestReconnect
    }
}

/// `previous_refresh` is kept when the response carries no new refresh token.
fn connection_from_token(
    user_id: &str,
    token: &PinterestTokenResponse,
    previous_refresh: Option<String>,
    now: DateTime<Utc>,
) -> PinterestConnection {
    let lifetime = token
        .expires_in()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
    let scope = token.scopes().map(|scopes| {
        scopes
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",")
    });
    PinterestConnection {
        user_id: user_id.to_string(),
        access_token: token.access_token().secret().to_string(),
        refresh_token: token
            .refresh_token()
            .map(|t| t.secret().to_string())
            .or(previous_refresh),
        expires_at: now + Duration::seconds(lifetime),
        scope,
        username: None,
        updated_at: now,
    }
}
