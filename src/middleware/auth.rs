use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use subtle::ConstantTimeEq;

use crate::error::MealwiseError;
use crate::router::AppState;

pub const USER_HEADER: &str = "x-user-id";
const MAX_USER_ID_LEN: usize = 128;

/// Ensure the inbound request carries the service key.
/// Accepts either:
/// - Header: `Authorization: Bearer <key>`
/// - Header: `x-api-key: <key>`
pub fn ensure_authorized(headers: &HeaderMap, expected: &str) -> Result<(), MealwiseError> {
    // an empty key would let anyone in
    if expected.is_empty() {
        return Err(MealwiseError::Unauthorized);
    }
    let matches = |presented: &str| bool::from(presented.as_bytes().ct_eq(expected.as_bytes()));

    if let Some(hv) = headers.get("x-api-key").and_then(|v| v.to_str().ok())
        && matches(hv.trim())
    {
        return Ok(());
    }

    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let auth = auth.trim();
        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            && matches(token.trim())
        {
            return Ok(());
        }
    }

    Err(MealwiseError::Unauthorized)
}

/// The acting user's id from `x-user-id`.
pub fn user_from_headers(headers: &HeaderMap) -> Result<String, MealwiseError> {
    let user = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(MealwiseError::MissingUser)?;
    if user.len() > MAX_USER_ID_LEN {
        return Err(MealwiseError::Validation("x-user-id is too long".to_string()));
    }
    Ok(user.to_string())
}

/// Authenticated caller of an `/api` route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = MealwiseError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        ensure_authorized(&parts.headers, &state.config.basic.service_key)?;
        Ok(Self(user_from_headers(&parts.headers)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        h
    }

    #[test]
    fn accepts_bearer_or_api_key() {
        assert!(ensure_authorized(&headers(&[("authorization", "Bearer s3cret")]), "s3cret").is_ok());
        assert!(ensure_authorized(&headers(&[("x-api-key", "s3cret")]), "s3cret").is_ok());
        assert!(ensure_authorized(&headers(&[("x-api-key", "nope")]), "s3cret").is_err());
        assert!(ensure_authorized(&headers(&[]), "s3cret").is_err());
    }

    #[test]
    fn empty_server_key_rejects_everything() {
        assert!(ensure_authorized(&headers(&[("x-api-key", "")]), "").is_err());
    }

    #[test]
    fn user_header() {
        assert_eq!(user_from_headers(&headers(&[(USER_HEADER, " u-1 ")])).unwrap(), "u-1");
        assert!(matches!(
            user_from_headers(&headers(&[(USER_HEADER, "  ")])),
            Err(MealwiseError::MissingUser)
        ));
        let long = "x".repeat(200);
        assert!(user_from_headers(&headers(&[(USER_HEADER, long.as_str())])).is_err());
    }
}
