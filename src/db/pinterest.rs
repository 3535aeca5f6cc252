use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::sqlite::{Storage, parse_ts};
use crate::error::MealwiseError;

/// Stored Pinterest OAuth tokens for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PinterestConnection {
    pub user_id: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub scope: Option<String>,
    pub username: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PinterestConnection {
    /// True when the access token is expired or expires within `margin_secs`.
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin_secs: i64) -> bool {
        (self.expires_at - now).num_seconds() <= margin_secs
    }
}

impl Storage {
    pub async fn get_pinterest_connection(
        &self,
        user_id: &str,
    ) -> Result<Option<PinterestConnection>, MealwiseError> {
        let row = sqlx::query(
            r#"SELECT user_id, access_token, refresh_token, expires_at, scope, username, updated_at
               FROM pinterest_connections WHERE user_id = ?"#,
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        row.map(row_to_connection).transpose().map_err(Into::into)
    }

    pub async fn upsert_pinterest_connection(
        &self,
        conn: &PinterestConnection,
    ) -> Result<(), MealwiseError> {
        sqlx::query(
            r#"
            INSERT INTO pinterest_connections (
                user_id, access_token, refresh_token, expires_at, scope, username, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                access_token=excluded.access_token,
                refresh_token=excluded.refresh_token,
                expires_at=excluded.expires_at,
                scope=excluded.scope,
                username=COALESCE(excluded.username, pinterest_connections.username),
                updated_at=excluded.updated_at
            "#,
        )
        .bind(&conn.user_id)
        .bind(&conn.access_token)
        .bind(&conn.refresh_token)
        .bind(conn.expires_at.to_rfc3339())
        .bind(&conn.scope)
        .bind(&conn.username)
        .bind(conn.updated_at.to_rfc3339())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn delete_pinterest_connection(&self, user_id: &str) -> Result<bool, MealwiseError> {
        let res = sqlx::query("DELETE FROM pinterest_connections WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

fn row_to_connection(row: SqliteRow) -> Result<PinterestConnection, sqlx::Error> {
    let expires_at: String = row.try_get("expires_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    Ok(PinterestConnection {
        user_id: row.try_get("user_id")?,
        access_token: row.try_get("access_token")?,
        refresh_token: row.try_get("refresh_token")?,
        expires_at: parse_ts(&expires_at)?,
        scope: row.try_get("scope")?,
        username: row.try_get("username")?,
        updated_at: parse_ts(&updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn refresh_margin() {
        let now = Utc::now();
        let conn = PinterestConnection {
            user_id: "u".into(),
            access_token: "a".into(),
            refresh_token: None,
            expires_at: now + Duration::seconds(200),
            scope: None,
            username: None,
            updated_at: now,
        };
        assert!(conn.needs_refresh(now, 300));
        assert!(!conn.needs_refresh(now, 60));
    }
}
