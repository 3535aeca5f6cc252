use crate::db::schema::SQLITE_INIT;
use crate::error::MealwiseError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::{debug, info};

pub type SqlitePool = Pool<Sqlite>;

const DATE_FMT: &str = "%Y-%m-%d";

/// Handle to every table; cheap to clone.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, MealwiseError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives and dies with its single connection.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(connect_opts)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(connect_opts).await?
        };

        let storage = Self::new(pool);
        storage.init_schema().await?;
        info!(database_url = %database_url, "storage ready");
        Ok(storage)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply the bundled DDL in one transaction; a failing statement leaves
    /// the database untouched. Safe to rerun.
    pub async fn init_schema(&self) -> Result<(), MealwiseError> {
        let mut tx = self.pool.begin().await?;
        let mut applied = 0usize;
        for stmt in SQLITE_INIT.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(stmt).execute(&mut *tx).await?;
            applied += 1;
        }
        tx.commit().await?;
        debug!(statements = applied, "schema applied");
        Ok(())
    }
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String, MealwiseError> {
    Ok(serde_json::to_string(value)?)
}

pub(crate) fn from_json<T: DeserializeOwned>(raw: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, sqlx::Error> {
    NaiveDate::parse_from_str(raw, DATE_FMT).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

pub(crate) fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}
