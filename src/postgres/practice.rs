use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::store::{CreatePractice, PracticeFields, PracticeRepository};
use crate::types::Practice;
use crate::ActionError;

#[derive(Clone)]
pub struct PostgresPracticeRepository {
    pool: PgPool,
}

impl PostgresPracticeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct PracticeRecord {
    id: Uuid,
    name: String,
    slug: String,
    billing_email: Option<String>,
    currency: String,
    timezone: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PracticeRecord> for Practice {
    fn from(row: PracticeRecord) -> Self {
        Practice {
            id: row.id,
            name: row.name,
            slug: row.slug,
            billing_email: row.billing_email,
            currency: row.currency,
            timezone: row.timezone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl PracticeRepository for PostgresPracticeRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn create(&self, data: CreatePractice) -> Result<Practice, ActionError> {
        let row: PracticeRecord = sqlx::query_as(
            r"
            INSERT INTO practices (name, slug, billing_email, currency, timezone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, slug, billing_email, currency, timezone, created_at, updated_at
            ",
        )
        .bind(&data.name)
        .bind(&data.slug)
        .bind(&data.billing_email)
        .bind(&data.currency)
        .bind(&data.timezone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "archibill", "msg=\"database error\", operation=\"create_practice\", error=\"{e}\"");
            ActionError::Database(e.to_string())
        })?;

        Ok(row.into())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Practice>, ActionError> {
        let row: Option<PracticeRecord> = sqlx::query_as(
            "SELECT id, name, slug, billing_email, currency, timezone, created_at, updated_at FROM practices WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "archibill", "msg=\"database error\", operation=\"find_practice_by_id\", error=\"{e}\"");
            ActionError::Database(e.to_string())
        })?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Practice>, ActionError> {
        let row: Option<PracticeRecord> = sqlx::query_as(
            "SELECT id, name, slug, billing_email, currency, timezone, created_at, updated_at FROM practices WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "archibill", "msg=\"database error\", operation=\"find_practice_by_slug\", error=\"{e}\"");
            ActionError::Database(e.to_string())
        })?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn update(&self, id: Uuid, fields: PracticeFields) -> Result<Practice, ActionError> {
        let row: Option<PracticeRecord> = sqlx::query_as(
            r"
            UPDATE practices
            SET name = $1, billing_email = $2, currency = $3, timezone = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING id, name, slug, billing_email, currency, timezone, created_at, updated_at
            ",
        )
        .bind(&fields.name)
        .bind(&fields.billing_email)
        .bind(&fields.currency)
        .bind(&fields.timezone)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "archibill", "msg=\"database error\", operation=\"update_practice\", error=\"{e}\"");
            ActionError::Database(e.to_string())
        })?;

        row.map(Into::into)
            .ok_or_else(|| ActionError::NotFound("Practice not found".to_owned()))
    }
}
