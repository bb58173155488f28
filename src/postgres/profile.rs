use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::ProfileRepository;
use crate::ActionError;

#[derive(Clone)]
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, full_name, phone), err))]
    async fn upsert_contact(
        &self,
        user_id: Uuid,
        full_name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(), ActionError> {
        sqlx::query(
            r"
            INSERT INTO profiles (user_id, full_name, phone)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
                SET full_name = EXCLUDED.full_name,
                    phone = EXCLUDED.phone,
                    updated_at = NOW()
            ",
        )
        .bind(user_id)
        .bind(full_name)
        .bind(phone)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "archibill", "msg=\"database error\", operation=\"upsert_profile_contact\", error=\"{e}\"");
            ActionError::Database(e.to_string())
        })?;

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn set_default_practice(
        &self,
        user_id: Uuid,
        practice_id: Uuid,
    ) -> Result<(), ActionError> {
        sqlx::query(
            r"
            INSERT INTO profiles (user_id, default_practice_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
                SET default_practice_id = EXCLUDED.default_practice_id,
                    updated_at = NOW()
            ",
        )
        .bind(user_id)
        .bind(practice_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "archibill", "msg=\"database error\", operation=\"set_default_practice\", error=\"{e}\"");
            ActionError::Database(e.to_string())
        })?;

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn ensure_default_practice(
        &self,
        user_id: Uuid,
        practice_id: Uuid,
    ) -> Result<(), ActionError> {
        sqlx::query(
            r"
            INSERT INTO profiles (user_id, default_practice_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(practice_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "archibill", "msg=\"database error\", operation=\"ensure_default_practice\", error=\"{e}\"");
            ActionError::Database(e.to_string())
        })?;

        Ok(())
    }
}
