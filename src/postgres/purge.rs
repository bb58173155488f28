use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::UserPurgeRepository;
use crate::ActionError;

#[derive(Clone)]
pub struct PostgresUserPurgeRepository {
    pool: PgPool,
}

impl PostgresUserPurgeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(operation: &str) -> impl FnOnce(sqlx::Error) -> ActionError + '_ {
    move |e| {
        log::error!(target: "archibill", "msg=\"database error\", operation=\"{operation}\", error=\"{e}\"");
        ActionError::Database(e.to_string())
    }
}

#[async_trait]
impl UserPurgeRepository for PostgresUserPurgeRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn purge_user(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), ActionError> {
        let mut tx = self.pool.begin().await.map_err(db_err("purge_user_begin"))?;

        sqlx::query("DELETE FROM practice_members WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("purge_user_members"))?;

        // pending invites naming the user become revoked, then every invite
        // that referenced them loses the reference but keeps its history
        sqlx::query(
            r"
            UPDATE practice_invites SET revoked_at = $2
            WHERE resolved_user_id = $1 AND accepted_at IS NULL AND revoked_at IS NULL
            ",
        )
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err("purge_user_revoke_invites"))?;

        sqlx::query("UPDATE practice_invites SET resolved_user_id = NULL WHERE resolved_user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("purge_user_unlink_invites"))?;

        sqlx::query("DELETE FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("purge_user_profile"))?;

        tx.commit().await.map_err(db_err("purge_user_commit"))
    }
}
