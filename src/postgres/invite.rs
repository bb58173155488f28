use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::parse_role;
use crate::store::{CreateInvite, InviteRepository};
use crate::types::PracticeInvite;
use crate::ActionError;

#[derive(Clone)]
pub struct PostgresInviteRepository {
    pool: PgPool,
}

impl PostgresInviteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct InviteRecord {
    id: Uuid,
    practice_id: Uuid,
    email: String,
    role: String,
    invited_by: Option<Uuid>,
    resolved_user_id: Option<Uuid>,
    token: String,
    created_at: DateTime<Utc>,
    last_sent_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
    revoked_at: Option<DateTime<Utc>>,
}

impl InviteRecord {
    fn into_invite(self) -> Result<PracticeInvite, ActionError> {
        Ok(PracticeInvite {
            id: self.id,
            practice_id: self.practice_id,
            email: self.email,
            role: parse_role(&self.role)?,
            invited_by: self.invited_by,
            resolved_user_id: self.resolved_user_id,
            token: self.token,
            created_at: self.created_at,
            last_sent_at: self.last_sent_at,
            accepted_at: self.accepted_at,
            revoked_at: self.revoked_at,
        })
    }
}

#[async_trait]
impl InviteRepository for PostgresInviteRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, data), err))]
    async fn create(&self, data: CreateInvite) -> Result<PracticeInvite, ActionError> {
        let row: InviteRecord = sqlx::query_as(
            r"
            INSERT INTO practice_invites
                (practice_id, email, role, invited_by, resolved_user_id, token, accepted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, practice_id, email, role, invited_by, resolved_user_id, token,
                      created_at, last_sent_at, accepted_at, revoked_at
            ",
        )
        .bind(data.practice_id)
        .bind(&data.email)
        .bind(data.role.as_str())
        .bind(data.invited_by)
        .bind(data.resolved_user_id)
        .bind(&data.token)
        .bind(data.accepted_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "archibill", "msg=\"database error\", operation=\"create_invite\", error=\"{e}\"");
            ActionError::Database(e.to_string())
        })?;

        row.into_invite()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_active(
        &self,
        practice_id: Uuid,
        email: &str,
    ) -> Result<Option<PracticeInvite>, ActionError> {
        let row: Option<InviteRecord> = sqlx::query_as(
            r"
            SELECT id, practice_id, email, role, invited_by, resolved_user_id, token,
                   created_at, last_sent_at, accepted_at, revoked_at
            FROM practice_invites
            WHERE practice_id = $1 AND LOWER(email) = LOWER($2)
              AND accepted_at IS NULL AND revoked_at IS NULL
            ",
        )
        .bind(practice_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "archibill", "msg=\"database error\", operation=\"find_active_invite\", error=\"{e}\"");
            ActionError::Database(e.to_string())
        })?;

        row.map(InviteRecord::into_invite).transpose()
    }
}
