use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::parse_role;
use crate::policy::MemberRole;
use crate::store::{CreateMembership, MembershipRepository};
use crate::types::{MembershipSnapshot, PracticeMember};
use crate::ActionError;

#[derive(Clone)]
pub struct PostgresMembershipRepository {
    pool: PgPool,
}

impl PostgresMembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct MemberRecord {
    id: Uuid,
    practice_id: Uuid,
    user_id: Uuid,
    role: String,
    invited_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl MemberRecord {
    fn into_member(self) -> Result<PracticeMember, ActionError> {
        Ok(PracticeMember {
            id: self.id,
            practice_id: self.practice_id,
            user_id: self.user_id,
            role: parse_role(&self.role)?,
            invited_by: self.invited_by,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct SnapshotRecord {
    practice_id: Uuid,
    practice_name: Option<String>,
    role: String,
}

#[async_trait]
impl MembershipRepository for PostgresMembershipRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn create_ignore_conflict(&self, data: CreateMembership) -> Result<(), ActionError> {
        sqlx::query(
            r"
            INSERT INTO practice_members (practice_id, user_id, role, invited_by)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (practice_id, user_id) DO NOTHING
            ",
        )
        .bind(data.practice_id)
        .bind(data.user_id)
        .bind(data.role.as_str())
        .bind(data.invited_by)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "archibill", "msg=\"database error\", operation=\"create_membership\", error=\"{e}\"");
            ActionError::Database(e.to_string())
        })?;

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_practice_and_user(
        &self,
        practice_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<PracticeMember>, ActionError> {
        let row: Option<MemberRecord> = sqlx::query_as(
            "SELECT id, practice_id, user_id, role, invited_by, created_at FROM practice_members WHERE practice_id = $1 AND user_id = $2",
        )
        .bind(practice_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "archibill", "msg=\"database error\", operation=\"find_membership\", error=\"{e}\"");
            ActionError::Database(e.to_string())
        })?;

        row.map(MemberRecord::into_member).transpose()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn memberships_with_practice(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<MembershipSnapshot>, ActionError> {
        let rows: Vec<SnapshotRecord> = sqlx::query_as(
            r"
            SELECT m.practice_id, p.name AS practice_name, m.role
            FROM practice_members m
            LEFT JOIN practices p ON p.id = m.practice_id
            WHERE m.user_id = $1
            ORDER BY m.created_at
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "archibill", "msg=\"database error\", operation=\"memberships_with_practice\", error=\"{e}\"");
            ActionError::Database(e.to_string())
        })?;

        rows.into_iter()
            .map(|r| {
                Ok(MembershipSnapshot {
                    practice_id: r.practice_id,
                    practice_name: r.practice_name,
                    role: parse_role(&r.role)?,
                })
            })
            .collect()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn update_role(
        &self,
        practice_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<(), ActionError> {
        let result = sqlx::query(
            "UPDATE practice_members SET role = $1 WHERE practice_id = $2 AND user_id = $3",
        )
        .bind(role.as_str())
        .bind(practice_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "archibill", "msg=\"database error\", operation=\"update_member_role\", error=\"{e}\"");
            ActionError::Database(e.to_string())
        })?;

        if result.rows_affected() == 0 {
            return Err(ActionError::NotFound("Member not found".to_owned()));
        }
        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn count_owners(&self, practice_id: Uuid) -> Result<u64, ActionError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM practice_members WHERE practice_id = $1 AND role = 'owner'",
        )
        .bind(practice_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "archibill", "msg=\"database error\", operation=\"count_owners\", error=\"{e}\"");
            ActionError::Database(e.to_string())
        })?;

        Ok(count.max(0) as u64)
    }
}
