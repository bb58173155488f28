use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::audit::{AuditAction, AuditEntry, AuditLogRepository, NewAuditEntry};
use crate::ActionError;

#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn string_to_action(s: &str) -> Result<AuditAction, ActionError> {
    match s {
        "ban" => Ok(AuditAction::Ban),
        "unban" => Ok(AuditAction::Unban),
        "password_reset_requested" => Ok(AuditAction::PasswordResetRequested),
        "user_deleted" => Ok(AuditAction::UserDeleted),
        "practice_member_role_updated" => Ok(AuditAction::PracticeMemberRoleUpdated),
        other => Err(ActionError::Database(format!(
            "unknown audit action \"{other}\""
        ))),
    }
}

#[derive(FromRow)]
struct AuditRecord {
    id: Uuid,
    action: String,
    actor_user_id: Option<Uuid>,
    target_user_id: Option<Uuid>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl AuditRecord {
    fn into_entry(self) -> Result<AuditEntry, ActionError> {
        Ok(AuditEntry {
            id: self.id,
            action: string_to_action(&self.action)?,
            actor_user_id: self.actor_user_id,
            target_user_id: self.target_user_id,
            metadata: self.metadata,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, entry), err))]
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, ActionError> {
        let row: AuditRecord = sqlx::query_as(
            r"
            INSERT INTO admin_audit_logs (action, actor_user_id, target_user_id, metadata)
            VALUES ($1, $2, $3, $4)
            RETURNING id, action, actor_user_id, target_user_id, metadata, created_at
            ",
        )
        .bind(entry.action.as_str())
        .bind(entry.actor_user_id)
        .bind(entry.target_user_id)
        .bind(&entry.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "archibill", "msg=\"database error\", operation=\"append_audit_entry\", error=\"{e}\"");
            ActionError::Database(e.to_string())
        })?;

        row.into_entry()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, ActionError> {
        let rows: Vec<AuditRecord> = sqlx::query_as(
            "SELECT id, action, actor_user_id, target_user_id, metadata, created_at FROM admin_audit_logs ORDER BY created_at DESC LIMIT $1",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            log::error!(target: "archibill", "msg=\"database error\", operation=\"recent_audit_entries\", error=\"{e}\"");
            ActionError::Database(e.to_string())
        })?;

        rows.into_iter().map(AuditRecord::into_entry).collect()
    }
}
