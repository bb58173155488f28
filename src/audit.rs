//! Append-only audit trail for privileged actions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::ActionError;

/// The privileged action a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Ban,
    Unban,
    PasswordResetRequested,
    UserDeleted,
    PracticeMemberRoleUpdated,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ban => "ban",
            Self::Unban => "unban",
            Self::PasswordResetRequested => "password_reset_requested",
            Self::UserDeleted => "user_deleted",
            Self::PracticeMemberRoleUpdated => "practice_member_role_updated",
        }
    }
}

/// One immutable entry. Entries are never updated or deleted.
///
/// `actor_user_id` is `None` for system-initiated actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub action: AuditAction,
    pub actor_user_id: Option<Uuid>,
    pub target_user_id: Option<Uuid>,
    /// Free-form payload: before/after state plus human-readable identifiers
    /// (emails, practice names) so entries stay legible after the referenced
    /// rows are gone.
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// Payload for appending an entry.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub action: AuditAction,
    pub actor_user_id: Option<Uuid>,
    pub target_user_id: Option<Uuid>,
    pub metadata: Value,
}

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Appends an entry. Written in the same logical operation as the action
    /// it records; a failed append surfaces as a store error.
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, ActionError>;

    /// Most recent entries, newest first. Read by the admin dashboard.
    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, ActionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_string_forms() {
        assert_eq!(AuditAction::Ban.as_str(), "ban");
        assert_eq!(
            AuditAction::PasswordResetRequested.as_str(),
            "password_reset_requested"
        );
        assert_eq!(
            AuditAction::PracticeMemberRoleUpdated.as_str(),
            "practice_member_role_updated"
        );
    }

    #[test]
    fn test_action_serde_snake_case() {
        let json = serde_json::to_string(&AuditAction::UserDeleted).unwrap();
        assert_eq!(json, "\"user_deleted\"");
    }
}
