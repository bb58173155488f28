//! Core tenant data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::policy::MemberRole;

/// A practice is the tenant organization that owns members, invites and
/// billing data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Practice {
    pub id: Uuid,
    pub name: String,
    /// URL-safe unique identifier derived from the name.
    pub slug: String,
    pub billing_email: Option<String>,
    /// ISO currency code, defaults to "GBP".
    pub currency: String,
    /// IANA timezone, defaults to "Europe/London".
    pub timezone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 1:1 extension of an identity-provider user.
///
/// Upserted whenever a user edits account settings, creates a practice or is
/// invited to one. `default_practice_id` is nulled (not cascaded) when the
/// referenced practice goes away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Identity-provider user id; primary key.
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub default_practice_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Binds a user to a practice with a role. Unique per (practice, user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeMember {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    /// Who invited this member, when membership came from an invite.
    pub invited_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A membership joined with its practice's name, as read by the user
/// deletion workflow and recorded in the audit snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipSnapshot {
    pub practice_id: Uuid,
    /// Left-joined; absent if the practice row is gone.
    pub practice_name: Option<String>,
    pub role: MemberRole,
}

/// An offer of membership sent to an email address.
///
/// State machine: pending → accepted (invitee's identity confirmed) or
/// pending → revoked (invitee's account deleted while still pending). Both
/// terminal, no transitions out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeInvite {
    pub id: Uuid,
    pub practice_id: Uuid,
    /// Case-normalized at creation.
    pub email: String,
    pub role: MemberRole,
    pub invited_by: Option<Uuid>,
    /// Identity-provider id of the invitee, resolved at invite time. Nulled
    /// if that account is later deleted, preserving the invite history.
    pub resolved_user_id: Option<Uuid>,
    /// Opaque token included in the invite link; unique.
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub last_sent_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl PracticeInvite {
    pub fn is_accepted(&self) -> bool {
        self.accepted_at.is_some()
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Neither accepted nor revoked. At most one pending invite may exist
    /// per (practice, email).
    pub fn is_pending(&self) -> bool {
        self.accepted_at.is_none() && self.revoked_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite() -> PracticeInvite {
        let now = Utc::now();
        PracticeInvite {
            id: Uuid::new_v4(),
            practice_id: Uuid::new_v4(),
            email: "invitee@example.com".to_owned(),
            role: MemberRole::Member,
            invited_by: None,
            resolved_user_id: None,
            token: "tok".to_owned(),
            created_at: now,
            last_sent_at: now,
            accepted_at: None,
            revoked_at: None,
        }
    }

    #[test]
    fn test_invite_starts_pending() {
        let invite = invite();
        assert!(invite.is_pending());
        assert!(!invite.is_accepted());
        assert!(!invite.is_revoked());
    }

    #[test]
    fn test_invite_terminal_states() {
        let accepted = PracticeInvite {
            accepted_at: Some(Utc::now()),
            ..invite()
        };
        assert!(accepted.is_accepted());
        assert!(!accepted.is_pending());

        let revoked = PracticeInvite {
            revoked_at: Some(Utc::now()),
            ..invite()
        };
        assert!(revoked.is_revoked());
        assert!(!revoked.is_pending());
    }
}
