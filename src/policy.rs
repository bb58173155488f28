//! Authorization policy: pure role checks with no I/O.
//!
//! These functions answer "may this role perform this action"; they never
//! consult the store. The owner-count invariant is a separate concern,
//! enforced by [`crate::invariant`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Denial message when a non-owner tries to manage membership.
pub const DENY_MANAGE_MEMBERS: &str = "Only practice owners can change member roles";

/// Denial message when a non-owner/admin tries to edit the practice profile.
pub const DENY_MANAGE_PRACTICE: &str = "You do not have permission to update this practice";

/// A user's permission level within one practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl MemberRole {
    /// Database/string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }

    /// Parses the stored form. Returns `None` for anything outside the enum.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Self::Owner),
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    pub fn is_owner(self) -> bool {
        matches!(self, Self::Owner)
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a role may edit the practice profile (name, billing email,
/// currency, timezone). Owners and admins only. `None` means the requester
/// holds no membership at all.
pub fn can_manage_practice(role: Option<MemberRole>) -> bool {
    matches!(role, Some(MemberRole::Owner | MemberRole::Admin))
}

/// Whether a role may change member roles or send invitations. Owners only.
pub fn can_manage_members(role: Option<MemberRole>) -> bool {
    matches!(role, Some(MemberRole::Owner))
}
