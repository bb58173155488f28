//! Relational store adapter: typed repository traits over the tenant data
//! model.
//!
//! Implementations must honor the unique keys the model declares
//! (`practices.slug`, `(practice_id, user_id)` on members,
//! `practice_invites.token`) and run [`UserPurgeRepository::purge_user`] as
//! one atomic transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::policy::MemberRole;
use crate::types::{MembershipSnapshot, Practice, PracticeInvite, PracticeMember};
use crate::ActionError;

#[cfg(feature = "mocks")]
mod mock;

#[cfg(feature = "mocks")]
pub use mock::MockTenantStore;

/// Payload for inserting a practice row.
#[derive(Debug, Clone)]
pub struct CreatePractice {
    pub name: String,
    pub slug: String,
    pub billing_email: Option<String>,
    pub currency: String,
    pub timezone: String,
}

/// The editable practice profile fields, pre-sanitized by the workflow.
#[derive(Debug, Clone)]
pub struct PracticeFields {
    pub name: String,
    pub billing_email: Option<String>,
    pub currency: String,
    pub timezone: String,
}

/// Payload for inserting a membership row.
#[derive(Debug, Clone)]
pub struct CreateMembership {
    pub practice_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub invited_by: Option<Uuid>,
}

/// Payload for inserting an invite row.
#[derive(Debug, Clone)]
pub struct CreateInvite {
    pub practice_id: Uuid,
    pub email: String,
    pub role: MemberRole,
    pub invited_by: Option<Uuid>,
    pub resolved_user_id: Option<Uuid>,
    pub token: String,
    /// Pre-populated when the provider already reports the invitee's email
    /// as confirmed.
    pub accepted_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait PracticeRepository: Send + Sync {
    async fn create(&self, data: CreatePractice) -> Result<Practice, ActionError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Practice>, ActionError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Practice>, ActionError>;
    /// Updates the profile fields and bumps `updated_at`.
    async fn update(&self, id: Uuid, fields: PracticeFields) -> Result<Practice, ActionError>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Inserts a membership, ignoring the unique (practice, user) conflict
    /// if a row already exists.
    async fn create_ignore_conflict(&self, data: CreateMembership) -> Result<(), ActionError>;

    async fn find_by_practice_and_user(
        &self,
        practice_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<PracticeMember>, ActionError>;

    /// Memberships left-joined with practice names, as snapshotted by the
    /// user deletion workflow.
    async fn memberships_with_practice(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<MembershipSnapshot>, ActionError>;

    async fn update_role(
        &self,
        practice_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<(), ActionError>;

    /// Live count of members holding `owner` in the practice. The owner
    /// invariant is checked against this read.
    async fn count_owners(&self, practice_id: Uuid) -> Result<u64, ActionError>;
}

#[async_trait]
pub trait InviteRepository: Send + Sync {
    async fn create(&self, data: CreateInvite) -> Result<PracticeInvite, ActionError>;

    /// The invite for (practice, email) that is neither accepted nor
    /// revoked, if one exists. At most one such row may exist at a time.
    async fn find_active(
        &self,
        practice_id: Uuid,
        email: &str,
    ) -> Result<Option<PracticeInvite>, ActionError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Upserts the account-settings fields, overwriting on conflict.
    async fn upsert_contact(
        &self,
        user_id: Uuid,
        full_name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(), ActionError>;

    /// Upserts the profile with `practice_id` as default, overwriting an
    /// existing default. Used when the user creates a practice themselves.
    async fn set_default_practice(
        &self,
        user_id: Uuid,
        practice_id: Uuid,
    ) -> Result<(), ActionError>;

    /// Inserts the profile with `practice_id` as default, doing nothing on
    /// conflict. Used for invitees so an existing default is not clobbered.
    async fn ensure_default_practice(
        &self,
        user_id: Uuid,
        practice_id: Uuid,
    ) -> Result<(), ActionError>;
}

/// Transactional cleanup of everything the store holds for one user.
#[async_trait]
pub trait UserPurgeRepository: Send + Sync {
    /// In one atomic transaction: deletes the user's membership rows,
    /// revokes their still-pending invites, nulls `resolved_user_id` on any
    /// invite that named them, and deletes their profile row.
    async fn purge_user(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), ActionError>;
}
