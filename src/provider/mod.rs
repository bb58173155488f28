//! Identity provider adapter.
//!
//! Wraps the external auth provider's administrative APIs behind a
//! strongly-typed trait. Field shapes are validated once at this edge; the
//! workflows never inspect untyped records. Errors are normalized into
//! [`ActionError`]: missing users become `Ok(None)` on reads and
//! `NotFound` on deletes, "email already registered" becomes
//! `AlreadyRegistered`, everything else becomes `Provider`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ActionError;

#[cfg(feature = "mocks")]
mod mock;

#[cfg(feature = "mocks")]
pub use mock::MockIdentityProvider;

/// Ban horizon applied by [`IdentityProvider::set_ban_duration`] callers:
/// ten years, effectively permanent.
pub const BAN_DURATION_HOURS: i64 = 87_600;

/// An identity-provider user, as seen by administrative calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: Uuid,
    pub email: Option<String>,
    /// Set once the user has confirmed their email.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Set while a ban is in effect.
    pub banned_until: Option<DateTime<Utc>>,
}

impl IdentityUser {
    /// Whether a ban is currently in effect.
    pub fn is_banned(&self) -> bool {
        matches!(self.banned_until, Some(until) if until > Utc::now())
    }

    /// Case-insensitive email comparison, the provider's matching rule.
    pub fn email_matches(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .is_some_and(|e| e.eq_ignore_ascii_case(email))
    }
}

/// Administrative and invite capabilities consumed from the auth provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Fetches a user by id. `Ok(None)` when the provider has no such user.
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<IdentityUser>, ActionError>;

    /// One page of users, 1-based. An empty page means the listing is
    /// exhausted.
    async fn list_users(&self, page: u32, per_page: u32) -> Result<Vec<IdentityUser>, ActionError>;

    /// Sets or clears the ban horizon. `None` lifts the ban. Returns the
    /// updated user so callers can audit the post-update state.
    async fn set_ban_duration(
        &self,
        id: Uuid,
        duration: Option<Duration>,
    ) -> Result<IdentityUser, ActionError>;

    /// Deletes the identity. `NotFound` when it is already gone; the
    /// deletion workflow tolerates that.
    async fn delete_user(&self, id: Uuid) -> Result<(), ActionError>;

    /// Sends an invitation email, creating an unconfirmed identity.
    /// `AlreadyRegistered` when the email has an account.
    async fn invite_by_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<IdentityUser, ActionError>;

    /// Triggers the provider's password-reset email flow.
    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), ActionError>;
}

const LOOKUP_PAGE_SIZE: u32 = 100;

/// Locates an existing identity by email, case-insensitively, by paging
/// through the provider's user listing. Used as the fallback when an invite
/// hits `AlreadyRegistered`.
pub async fn find_user_by_email<P>(
    provider: &P,
    email: &str,
) -> Result<Option<IdentityUser>, ActionError>
where
    P: IdentityProvider + ?Sized,
{
    let mut page = 1;
    loop {
        let users = provider.list_users(page, LOOKUP_PAGE_SIZE).await?;
        if users.is_empty() {
            return Ok(None);
        }
        if let Some(user) = users.into_iter().find(|u| u.email_matches(email)) {
            return Ok(Some(user));
        }
        page += 1;
    }
}
