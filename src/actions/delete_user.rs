use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::actor::Actor;
use crate::audit::{AuditAction, AuditLogRepository, NewAuditEntry};
use crate::provider::IdentityProvider;
use crate::store::{MembershipRepository, UserPurgeRepository};
use crate::ActionError;

const DENY_SELF_DELETE: &str = "You cannot delete your own account";

/// Permanently deletes a user: the provider identity first, then the store's
/// memberships, pending invites and profile in one transaction.
///
/// Refused up front when the target is the sole owner of any practice, so an
/// administrator must transfer ownership before the account can go. The
/// provider identity may already be gone; the purge still runs and the audit
/// entry records whether the identity was found.
pub struct DeleteUserAction<I, M, U, A>
where
    I: IdentityProvider,
    M: MembershipRepository,
    U: UserPurgeRepository,
    A: AuditLogRepository,
{
    provider: I,
    members: M,
    purge: U,
    audit: A,
}

impl<I, M, U, A> DeleteUserAction<I, M, U, A>
where
    I: IdentityProvider,
    M: MembershipRepository,
    U: UserPurgeRepository,
    A: AuditLogRepository,
{
    pub fn new(provider: I, members: M, purge: U, audit: A) -> Self {
        Self {
            provider,
            members,
            purge,
            audit,
        }
    }

    /// Returns the user-facing confirmation message.
    ///
    /// # Errors
    ///
    /// - `ActionError::Forbidden`: actor targeting themselves
    /// - `ActionError::OwnerInvariant`: target is the sole owner of at
    ///   least one practice
    /// - `ActionError::Provider` / `ActionError::Database`: upstream
    ///   failure before or during the destructive steps
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "delete_user", skip_all, err)
    )]
    pub async fn execute(
        &self,
        actor: &Actor,
        target_user_id: Uuid,
    ) -> Result<String, ActionError> {
        if actor.id == target_user_id {
            return Err(ActionError::Forbidden(DENY_SELF_DELETE.to_owned()));
        }

        let identity = self.provider.get_user_by_id(target_user_id).await?;
        let mut user_was_found = identity.is_some();
        let target_email = identity.and_then(|u| u.email);

        let memberships = self
            .members
            .memberships_with_practice(target_user_id)
            .await?;

        // every practice where the target is the only owner blocks deletion
        let mut sole_owner_of = Vec::new();
        for membership in memberships.iter().filter(|m| m.role.is_owner()) {
            if self.members.count_owners(membership.practice_id).await? <= 1 {
                sole_owner_of.push(membership);
            }
        }
        if !sole_owner_of.is_empty() {
            let names: Vec<&str> = sole_owner_of
                .iter()
                .filter_map(|m| m.practice_name.as_deref())
                .collect();
            let list = if names.is_empty() {
                "their practice".to_owned()
            } else {
                names.join(", ")
            };
            return Err(ActionError::OwnerInvariant(format!(
                "Cannot delete user while they are the sole owner of {list}. Transfer ownership first."
            )));
        }

        match self.provider.delete_user(target_user_id).await {
            Ok(()) => {}
            // identity already gone, the store cleanup still applies
            Err(ActionError::NotFound(_)) => user_was_found = false,
            Err(err) => return Err(err),
        }

        self.purge.purge_user(target_user_id, Utc::now()).await?;

        self.audit
            .append(NewAuditEntry {
                action: AuditAction::UserDeleted,
                actor_user_id: Some(actor.id),
                target_user_id: Some(target_user_id),
                metadata: json!({
                    "actor_email": actor.email,
                    "target_email": target_email,
                    "user_was_found": user_was_found,
                    "memberships": memberships,
                }),
            })
            .await?;

        log::info!(
            target: "archibill",
            "msg=\"user deleted\", target_id={}, identity_found={}, memberships={}",
            target_user_id,
            user_was_found,
            memberships.len()
        );

        Ok(match target_email {
            Some(email) => format!("Deleted {email}"),
            None => "Deleted".to_owned(),
        })
    }
}
