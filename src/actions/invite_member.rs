use chrono::Utc;
use uuid::Uuid;

use crate::actor::Actor;
use crate::crypto::generate_token_default;
use crate::policy::{can_manage_members, MemberRole};
use crate::provider::{find_user_by_email, IdentityProvider};
use crate::store::{
    CreateInvite, CreateMembership, InviteRepository, MembershipRepository, ProfileRepository,
};
use crate::types::PracticeInvite;
use crate::validators::validate_email;
use crate::ActionError;

const DENY_INVITE: &str = "Only practice owners can invite members";

/// Where the provider's invitation email sends new users to finish signup.
#[derive(Debug, Clone)]
pub struct InviteMemberConfig {
    pub redirect_to: String,
}

impl Default for InviteMemberConfig {
    fn default() -> Self {
        Self {
            redirect_to: "http://localhost:3000/auth/callback".to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InviteMemberInput {
    pub practice_id: Uuid,
    pub email: String,
    pub role: MemberRole,
}

/// How the invite resolved: a fresh signup email, or an existing account
/// attached directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteOutcome {
    InvitationSent,
    AddedExistingUser,
}

impl InviteOutcome {
    /// The user-facing success message for this outcome.
    pub fn message(self, email: &str) -> String {
        match self {
            Self::InvitationSent => format!("Invitation sent to {email}"),
            Self::AddedExistingUser => format!("Added existing user {email}"),
        }
    }
}

/// Invites an email address into a practice. Owners only.
///
/// Unknown addresses get a provider invitation email; addresses the provider
/// already knows skip the email and are resolved by listing. Either way the
/// invitee ends up with a membership row, a default-practice profile, and an
/// invite row, recorded as accepted when their email is confirmed.
pub struct InviteMemberAction<I, M, V, F>
where
    I: IdentityProvider,
    M: MembershipRepository,
    V: InviteRepository,
    F: ProfileRepository,
{
    provider: I,
    members: M,
    invites: V,
    profiles: F,
    config: InviteMemberConfig,
}

impl<I, M, V, F> InviteMemberAction<I, M, V, F>
where
    I: IdentityProvider,
    M: MembershipRepository,
    V: InviteRepository,
    F: ProfileRepository,
{
    pub fn new(provider: I, members: M, invites: V, profiles: F) -> Self {
        Self {
            provider,
            members,
            invites,
            profiles,
            config: InviteMemberConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InviteMemberConfig) -> Self {
        self.config = config;
        self
    }

    /// # Errors
    ///
    /// - `ActionError::Forbidden`: actor is not an owner of the practice
    /// - `ActionError::Validation`: malformed email
    /// - `ActionError::Conflict`: a pending invite exists, or the address
    ///   is already a member
    /// - `ActionError::NotFound`: provider reports the address registered
    ///   but its listing cannot locate the account
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "invite_member", skip_all, err)
    )]
    pub async fn execute(
        &self,
        actor: &Actor,
        input: InviteMemberInput,
    ) -> Result<(InviteOutcome, PracticeInvite), ActionError> {
        let membership = self
            .members
            .find_by_practice_and_user(input.practice_id, actor.id)
            .await?;
        if !can_manage_members(membership.map(|m| m.role)) {
            return Err(ActionError::Forbidden(DENY_INVITE.to_owned()));
        }

        let email = input.email.trim().to_lowercase();
        validate_email(&email)?;

        if self
            .invites
            .find_active(input.practice_id, &email)
            .await?
            .is_some()
        {
            return Err(ActionError::Conflict(format!(
                "An invitation has already been sent to {email}"
            )));
        }

        let (outcome, user) = match self
            .provider
            .invite_by_email(&email, &self.config.redirect_to)
            .await
        {
            Ok(user) => (InviteOutcome::InvitationSent, user),
            Err(ActionError::AlreadyRegistered) => {
                let user = find_user_by_email(&self.provider, &email)
                    .await?
                    .ok_or_else(|| {
                        ActionError::NotFound(format!(
                            "Unable to locate existing account for {email}"
                        ))
                    })?;

                if self
                    .members
                    .find_by_practice_and_user(input.practice_id, user.id)
                    .await?
                    .is_some()
                {
                    return Err(ActionError::Conflict(format!(
                        "{email} is already a member of this practice"
                    )));
                }

                (InviteOutcome::AddedExistingUser, user)
            }
            Err(err) => return Err(err),
        };

        // both branches leave the invitee resolved to a provider identity,
        // so the membership and default-practice rows are written either way
        self.members
            .create_ignore_conflict(CreateMembership {
                practice_id: input.practice_id,
                user_id: user.id,
                role: input.role,
                invited_by: Some(actor.id),
            })
            .await?;

        self.profiles
            .ensure_default_practice(user.id, input.practice_id)
            .await?;

        let invite = self
            .invites
            .create(CreateInvite {
                practice_id: input.practice_id,
                email: email.clone(),
                role: input.role,
                invited_by: Some(actor.id),
                resolved_user_id: Some(user.id),
                token: generate_token_default(),
                accepted_at: match outcome {
                    InviteOutcome::AddedExistingUser => user.confirmed_at.map(|_| Utc::now()),
                    InviteOutcome::InvitationSent => None,
                },
            })
            .await?;

        log::info!(
            target: "archibill",
            "msg=\"member invited\", practice_id={}, email=\"{}\", role=\"{}\", existing={}",
            input.practice_id,
            email,
            input.role,
            outcome == InviteOutcome::AddedExistingUser
        );

        Ok((outcome, invite))
    }
}

#[cfg(all(test, feature = "mocks"))]
mod tests {
    use super::*;
    use crate::provider::MockIdentityProvider;
    use crate::store::{CreatePractice, MockTenantStore};

    async fn setup() -> (MockIdentityProvider, MockTenantStore, Actor, Uuid) {
        let provider = MockIdentityProvider::new();
        let store = MockTenantStore::new();
        let practice = store
            .seed_practice(CreatePractice {
                name: "Acme".to_owned(),
                slug: "acme".to_owned(),
                billing_email: None,
                currency: "GBP".to_owned(),
                timezone: "Europe/London".to_owned(),
            })
            .await;

        let owner = Actor::new(Uuid::new_v4(), Some("owner@example.com".to_owned()));
        store
            .create_ignore_conflict(CreateMembership {
                practice_id: practice.id,
                user_id: owner.id,
                role: MemberRole::Owner,
                invited_by: None,
            })
            .await
            .unwrap();

        (provider, store, owner, practice.id)
    }

    fn action(
        provider: &MockIdentityProvider,
        store: &MockTenantStore,
    ) -> InviteMemberAction<MockIdentityProvider, MockTenantStore, MockTenantStore, MockTenantStore>
    {
        InviteMemberAction::new(provider.clone(), store.clone(), store.clone(), store.clone())
    }

    fn input(practice_id: Uuid, email: &str) -> InviteMemberInput {
        InviteMemberInput {
            practice_id,
            email: email.to_owned(),
            role: MemberRole::Member,
        }
    }

    #[tokio::test]
    async fn test_invite_new_email_sends_invitation() {
        let (provider, store, owner, practice_id) = setup().await;
        let action = action(&provider, &store);

        let (outcome, invite) = action
            .execute(&owner, input(practice_id, "  Grace@Example.com "))
            .await
            .unwrap();

        assert_eq!(outcome, InviteOutcome::InvitationSent);
        assert_eq!(invite.email, "grace@example.com");
        assert!(invite.is_pending());
        assert_eq!(invite.invited_by, Some(owner.id));
        assert_eq!(provider.invites_sent(), vec!["grace@example.com".to_owned()]);

        // the fresh identity is attached right away, pending confirmation
        let members = store.members_of(practice_id);
        assert_eq!(members.len(), 2);
        let grace_row = members
            .iter()
            .find(|m| m.user_id != owner.id)
            .unwrap();
        assert_eq!(grace_row.role, MemberRole::Member);
        assert_eq!(grace_row.invited_by, Some(owner.id));
        assert_eq!(grace_row.user_id, invite.resolved_user_id.unwrap());

        let profile = store.profile_of(grace_row.user_id).unwrap();
        assert_eq!(profile.default_practice_id, Some(practice_id));
    }

    #[tokio::test]
    async fn test_invite_existing_user_added_directly() {
        let (provider, store, owner, practice_id) = setup().await;
        let grace = provider.add_user("grace@example.com", true, None);
        let action = action(&provider, &store);

        let (outcome, invite) = action
            .execute(&owner, input(practice_id, "grace@example.com"))
            .await
            .unwrap();

        assert_eq!(outcome, InviteOutcome::AddedExistingUser);
        assert_eq!(
            outcome.message("grace@example.com"),
            "Added existing user grace@example.com"
        );
        assert!(invite.is_accepted());
        assert_eq!(invite.resolved_user_id, Some(grace));

        let members = store.members_of(practice_id);
        assert_eq!(members.len(), 2);
        let grace_row = members.iter().find(|m| m.user_id == grace).unwrap();
        assert_eq!(grace_row.role, MemberRole::Member);
        assert_eq!(grace_row.invited_by, Some(owner.id));

        // no invitation email went out for the existing account
        assert!(provider.invites_sent().is_empty());
    }

    #[tokio::test]
    async fn test_invite_existing_member_conflicts() {
        let (provider, store, owner, practice_id) = setup().await;
        let grace = provider.add_user("grace@example.com", true, None);
        store
            .create_ignore_conflict(CreateMembership {
                practice_id,
                user_id: grace,
                role: MemberRole::Viewer,
                invited_by: None,
            })
            .await
            .unwrap();

        let action = action(&provider, &store);
        let err = action
            .execute(&owner, input(practice_id, "grace@example.com"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ActionError::Conflict(
                "grace@example.com is already a member of this practice".to_owned()
            )
        );
    }

    #[tokio::test]
    async fn test_invite_pending_duplicate_conflicts() {
        let (provider, store, owner, practice_id) = setup().await;
        let action = action(&provider, &store);

        action
            .execute(&owner, input(practice_id, "grace@example.com"))
            .await
            .unwrap();
        let err = action
            .execute(&owner, input(practice_id, "GRACE@example.com"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ActionError::Conflict(
                "An invitation has already been sent to grace@example.com".to_owned()
            )
        );
        assert_eq!(store.invites_of(practice_id).len(), 1);
    }

    #[tokio::test]
    async fn test_invite_requires_owner() {
        let (provider, store, _owner, practice_id) = setup().await;
        let admin = Actor::new(Uuid::new_v4(), None);
        store
            .create_ignore_conflict(CreateMembership {
                practice_id,
                user_id: admin.id,
                role: MemberRole::Admin,
                invited_by: None,
            })
            .await
            .unwrap();

        let action = action(&provider, &store);
        let err = action
            .execute(&admin, input(practice_id, "grace@example.com"))
            .await
            .unwrap_err();

        assert_eq!(err, ActionError::Forbidden(DENY_INVITE.to_owned()));
        assert!(provider.invites_sent().is_empty());
    }

    #[tokio::test]
    async fn test_invite_rejects_malformed_email() {
        let (provider, store, owner, practice_id) = setup().await;
        let action = action(&provider, &store);

        let err = action
            .execute(&owner, input(practice_id, "not-an-email"))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Validation(_)));
    }
}
