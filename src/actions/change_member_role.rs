use serde_json::json;
use uuid::Uuid;

use crate::actor::Actor;
use crate::audit::{AuditAction, AuditLogRepository, NewAuditEntry};
use crate::invariant::assert_owner_retained;
use crate::policy::{can_manage_members, MemberRole, DENY_MANAGE_MEMBERS};
use crate::store::MembershipRepository;
use crate::ActionError;

/// Which surface initiated the role change.
///
/// Site-wide administrators may act on any practice regardless of their own
/// membership; the practice-settings surface requires the actor to be an
/// owner of that practice. Everything after authorization (the idempotent
/// short-circuit, the owner-invariant check, the write and the audit entry)
/// is identical for both, so the two surfaces cannot diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChangeOrigin {
    PracticeSettings,
    AdminDashboard,
}

impl RoleChangeOrigin {
    fn as_str(self) -> &'static str {
        match self {
            Self::PracticeSettings => "practice_settings",
            Self::AdminDashboard => "admin_dashboard",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChangeMemberRoleInput {
    pub practice_id: Uuid,
    pub member_user_id: Uuid,
    pub role: MemberRole,
    pub origin: RoleChangeOrigin,
}

/// Whether the role was written or already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChangeOutcome {
    Updated,
    AlreadySet,
}

impl RoleChangeOutcome {
    /// The user-facing success message for this outcome.
    pub fn message(self, role: MemberRole) -> String {
        match self {
            Self::Updated => format!("Member role updated to {role}"),
            Self::AlreadySet => format!("Role already set to {role}"),
        }
    }
}

/// Changes a member's role within a practice.
pub struct ChangeMemberRoleAction<M, A>
where
    M: MembershipRepository,
    A: AuditLogRepository,
{
    members: M,
    audit: A,
}

impl<M, A> ChangeMemberRoleAction<M, A>
where
    M: MembershipRepository,
    A: AuditLogRepository,
{
    pub fn new(members: M, audit: A) -> Self {
        Self { members, audit }
    }

    /// # Errors
    ///
    /// - `ActionError::Forbidden`: practice-settings origin and the actor
    ///   is not an owner of the practice
    /// - `ActionError::NotFound`: target holds no membership there
    /// - `ActionError::OwnerInvariant`: demotion would leave the practice
    ///   without an owner
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "change_member_role", skip_all, err)
    )]
    pub async fn execute(
        &self,
        actor: &Actor,
        input: ChangeMemberRoleInput,
    ) -> Result<RoleChangeOutcome, ActionError> {
        if input.origin == RoleChangeOrigin::PracticeSettings {
            let actor_role = self
                .members
                .find_by_practice_and_user(input.practice_id, actor.id)
                .await?
                .map(|m| m.role);
            if !can_manage_members(actor_role) {
                return Err(ActionError::Forbidden(DENY_MANAGE_MEMBERS.to_owned()));
            }
        }

        let target = self
            .members
            .find_by_practice_and_user(input.practice_id, input.member_user_id)
            .await?
            .ok_or_else(|| ActionError::NotFound("Member not found".to_owned()))?;

        // setting the current role again is a no-op success, invariants not
        // consulted
        if target.role == input.role {
            return Ok(RoleChangeOutcome::AlreadySet);
        }

        assert_owner_retained(
            &self.members,
            input.practice_id,
            target.role,
            input.role,
            input.member_user_id == actor.id,
        )
        .await?;

        self.members
            .update_role(input.practice_id, input.member_user_id, input.role)
            .await?;

        self.audit
            .append(NewAuditEntry {
                action: AuditAction::PracticeMemberRoleUpdated,
                actor_user_id: Some(actor.id),
                target_user_id: Some(input.member_user_id),
                metadata: json!({
                    "actor_email": actor.email,
                    "practice_id": input.practice_id,
                    "previous_role": target.role,
                    "new_role": input.role,
                    "origin": input.origin.as_str(),
                }),
            })
            .await?;

        log::info!(
            target: "archibill",
            "msg=\"member role updated\", practice_id={}, member_id={}, previous=\"{}\", new=\"{}\", origin=\"{}\"",
            input.practice_id,
            input.member_user_id,
            target.role,
            input.role,
            input.origin.as_str()
        );

        Ok(RoleChangeOutcome::Updated)
    }
}

#[cfg(all(test, feature = "mocks"))]
mod tests {
    use super::*;
    use crate::invariant::{DENY_LAST_OWNER, DENY_SELF_DEMOTION};
    use crate::policy::DENY_MANAGE_MEMBERS;
    use crate::store::{CreateMembership, CreatePractice, MockTenantStore};

    async fn seed_practice(store: &MockTenantStore) -> Uuid {
        store
            .seed_practice(CreatePractice {
                name: "Acme".to_owned(),
                slug: "acme".to_owned(),
                billing_email: None,
                currency: "GBP".to_owned(),
                timezone: "Europe/London".to_owned(),
            })
            .await
            .id
    }

    async fn add_member(store: &MockTenantStore, practice_id: Uuid, role: MemberRole) -> Actor {
        let actor = Actor::new(Uuid::new_v4(), Some(format!("{role}@example.com")));
        store
            .create_ignore_conflict(CreateMembership {
                practice_id,
                user_id: actor.id,
                role,
                invited_by: None,
            })
            .await
            .unwrap();
        actor
    }

    fn input(
        practice_id: Uuid,
        member_user_id: Uuid,
        role: MemberRole,
        origin: RoleChangeOrigin,
    ) -> ChangeMemberRoleInput {
        ChangeMemberRoleInput {
            practice_id,
            member_user_id,
            role,
            origin,
        }
    }

    #[tokio::test]
    async fn test_sole_owner_cannot_demote_self() {
        let store = MockTenantStore::new();
        let practice_id = seed_practice(&store).await;
        let alice = add_member(&store, practice_id, MemberRole::Owner).await;

        let action = ChangeMemberRoleAction::new(store.clone(), store.clone());
        let err = action
            .execute(
                &alice,
                input(
                    practice_id,
                    alice.id,
                    MemberRole::Admin,
                    RoleChangeOrigin::PracticeSettings,
                ),
            )
            .await
            .unwrap_err();

        assert_eq!(err, ActionError::OwnerInvariant(DENY_SELF_DEMOTION.to_owned()));

        // state unchanged, nothing audited
        let members = store.members_of(practice_id);
        assert_eq!(members[0].role, MemberRole::Owner);
        assert!(store.audit_entries().is_empty());
    }

    #[tokio::test]
    async fn test_self_demotion_after_promoting_second_owner() {
        let store = MockTenantStore::new();
        let practice_id = seed_practice(&store).await;
        let alice = add_member(&store, practice_id, MemberRole::Owner).await;
        let bob = add_member(&store, practice_id, MemberRole::Admin).await;

        let action = ChangeMemberRoleAction::new(store.clone(), store.clone());

        let first = action
            .execute(
                &alice,
                input(
                    practice_id,
                    bob.id,
                    MemberRole::Owner,
                    RoleChangeOrigin::PracticeSettings,
                ),
            )
            .await
            .unwrap();
        assert_eq!(first, RoleChangeOutcome::Updated);

        let second = action
            .execute(
                &alice,
                input(
                    practice_id,
                    alice.id,
                    MemberRole::Admin,
                    RoleChangeOrigin::PracticeSettings,
                ),
            )
            .await
            .unwrap();
        assert_eq!(second, RoleChangeOutcome::Updated);

        let alice_row = store
            .find_by_practice_and_user(practice_id, alice.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alice_row.role, MemberRole::Admin);
    }

    #[tokio::test]
    async fn test_idempotent_reassignment() {
        let store = MockTenantStore::new();
        let practice_id = seed_practice(&store).await;
        let alice = add_member(&store, practice_id, MemberRole::Owner).await;
        let bob = add_member(&store, practice_id, MemberRole::Member).await;

        let action = ChangeMemberRoleAction::new(store.clone(), store.clone());
        let outcome = action
            .execute(
                &alice,
                input(
                    practice_id,
                    bob.id,
                    MemberRole::Member,
                    RoleChangeOrigin::PracticeSettings,
                ),
            )
            .await
            .unwrap();

        assert_eq!(outcome, RoleChangeOutcome::AlreadySet);
        assert_eq!(outcome.message(MemberRole::Member), "Role already set to member");
        assert!(store.audit_entries().is_empty());
    }

    #[tokio::test]
    async fn test_non_owner_denied() {
        let store = MockTenantStore::new();
        let practice_id = seed_practice(&store).await;
        add_member(&store, practice_id, MemberRole::Owner).await;
        let admin = add_member(&store, practice_id, MemberRole::Admin).await;
        let bob = add_member(&store, practice_id, MemberRole::Member).await;

        let action = ChangeMemberRoleAction::new(store.clone(), store.clone());
        let err = action
            .execute(
                &admin,
                input(
                    practice_id,
                    bob.id,
                    MemberRole::Viewer,
                    RoleChangeOrigin::PracticeSettings,
                ),
            )
            .await
            .unwrap_err();

        assert_eq!(err, ActionError::Forbidden(DENY_MANAGE_MEMBERS.to_owned()));
    }

    #[tokio::test]
    async fn test_admin_origin_skips_membership_requirement() {
        let store = MockTenantStore::new();
        let practice_id = seed_practice(&store).await;
        add_member(&store, practice_id, MemberRole::Owner).await;
        let bob = add_member(&store, practice_id, MemberRole::Member).await;

        // site admin with no membership in this practice
        let site_admin = Actor::new(Uuid::new_v4(), Some("root@example.com".to_owned()));

        let action = ChangeMemberRoleAction::new(store.clone(), store.clone());
        let outcome = action
            .execute(
                &site_admin,
                input(
                    practice_id,
                    bob.id,
                    MemberRole::Admin,
                    RoleChangeOrigin::AdminDashboard,
                ),
            )
            .await
            .unwrap();

        assert_eq!(outcome, RoleChangeOutcome::Updated);

        let entries = store.audit_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::PracticeMemberRoleUpdated);
        assert_eq!(entries[0].actor_user_id, Some(site_admin.id));
        assert_eq!(entries[0].metadata["previous_role"], "member");
        assert_eq!(entries[0].metadata["new_role"], "admin");
    }

    #[tokio::test]
    async fn test_admin_origin_shares_owner_invariant() {
        let store = MockTenantStore::new();
        let practice_id = seed_practice(&store).await;
        let alice = add_member(&store, practice_id, MemberRole::Owner).await;
        let site_admin = Actor::new(Uuid::new_v4(), None);

        let action = ChangeMemberRoleAction::new(store.clone(), store.clone());
        let err = action
            .execute(
                &site_admin,
                input(
                    practice_id,
                    alice.id,
                    MemberRole::Member,
                    RoleChangeOrigin::AdminDashboard,
                ),
            )
            .await
            .unwrap_err();

        assert_eq!(err, ActionError::OwnerInvariant(DENY_LAST_OWNER.to_owned()));
    }

    #[tokio::test]
    async fn test_missing_member_not_found() {
        let store = MockTenantStore::new();
        let practice_id = seed_practice(&store).await;
        let alice = add_member(&store, practice_id, MemberRole::Owner).await;

        let action = ChangeMemberRoleAction::new(store.clone(), store.clone());
        let err = action
            .execute(
                &alice,
                input(
                    practice_id,
                    Uuid::new_v4(),
                    MemberRole::Member,
                    RoleChangeOrigin::PracticeSettings,
                ),
            )
            .await
            .unwrap_err();

        assert_eq!(err, ActionError::NotFound("Member not found".to_owned()));
    }

    #[tokio::test]
    async fn test_practice_settings_path_writes_audit_entry() {
        let store = MockTenantStore::new();
        let practice_id = seed_practice(&store).await;
        let alice = add_member(&store, practice_id, MemberRole::Owner).await;
        let bob = add_member(&store, practice_id, MemberRole::Member).await;

        let action = ChangeMemberRoleAction::new(store.clone(), store.clone());
        action
            .execute(
                &alice,
                input(
                    practice_id,
                    bob.id,
                    MemberRole::Admin,
                    RoleChangeOrigin::PracticeSettings,
                ),
            )
            .await
            .unwrap();

        let entries = store.audit_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].metadata["origin"], "practice_settings");
    }
}
