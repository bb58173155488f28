use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    CreateInvite, CreateMembership, CreatePractice, InviteRepository, MembershipRepository,
    PracticeFields, PracticeRepository, ProfileRepository, UserPurgeRepository,
};
use crate::audit::{AuditEntry, AuditLogRepository, NewAuditEntry};
use crate::policy::MemberRole;
use crate::types::{MembershipSnapshot, Practice, PracticeInvite, PracticeMember, Profile};
use crate::ActionError;

#[derive(Default)]
struct State {
    practices: HashMap<Uuid, Practice>,
    members: Vec<PracticeMember>,
    invites: Vec<PracticeInvite>,
    profiles: HashMap<Uuid, Profile>,
    audit: Vec<AuditEntry>,
}

/// In-memory tenant store for tests.
///
/// One shared `State` behind a lock implements every repository trait, so a
/// single instance (or clones of it) behaves like one database: the purge
/// runs all its writes under one lock acquisition, modelling the required
/// transaction.
#[derive(Clone, Default)]
pub struct MockTenantStore {
    state: Arc<RwLock<State>>,
}

fn lock_poisoned<T>(_: T) -> ActionError {
    ActionError::Database("lock poisoned".to_owned())
}

impl MockTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a practice row directly, bypassing workflow validation.
    pub async fn seed_practice(&self, data: CreatePractice) -> Practice {
        PracticeRepository::create(self, data)
            .await
            .expect("seed practice")
    }

    /// Test observability: all membership rows for a practice.
    pub fn members_of(&self, practice_id: Uuid) -> Vec<PracticeMember> {
        self.state
            .read()
            .expect("lock poisoned")
            .members
            .iter()
            .filter(|m| m.practice_id == practice_id)
            .cloned()
            .collect()
    }

    /// Test observability: all invite rows for a practice.
    pub fn invites_of(&self, practice_id: Uuid) -> Vec<PracticeInvite> {
        self.state
            .read()
            .expect("lock poisoned")
            .invites
            .iter()
            .filter(|i| i.practice_id == practice_id)
            .cloned()
            .collect()
    }

    /// Test observability: the profile row for a user, if any.
    pub fn profile_of(&self, user_id: Uuid) -> Option<Profile> {
        self.state
            .read()
            .expect("lock poisoned")
            .profiles
            .get(&user_id)
            .cloned()
    }

    /// Test observability: every audit entry, oldest first.
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.read().expect("lock poisoned").audit.clone()
    }
}

#[async_trait]
impl PracticeRepository for MockTenantStore {
    async fn create(&self, data: CreatePractice) -> Result<Practice, ActionError> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if state.practices.values().any(|p| p.slug == data.slug) {
            return Err(ActionError::Database(
                "duplicate key value violates unique constraint \"practices_slug_key\"".to_owned(),
            ));
        }

        let now = Utc::now();
        let practice = Practice {
            id: Uuid::new_v4(),
            name: data.name,
            slug: data.slug,
            billing_email: data.billing_email,
            currency: data.currency,
            timezone: data.timezone,
            created_at: now,
            updated_at: now,
        };
        state.practices.insert(practice.id, practice.clone());
        Ok(practice)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Practice>, ActionError> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state.practices.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Practice>, ActionError> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state.practices.values().find(|p| p.slug == slug).cloned())
    }

    async fn update(&self, id: Uuid, fields: PracticeFields) -> Result<Practice, ActionError> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let practice = state
            .practices
            .get_mut(&id)
            .ok_or_else(|| ActionError::NotFound("Practice not found".to_owned()))?;

        practice.name = fields.name;
        practice.billing_email = fields.billing_email;
        practice.currency = fields.currency;
        practice.timezone = fields.timezone;
        practice.updated_at = Utc::now();

        Ok(practice.clone())
    }
}

#[async_trait]
impl MembershipRepository for MockTenantStore {
    async fn create_ignore_conflict(&self, data: CreateMembership) -> Result<(), ActionError> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let exists = state
            .members
            .iter()
            .any(|m| m.practice_id == data.practice_id && m.user_id == data.user_id);
        if exists {
            return Ok(());
        }

        state.members.push(PracticeMember {
            id: Uuid::new_v4(),
            practice_id: data.practice_id,
            user_id: data.user_id,
            role: data.role,
            invited_by: data.invited_by,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn find_by_practice_and_user(
        &self,
        practice_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<PracticeMember>, ActionError> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state
            .members
            .iter()
            .find(|m| m.practice_id == practice_id && m.user_id == user_id)
            .cloned())
    }

    async fn memberships_with_practice(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<MembershipSnapshot>, ActionError> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state
            .members
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| MembershipSnapshot {
                practice_id: m.practice_id,
                practice_name: state.practices.get(&m.practice_id).map(|p| p.name.clone()),
                role: m.role,
            })
            .collect())
    }

    async fn update_role(
        &self,
        practice_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<(), ActionError> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let member = state
            .members
            .iter_mut()
            .find(|m| m.practice_id == practice_id && m.user_id == user_id)
            .ok_or_else(|| ActionError::NotFound("Member not found".to_owned()))?;
        member.role = role;
        Ok(())
    }

    async fn count_owners(&self, practice_id: Uuid) -> Result<u64, ActionError> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state
            .members
            .iter()
            .filter(|m| m.practice_id == practice_id && m.role == MemberRole::Owner)
            .count() as u64)
    }
}

#[async_trait]
impl InviteRepository for MockTenantStore {
    async fn create(&self, data: CreateInvite) -> Result<PracticeInvite, ActionError> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let now = Utc::now();
        let invite = PracticeInvite {
            id: Uuid::new_v4(),
            practice_id: data.practice_id,
            email: data.email,
            role: data.role,
            invited_by: data.invited_by,
            resolved_user_id: data.resolved_user_id,
            token: data.token,
            created_at: now,
            last_sent_at: now,
            accepted_at: data.accepted_at,
            revoked_at: None,
        };
        state.invites.push(invite.clone());
        Ok(invite)
    }

    async fn find_active(
        &self,
        practice_id: Uuid,
        email: &str,
    ) -> Result<Option<PracticeInvite>, ActionError> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state
            .invites
            .iter()
            .find(|i| {
                i.practice_id == practice_id
                    && i.email.eq_ignore_ascii_case(email)
                    && i.is_pending()
            })
            .cloned())
    }
}

#[async_trait]
impl ProfileRepository for MockTenantStore {
    async fn upsert_contact(
        &self,
        user_id: Uuid,
        full_name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(), ActionError> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let now = Utc::now();
        match state.profiles.get_mut(&user_id) {
            Some(profile) => {
                profile.full_name = full_name.map(str::to_owned);
                profile.phone = phone.map(str::to_owned);
                profile.updated_at = now;
            }
            None => {
                state.profiles.insert(
                    user_id,
                    Profile {
                        user_id,
                        full_name: full_name.map(str::to_owned),
                        phone: phone.map(str::to_owned),
                        default_practice_id: None,
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
        Ok(())
    }

    async fn set_default_practice(
        &self,
        user_id: Uuid,
        practice_id: Uuid,
    ) -> Result<(), ActionError> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let now = Utc::now();
        match state.profiles.get_mut(&user_id) {
            Some(profile) => {
                profile.default_practice_id = Some(practice_id);
                profile.updated_at = now;
            }
            None => {
                state.profiles.insert(
                    user_id,
                    Profile {
                        user_id,
                        full_name: None,
                        phone: None,
                        default_practice_id: Some(practice_id),
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
        Ok(())
    }

    async fn ensure_default_practice(
        &self,
        user_id: Uuid,
        practice_id: Uuid,
    ) -> Result<(), ActionError> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if state.profiles.contains_key(&user_id) {
            // conflict-safe upsert is "do nothing" here
            return Ok(());
        }
        let now = Utc::now();
        state.profiles.insert(
            user_id,
            Profile {
                user_id,
                full_name: None,
                phone: None,
                default_practice_id: Some(practice_id),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl UserPurgeRepository for MockTenantStore {
    async fn purge_user(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), ActionError> {
        // single lock acquisition = single transaction
        let mut state = self.state.write().map_err(lock_poisoned)?;

        state.members.retain(|m| m.user_id != user_id);

        for invite in &mut state.invites {
            if invite.resolved_user_id == Some(user_id) {
                if invite.is_pending() {
                    invite.revoked_at = Some(now);
                }
                invite.resolved_user_id = None;
            }
        }

        state.profiles.remove(&user_id);
        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for MockTenantStore {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, ActionError> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let record = AuditEntry {
            id: Uuid::new_v4(),
            action: entry.action,
            actor_user_id: entry.actor_user_id,
            target_user_id: entry.target_user_id,
            metadata: entry.metadata,
            created_at: Utc::now(),
        };
        state.audit.push(record.clone());
        Ok(record)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, ActionError> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state.audit.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditAction;
    use serde_json::json;

    fn practice_data(slug: &str) -> CreatePractice {
        CreatePractice {
            name: "Acme".to_owned(),
            slug: slug.to_owned(),
            billing_email: None,
            currency: "GBP".to_owned(),
            timezone: "Europe/London".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let store = MockTenantStore::new();
        PracticeRepository::create(&store, practice_data("acme"))
            .await
            .unwrap();
        let err = PracticeRepository::create(&store, practice_data("acme"))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Database(_)));
    }

    #[tokio::test]
    async fn test_membership_conflict_ignored() {
        let store = MockTenantStore::new();
        let practice = store.seed_practice(practice_data("acme")).await;
        let user_id = Uuid::new_v4();

        let data = CreateMembership {
            practice_id: practice.id,
            user_id,
            role: MemberRole::Owner,
            invited_by: None,
        };
        store.create_ignore_conflict(data.clone()).await.unwrap();
        store
            .create_ignore_conflict(CreateMembership {
                role: MemberRole::Viewer,
                ..data
            })
            .await
            .unwrap();

        let members = store.members_of(practice.id);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, MemberRole::Owner);
    }

    #[tokio::test]
    async fn test_ensure_default_practice_does_not_overwrite() {
        let store = MockTenantStore::new();
        let user_id = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        store.set_default_practice(user_id, first).await.unwrap();
        store.ensure_default_practice(user_id, second).await.unwrap();

        let profile = store.profile_of(user_id).unwrap();
        assert_eq!(profile.default_practice_id, Some(first));
    }

    #[tokio::test]
    async fn test_purge_revokes_pending_and_nulls_resolved() {
        let store = MockTenantStore::new();
        let practice = store.seed_practice(practice_data("acme")).await;
        let user_id = Uuid::new_v4();

        // one pending invite naming the user, one already accepted
        InviteRepository::create(
            &store,
            CreateInvite {
                practice_id: practice.id,
                email: "pending@example.com".to_owned(),
                role: MemberRole::Member,
                invited_by: None,
                resolved_user_id: Some(user_id),
                token: "t1".to_owned(),
                accepted_at: None,
            },
        )
        .await
        .unwrap();
        InviteRepository::create(
            &store,
            CreateInvite {
                practice_id: practice.id,
                email: "accepted@example.com".to_owned(),
                role: MemberRole::Member,
                invited_by: None,
                resolved_user_id: Some(user_id),
                token: "t2".to_owned(),
                accepted_at: Some(Utc::now()),
            },
        )
        .await
        .unwrap();

        store.set_default_practice(user_id, practice.id).await.unwrap();
        store.purge_user(user_id, Utc::now()).await.unwrap();

        let invites = store.invites_of(practice.id);
        let pending = invites.iter().find(|i| i.email == "pending@example.com").unwrap();
        assert!(pending.is_revoked());
        assert_eq!(pending.resolved_user_id, None);

        let accepted = invites.iter().find(|i| i.email == "accepted@example.com").unwrap();
        assert!(accepted.is_accepted());
        assert!(!accepted.is_revoked());
        assert_eq!(accepted.resolved_user_id, None);

        assert!(store.profile_of(user_id).is_none());
    }

    #[tokio::test]
    async fn test_audit_recent_newest_first() {
        let store = MockTenantStore::new();
        for action in [AuditAction::Ban, AuditAction::Unban] {
            store
                .append(NewAuditEntry {
                    action,
                    actor_user_id: None,
                    target_user_id: None,
                    metadata: json!({}),
                })
                .await
                .unwrap();
        }

        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, AuditAction::Unban);
        assert_eq!(recent[1].action, AuditAction::Ban);
    }
}
