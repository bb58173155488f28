use crate::actor::Actor;
use crate::policy::MemberRole;
use crate::slug::generate_unique_slug;
use crate::store::{
    CreateMembership, CreatePractice, MembershipRepository, PracticeRepository, ProfileRepository,
};
use crate::types::Practice;
use crate::validators::{sanitize, validate_practice_name};
use crate::ActionError;

/// Raw form input; the action sanitizes and defaults every field.
#[derive(Debug, Clone)]
pub struct CreatePracticeInput {
    pub name: String,
    pub billing_email: String,
    pub currency: String,
    pub timezone: String,
}

/// Creates a practice with the actor as its first owner.
///
/// Writes in dependency order (practice row, owner membership, profile
/// default) so a partial failure never leaves a membership pointing at a
/// nonexistent practice.
pub struct CreatePracticeAction<P, M, F>
where
    P: PracticeRepository,
    M: MembershipRepository,
    F: ProfileRepository,
{
    practices: P,
    members: M,
    profiles: F,
}

impl<P, M, F> CreatePracticeAction<P, M, F>
where
    P: PracticeRepository,
    M: MembershipRepository,
    F: ProfileRepository,
{
    pub fn new(practices: P, members: M, profiles: F) -> Self {
        Self {
            practices,
            members,
            profiles,
        }
    }

    /// Creates the practice and returns the new row.
    ///
    /// # Errors
    ///
    /// - `ActionError::Validation`: empty name after trimming
    /// - `ActionError::Database`: store failure
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "create_practice", skip_all, err)
    )]
    pub async fn execute(
        &self,
        actor: &Actor,
        input: CreatePracticeInput,
    ) -> Result<Practice, ActionError> {
        let name = validate_practice_name(&input.name)?;
        let billing_email = sanitize(Some(&input.billing_email), 255, false);
        let currency = sanitize(Some(&input.currency), 10, true).to_uppercase();
        let timezone = sanitize(Some(&input.timezone), 100, false);

        let slug = generate_unique_slug(&self.practices, &name).await?;

        let practice = self
            .practices
            .create(CreatePractice {
                name,
                slug,
                billing_email: (!billing_email.is_empty()).then_some(billing_email),
                currency: if currency.is_empty() {
                    "GBP".to_owned()
                } else {
                    currency
                },
                timezone: if timezone.is_empty() {
                    "Europe/London".to_owned()
                } else {
                    timezone
                },
            })
            .await?;

        self.members
            .create_ignore_conflict(CreateMembership {
                practice_id: practice.id,
                user_id: actor.id,
                role: MemberRole::Owner,
                invited_by: None,
            })
            .await?;

        self.profiles
            .set_default_practice(actor.id, practice.id)
            .await?;

        log::info!(
            target: "archibill",
            "msg=\"practice created\", practice_id={}, slug=\"{}\", owner_id={}",
            practice.id,
            practice.slug,
            actor.id
        );

        Ok(practice)
    }
}

#[cfg(all(test, feature = "mocks"))]
mod tests {
    use super::*;
    use crate::store::MockTenantStore;
    use uuid::Uuid;

    fn actor() -> Actor {
        Actor::new(Uuid::new_v4(), Some("carol@example.com".to_owned()))
    }

    fn input(name: &str) -> CreatePracticeInput {
        CreatePracticeInput {
            name: name.to_owned(),
            billing_email: String::new(),
            currency: String::new(),
            timezone: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_practice_defaults() {
        let store = MockTenantStore::new();
        let action = CreatePracticeAction::new(store.clone(), store.clone(), store.clone());
        let carol = actor();

        let practice = action.execute(&carol, input("  Acme  ")).await.unwrap();
        assert_eq!(practice.name, "Acme");
        assert_eq!(practice.slug, "acme");
        assert_eq!(practice.currency, "GBP");
        assert_eq!(practice.timezone, "Europe/London");
        assert_eq!(practice.billing_email, None);

        let members = store.members_of(practice.id);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, carol.id);
        assert_eq!(members[0].role, MemberRole::Owner);

        let profile = store.profile_of(carol.id).unwrap();
        assert_eq!(profile.default_practice_id, Some(practice.id));
    }

    #[tokio::test]
    async fn test_create_practice_empty_name_rejected() {
        let store = MockTenantStore::new();
        let action = CreatePracticeAction::new(store.clone(), store.clone(), store);
        let err = action.execute(&actor(), input("   ")).await.unwrap_err();
        assert_eq!(
            err,
            ActionError::Validation("Practice name is required".to_owned())
        );
    }

    #[tokio::test]
    async fn test_create_practice_normalizes_currency() {
        let store = MockTenantStore::new();
        let action = CreatePracticeAction::new(store.clone(), store.clone(), store);
        let practice = action
            .execute(
                &actor(),
                CreatePracticeInput {
                    name: "Acme".to_owned(),
                    billing_email: " billing@acme.co ".to_owned(),
                    currency: " usd ".to_owned(),
                    timezone: "America/New_York".to_owned(),
                },
            )
            .await
            .unwrap();
        assert_eq!(practice.currency, "USD");
        assert_eq!(practice.billing_email.as_deref(), Some("billing@acme.co"));
        assert_eq!(practice.timezone, "America/New_York");
    }

    #[tokio::test]
    async fn test_duplicate_names_get_distinct_slugs() {
        let store = MockTenantStore::new();
        let action = CreatePracticeAction::new(store.clone(), store.clone(), store.clone());

        let carol = actor();
        let dave = actor();
        let first = action.execute(&carol, input("Acme")).await.unwrap();
        let second = action.execute(&dave, input("Acme")).await.unwrap();

        assert_eq!(first.slug, "acme");
        assert_ne!(second.slug, first.slug);
        assert!(second.slug.starts_with("acme-"));

        // each practice has exactly one owner: its creator
        let first_members = store.members_of(first.id);
        let second_members = store.members_of(second.id);
        assert_eq!(first_members.len(), 1);
        assert_eq!(second_members.len(), 1);
        assert_eq!(first_members[0].user_id, carol.id);
        assert_eq!(second_members[0].user_id, dave.id);
    }
}
