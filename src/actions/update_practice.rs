use uuid::Uuid;

use crate::actor::Actor;
use crate::policy::{can_manage_practice, DENY_MANAGE_PRACTICE};
use crate::store::{MembershipRepository, PracticeFields, PracticeRepository};
use crate::types::Practice;
use crate::validators::{sanitize, validate_practice_name};
use crate::ActionError;
use crate::actions::CreatePracticeInput;

/// Updates a practice's profile fields. Owners and admins only.
///
/// Input goes through the same sanitation as creation.
pub struct UpdatePracticeAction<P, M>
where
    P: PracticeRepository,
    M: MembershipRepository,
{
    practices: P,
    members: M,
}

impl<P, M> UpdatePracticeAction<P, M>
where
    P: PracticeRepository,
    M: MembershipRepository,
{
    pub fn new(practices: P, members: M) -> Self {
        Self { practices, members }
    }

    /// # Errors
    ///
    /// - `ActionError::Forbidden`: actor is not an owner or admin of the
    ///   practice (or not a member at all)
    /// - `ActionError::Validation`: empty name after trimming
    /// - `ActionError::NotFound`: practice row is gone
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "update_practice", skip_all, err)
    )]
    pub async fn execute(
        &self,
        actor: &Actor,
        practice_id: Uuid,
        input: CreatePracticeInput,
    ) -> Result<Practice, ActionError> {
        let membership = self
            .members
            .find_by_practice_and_user(practice_id, actor.id)
            .await?;
        if !can_manage_practice(membership.map(|m| m.role)) {
            return Err(ActionError::Forbidden(DENY_MANAGE_PRACTICE.to_owned()));
        }

        let name = validate_practice_name(&input.name)?;
        let billing_email = sanitize(Some(&input.billing_email), 255, false);
        let currency = sanitize(Some(&input.currency), 10, true).to_uppercase();
        let timezone = sanitize(Some(&input.timezone), 100, false);

        let practice = self
            .practices
            .update(
                practice_id,
                PracticeFields {
                    name,
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
                },
            )
            .await?;

        log::info!(
            target: "archibill",
            "msg=\"practice updated\", practice_id={}, actor_id={}",
            practice.id,
            actor.id
        );

        Ok(practice)
    }
}
