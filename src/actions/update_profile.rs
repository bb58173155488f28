use crate::actor::Actor;
use crate::store::ProfileRepository;
use crate::validators::sanitize;
use crate::ActionError;

const FULL_NAME_MAX: usize = 200;
const PHONE_MAX: usize = 50;

/// Saves the actor's own account-settings fields.
///
/// Both fields are optional; blank input clears the stored value.
pub struct UpdateProfileAction<F>
where
    F: ProfileRepository,
{
    profiles: F,
}

impl<F> UpdateProfileAction<F>
where
    F: ProfileRepository,
{
    pub fn new(profiles: F) -> Self {
        Self { profiles }
    }

    /// Returns the user-facing confirmation message.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "update_profile", skip_all, err)
    )]
    pub async fn execute(
        &self,
        actor: &Actor,
        full_name: &str,
        phone: &str,
    ) -> Result<String, ActionError> {
        let full_name = sanitize(Some(full_name), FULL_NAME_MAX, false);
        let phone = sanitize(Some(phone), PHONE_MAX, false);

        self.profiles
            .upsert_contact(
                actor.id,
                (!full_name.is_empty()).then_some(full_name.as_str()),
                (!phone.is_empty()).then_some(phone.as_str()),
            )
            .await?;

        log::info!(
            target: "archibill",
            "msg=\"profile updated\", user_id={}",
            actor.id
        );

        Ok("Account details updated".to_owned())
    }
}
