use serde_json::json;
use uuid::Uuid;

use crate::actor::Actor;
use crate::audit::{AuditAction, AuditLogRepository, NewAuditEntry};
use crate::provider::IdentityProvider;
use crate::ActionError;

const DENY_BANNED_RESET: &str = "Cannot send password reset for banned users";

/// Where the provider's reset email sends the user to choose a new password.
#[derive(Debug, Clone)]
pub struct SendPasswordResetConfig {
    pub redirect_to: String,
}

impl Default for SendPasswordResetConfig {
    fn default() -> Self {
        Self {
            redirect_to: "http://localhost:3000/auth/update-password".to_owned(),
        }
    }
}

/// Sends a password-reset email on a user's behalf.
///
/// When the caller knows the target's id, the user's ban state is checked
/// first and a banned user is refused before the provider is contacted.
/// Email-only requests skip that check since there is no id to look up.
pub struct SendPasswordResetAction<I, A>
where
    I: IdentityProvider,
    A: AuditLogRepository,
{
    provider: I,
    audit: A,
    config: SendPasswordResetConfig,
}

impl<I, A> SendPasswordResetAction<I, A>
where
    I: IdentityProvider,
    A: AuditLogRepository,
{
    pub fn new(provider: I, audit: A) -> Self {
        Self {
            provider,
            audit,
            config: SendPasswordResetConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SendPasswordResetConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the user-facing confirmation message.
    ///
    /// # Errors
    ///
    /// - `ActionError::Validation`: empty email
    /// - `ActionError::NotFound`: `target_user_id` given but unknown to the
    ///   provider
    /// - `ActionError::Conflict`: target is currently banned
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "send_password_reset", skip_all, err)
    )]
    pub async fn execute(
        &self,
        actor: &Actor,
        target_user_id: Option<Uuid>,
        email: &str,
    ) -> Result<String, ActionError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(ActionError::Validation("Missing email".to_owned()));
        }

        if let Some(target_id) = target_user_id {
            let user = self
                .provider
                .get_user_by_id(target_id)
                .await?
                .ok_or_else(|| ActionError::NotFound("Unable to load user".to_owned()))?;
            if user.is_banned() {
                return Err(ActionError::Conflict(DENY_BANNED_RESET.to_owned()));
            }
        }

        self.provider
            .reset_password_for_email(&email, &self.config.redirect_to)
            .await?;

        self.audit
            .append(NewAuditEntry {
                action: AuditAction::PasswordResetRequested,
                actor_user_id: Some(actor.id),
                target_user_id,
                metadata: json!({
                    "actor_email": actor.email,
                    "target_email": email,
                }),
            })
            .await?;

        log::info!(
            target: "archibill",
            "msg=\"password reset sent\", email=\"{}\"",
            email
        );

        Ok(format!("Password reset sent to {email}"))
    }
}
