use chrono::Duration;
use serde_json::json;
use uuid::Uuid;

use crate::actor::Actor;
use crate::audit::{AuditAction, AuditLogRepository, NewAuditEntry};
use crate::provider::{IdentityProvider, BAN_DURATION_HOURS};
use crate::ActionError;

/// Whether the action imposes or lifts the ban horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanMode {
    Ban,
    Unban,
}

/// Bans or unbans a user at the identity provider.
///
/// A ban only blocks sign-in; the user's memberships are left untouched, so
/// a banned sole owner still satisfies the owner count and the practice is
/// effectively frozen until an administrator intervenes.
pub struct BanUserAction<I, A>
where
    I: IdentityProvider,
    A: AuditLogRepository,
{
    provider: I,
    audit: A,
}

impl<I, A> BanUserAction<I, A>
where
    I: IdentityProvider,
    A: AuditLogRepository,
{
    pub fn new(provider: I, audit: A) -> Self {
        Self { provider, audit }
    }

    /// Returns the user-facing confirmation message.
    ///
    /// # Errors
    ///
    /// - `ActionError::NotFound`: provider has no such user
    /// - `ActionError::Provider`: the ban update failed upstream
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "ban_user", skip_all, err)
    )]
    pub async fn execute(
        &self,
        actor: &Actor,
        target_user_id: Uuid,
        mode: BanMode,
    ) -> Result<String, ActionError> {
        let duration = match mode {
            BanMode::Ban => Some(Duration::hours(BAN_DURATION_HOURS)),
            BanMode::Unban => None,
        };

        let updated = self
            .provider
            .set_ban_duration(target_user_id, duration)
            .await?;
        let target_email = updated.email.clone().unwrap_or_default();

        self.audit
            .append(NewAuditEntry {
                action: match mode {
                    BanMode::Ban => AuditAction::Ban,
                    BanMode::Unban => AuditAction::Unban,
                },
                actor_user_id: Some(actor.id),
                target_user_id: Some(target_user_id),
                metadata: json!({
                    "actor_email": actor.email,
                    "target_email": updated.email,
                    "banned_until": updated.banned_until,
                }),
            })
            .await?;

        log::info!(
            target: "archibill",
            "msg=\"ban state updated\", target_id={}, banned={}",
            target_user_id,
            updated.banned_until.is_some()
        );

        Ok(match updated.banned_until {
            Some(until) => format!("Banned {target_email} (until {until})"),
            None => format!("Unbanned {target_email}"),
        })
    }
}
