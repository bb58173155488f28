//! Membership invariant engine: every practice that has had an owner keeps
//! at least one.
//!
//! Checks run as read-then-write against a live owner count, not
//! compare-and-swap; two concurrent demotions of two different "last owners"
//! can both pass their reads before either write lands. That narrow window
//! is accepted here; deployments needing more take a row-level lock or a
//! serializable transaction over the practice's membership rows.
//!
//! Both role-change entry points (practice settings and the admin dashboard)
//! go through this module, so the decision is identical for identical
//! inputs. The user deletion workflow applies the same owner-count rule
//! itself, once per practice the target owns, since its refusal must name
//! every affected practice in one message.

use uuid::Uuid;

use crate::policy::MemberRole;
use crate::store::MembershipRepository;
use crate::ActionError;

/// Denial when a sole owner tries to demote themselves.
pub const DENY_SELF_DEMOTION: &str = "You must have at least one owner";

/// Denial when demoting someone else would leave the practice ownerless.
pub const DENY_LAST_OWNER: &str = "A practice must have at least one owner";

/// Rejects a role change that would reduce a practice's owner count to zero.
///
/// Only demotions of a current owner consult the store; every other
/// transition passes unconditionally. `target_is_actor` selects the
/// self-demotion message over the practice-level one: same error kind,
/// different user-facing text.
pub async fn assert_owner_retained<M>(
    members: &M,
    practice_id: Uuid,
    current_role: MemberRole,
    requested_role: MemberRole,
    target_is_actor: bool,
) -> Result<(), ActionError>
where
    M: MembershipRepository + ?Sized,
{
    if current_role != MemberRole::Owner || requested_role == MemberRole::Owner {
        return Ok(());
    }

    let owner_count = members.count_owners(practice_id).await?;
    if owner_count <= 1 {
        let message = if target_is_actor {
            DENY_SELF_DEMOTION
        } else {
            DENY_LAST_OWNER
        };
        return Err(ActionError::OwnerInvariant(message.to_owned()));
    }

    Ok(())
}
