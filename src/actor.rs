//! The identity performing a workflow call.

use uuid::Uuid;

use crate::ActionError;

/// The authenticated identity invoking a workflow.
///
/// Workflows take an `Actor` explicitly rather than reading ambient session
/// state, so callers resolve the session once at the edge and tests can
/// construct actors directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Identity-provider user id.
    pub id: Uuid,
    /// Email at the time of the call, when the session exposes one.
    pub email: Option<String>,
}

impl Actor {
    pub fn new(id: Uuid, email: Option<String>) -> Self {
        Self { id, email }
    }

    /// Builds an actor from whatever the session layer could resolve.
    ///
    /// Returns `ActionError::NotAuthenticated` when there is no user id,
    /// which callers surface as the generic "Not authenticated" message.
    pub fn resolve(id: Option<Uuid>, email: Option<String>) -> Result<Self, ActionError> {
        match id {
            Some(id) => Ok(Self { id, email }),
            None => Err(ActionError::NotAuthenticated),
        }
    }
}
