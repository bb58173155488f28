//! Structured results returned to the UI layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ActionError;

/// Outcome discriminator. Callers branch only on this and display `message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Error,
}

/// The shape every workflow reports back to its caller.
///
/// `token` is a fresh opaque value per response; UIs use it to de-duplicate
/// toast notifications for otherwise identical messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub status: ActionStatus,
    pub message: String,
    pub token: String,
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Success,
            message: message.into(),
            token: Uuid::new_v4().to_string(),
        }
    }

    pub fn failure(err: &ActionError) -> Self {
        Self {
            status: ActionStatus::Error,
            message: err.to_string(),
            token: Uuid::new_v4().to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }
}

/// Converts a workflow outcome into the non-throwing boundary shape.
///
/// Success values carry their own human-readable message.
pub fn respond(result: Result<String, ActionError>) -> ActionResult {
    match result {
        Ok(message) => ActionResult::success(message),
        Err(err) => ActionResult::failure(&err),
    }
}
