use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::{IdentityProvider, IdentityUser};
use crate::ActionError;

#[derive(Default)]
struct ProviderState {
    users: HashMap<Uuid, IdentityUser>,
    insertion_order: Vec<Uuid>,
    invites_sent: Vec<String>,
    resets_sent: Vec<String>,
    fail_with: Option<String>,
}

/// In-memory identity provider for tests.
///
/// Clones share state. `set_failure` makes every subsequent call return a
/// `Provider` error, for exercising abort-before-store-mutation paths.
#[derive(Clone, Default)]
pub struct MockIdentityProvider {
    state: Arc<RwLock<ProviderState>>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user and returns its id.
    pub fn add_user(
        &self,
        email: &str,
        confirmed: bool,
        banned_until: Option<DateTime<Utc>>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let user = IdentityUser {
            id,
            email: Some(email.to_owned()),
            confirmed_at: confirmed.then(Utc::now),
            banned_until,
        };
        let mut state = self.state.write().expect("lock poisoned");
        state.users.insert(id, user);
        state.insertion_order.push(id);
        id
    }

    /// Makes every subsequent provider call fail with the given message.
    pub fn set_failure(&self, message: &str) {
        self.state.write().expect("lock poisoned").fail_with = Some(message.to_owned());
    }

    pub fn clear_failure(&self) {
        self.state.write().expect("lock poisoned").fail_with = None;
    }

    pub fn user_count(&self) -> usize {
        self.state.read().expect("lock poisoned").users.len()
    }

    pub fn invites_sent(&self) -> Vec<String> {
        self.state.read().expect("lock poisoned").invites_sent.clone()
    }

    pub fn resets_sent(&self) -> Vec<String> {
        self.state.read().expect("lock poisoned").resets_sent.clone()
    }

    fn check_failure(&self) -> Result<(), ActionError> {
        let state = self.state.read().map_err(lock_poisoned)?;
        match &state.fail_with {
            Some(msg) => Err(ActionError::Provider(msg.clone())),
            None => Ok(()),
        }
    }
}

fn lock_poisoned<T>(_: T) -> ActionError {
    ActionError::Provider("lock poisoned".to_owned())
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<IdentityUser>, ActionError> {
        self.check_failure()?;
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state.users.get(&id).cloned())
    }

    async fn list_users(&self, page: u32, per_page: u32) -> Result<Vec<IdentityUser>, ActionError> {
        self.check_failure()?;
        let state = self.state.read().map_err(lock_poisoned)?;
        let start = ((page.max(1) - 1) * per_page) as usize;
        Ok(state
            .insertion_order
            .iter()
            .skip(start)
            .take(per_page as usize)
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }

    async fn set_ban_duration(
        &self,
        id: Uuid,
        duration: Option<Duration>,
    ) -> Result<IdentityUser, ActionError> {
        self.check_failure()?;
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| ActionError::NotFound("User not found".to_owned()))?;
        user.banned_until = duration.map(|d| Utc::now() + d);
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), ActionError> {
        self.check_failure()?;
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if state.users.remove(&id).is_none() {
            return Err(ActionError::NotFound("User not found".to_owned()));
        }
        state.insertion_order.retain(|existing| *existing != id);
        Ok(())
    }

    async fn invite_by_email(
        &self,
        email: &str,
        _redirect_to: &str,
    ) -> Result<IdentityUser, ActionError> {
        self.check_failure()?;
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let exists = state
            .users
            .values()
            .any(|u| u.email_matches(email));
        if exists {
            return Err(ActionError::AlreadyRegistered);
        }

        let id = Uuid::new_v4();
        let user = IdentityUser {
            id,
            email: Some(email.to_owned()),
            confirmed_at: None,
            banned_until: None,
        };
        state.users.insert(id, user.clone());
        state.insertion_order.push(id);
        state.invites_sent.push(email.to_owned());
        Ok(user)
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        _redirect_to: &str,
    ) -> Result<(), ActionError> {
        self.check_failure()?;
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state.resets_sent.push(email.to_owned());
        Ok(())
    }
}
