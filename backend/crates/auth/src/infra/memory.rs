//! In-memory user repository
//!
//! Backs use-case and handler tests; not used by the server.

use std::collections::HashMap;

use kernel::id::UserId;
use tokio::sync::RwLock;

use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Remove a user, simulating an account deleted after token issuance
    pub async fn remove(&self, user_id: &UserId) -> Option<User> {
        self.users.write().await.remove(user_id)
    }
}

impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: &User) -> AuthResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(AuthError::EmailTaken);
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        Ok(self.users.read().await.values().any(|u| &u.email == email))
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        if let Some(stored) = self.users.write().await.get_mut(&user.id) {
            stored.name = user.name.clone();
            stored.selected_voice = user.selected_voice.clone();
            stored.password_hash = user.password_hash.clone();
            stored.updated_at = user.updated_at;
        }
        Ok(())
    }

    async fn add_points(&self, user_id: &UserId, points: i64) -> AuthResult<()> {
        if let Some(stored) = self.users.write().await.get_mut(user_id) {
            stored.total_points += points;
        }
        Ok(())
    }
}
