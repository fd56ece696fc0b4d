//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the infra layer.

use kernel::id::UserId;

use crate::domain::entity::user::User;
use crate::domain::value_object::email::Email;
use crate::error::AuthResult;

#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Insert a new user. Fails with `EmailTaken` on a duplicate email.
    async fn create(&self, user: &User) -> AuthResult<()>;

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>>;

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool>;

    /// Persist name, selected voice and password hash.
    async fn update(&self, user: &User) -> AuthResult<()>;

    /// Atomically add `points` to the user's running total.
    async fn add_points(&self, user_id: &UserId, points: i64) -> AuthResult<()>;
}
