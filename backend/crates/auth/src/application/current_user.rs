//! Current User Use Case
//!
//! Resolves the caller's account from their session token.

use crate::application::authenticator::Authenticator;
use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::error::AuthResult;

pub struct CurrentUserUseCase<'a, U> {
    authenticator: &'a Authenticator<U>,
}

impl<'a, U> CurrentUserUseCase<'a, U>
where
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(authenticator: &'a Authenticator<U>) -> Self {
        Self { authenticator }
    }

    pub async fn execute(&self, authorization: Option<&str>) -> AuthResult<User> {
        self.authenticator.authenticate_principal(authorization).await
    }
}
