//! Register Use Case
//!
//! Creates a learner account and signs it in.

use std::sync::Arc;

use platform::password::{ClearTextPassword, PasswordCodec};
use platform::token::TokenService;

use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{age::Age, display_name::DisplayName, email::Email};
use crate::error::{AuthError, AuthResult};

pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub name: String,
    pub age: i64,
}

pub struct RegisterOutput {
    pub token: String,
    pub user: User,
}

pub struct RegisterUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    passwords: Arc<PasswordCodec>,
    tokens: Arc<TokenService>,
}

impl<U> RegisterUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, passwords: Arc<PasswordCodec>, tokens: Arc<TokenService>) -> Self {
        Self {
            user_repo,
            passwords,
            tokens,
        }
    }

    pub async fn execute(&self, input: RegisterInput) -> AuthResult<RegisterOutput> {
        let email = Email::new(&input.email)?;
        let password = ClearTextPassword::new(input.password)
            .map_err(|e| AuthError::Validation(e.to_string()))?;
        let name = DisplayName::new(&input.name)?;
        let age = Age::new(input.age)?;

        if self.user_repo.exists_by_email(&email).await? {
            return Err(AuthError::EmailTaken);
        }

        // Argon2 is CPU-bound; keep it off the async workers.
        let passwords = Arc::clone(&self.passwords);
        let password_hash =
            tokio::task::spawn_blocking(move || passwords.hash(&password)).await??;

        let user = User::new(email, password_hash, name, age);
        // Unique index still guards against a concurrent registration.
        self.user_repo.create(&user).await?;

        let token = self
            .tokens
            .issue(&user.identity())
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        tracing::info!(user_id = %user.id, "User registered");

        Ok(RegisterOutput { token, user })
    }
}
