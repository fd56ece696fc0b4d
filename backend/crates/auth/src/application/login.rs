//! Login Use Case
//!
//! Checks email and password, then issues a session token.

use std::sync::Arc;

use platform::password::{ClearTextPassword, PasswordCodec};
use platform::token::TokenService;

use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

pub struct LoginInput {
    pub email: String,
    pub password: String,
}

pub struct LoginOutput {
    pub token: String,
    pub user: User,
}

pub struct LoginUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    passwords: Arc<PasswordCodec>,
    tokens: Arc<TokenService>,
}

impl<U> LoginUseCase<U>
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

    pub async fn execute(&self, input: LoginInput) -> AuthResult<LoginOutput> {
        let email = Email::new(&input.email)?;

        let password = ClearTextPassword::for_verification(input.password);

        // Unknown email pays for a verification too, so both failures cost the same.
        let Some(mut user) = self.user_repo.find_by_email(&email).await? else {
            let passwords = Arc::clone(&self.passwords);
            tokio::task::spawn_blocking(move || passwords.verify_decoy(&password)).await?;
            return Err(AuthError::InvalidCredentials);
        };

        let passwords = Arc::clone(&self.passwords);
        let digest = user.password_hash.clone();
        let (valid, password) = tokio::task::spawn_blocking(move || {
            let valid = passwords.verify(&password, digest.as_phc_string());
            (valid, password)
        })
        .await?;

        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        if self.passwords.needs_rehash(&user.password_hash) {
            self.upgrade_hash(&mut user, password).await;
        }

        let token = self
            .tokens
            .issue(&user.identity())
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginOutput { token, user })
    }

    /// Re-hash with the current cost. Failure is logged; login still succeeds.
    async fn upgrade_hash(&self, user: &mut User, password: ClearTextPassword) {
        let passwords = Arc::clone(&self.passwords);
        let rehashed = tokio::task::spawn_blocking(move || passwords.hash(&password)).await;

        match rehashed {
            Ok(Ok(hash)) => {
                user.set_password_hash(hash);
                match self.user_repo.update(user).await {
                    Ok(()) => tracing::info!(user_id = %user.id, "Password hash upgraded"),
                    Err(e) => tracing::warn!(user_id = %user.id, error = %e, "Password hash upgrade failed"),
                }
            }
            Ok(Err(e)) => tracing::warn!(user_id = %user.id, error = %e, "Password rehash failed"),
            Err(e) => tracing::warn!(user_id = %user.id, error = %e, "Password rehash task failed"),
        }
    }
}
