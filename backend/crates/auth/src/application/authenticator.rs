//! Request Authenticator
//!
//! The single gate for protected operations: pulls the bearer credential
//! out of an `Authorization` value, verifies it, and optionally resolves
//! the user it names.

use std::sync::Arc;

use kernel::id::UserId;
use platform::token::{Identity, TokenError, TokenService};

use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::error::{AuthError, AuthResult};

const BEARER_PREFIX: &str = "Bearer ";

/// Strip an optional `Bearer ` prefix. Blank values yield `None`.
pub fn extract_bearer_token(authorization: Option<&str>) -> Option<&str> {
    let value = authorization?;
    let token = value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

pub struct Authenticator<R> {
    tokens: Arc<TokenService>,
    users: Arc<R>,
}

impl<R> Clone for Authenticator<R> {
    fn clone(&self) -> Self {
        Self {
            tokens: Arc::clone(&self.tokens),
            users: Arc::clone(&self.users),
        }
    }
}

impl<R> Authenticator<R>
where
    R: UserRepository + Send + Sync + 'static,
{
    pub fn new(tokens: Arc<TokenService>, users: Arc<R>) -> Self {
        Self { tokens, users }
    }

    /// Verify the credential and return the identity it carries.
    pub fn authenticate(&self, authorization: Option<&str>) -> AuthResult<Identity> {
        let token = extract_bearer_token(authorization).ok_or(AuthError::MissingCredential)?;

        match self.tokens.verify(token) {
            Ok(claims) => Ok(claims.identity),
            Err(TokenError::Encoding(e)) => Err(AuthError::Internal(e)),
            Err(e) => {
                tracing::debug!(reason = %e, "Token verification failed");
                Err(AuthError::InvalidOrExpiredCredential)
            }
        }
    }

    /// Authenticate and return only the user id.
    pub fn authenticate_user_id(&self, authorization: Option<&str>) -> AuthResult<UserId> {
        let identity = self.authenticate(authorization)?;
        identity
            .user_id
            .parse()
            .map_err(|_| AuthError::InvalidOrExpiredCredential)
    }

    /// Authenticate and load the user. A deleted account is `PrincipalNotFound`.
    pub async fn authenticate_principal(&self, authorization: Option<&str>) -> AuthResult<User> {
        let user_id = self.authenticate_user_id(authorization)?;
        self.users
            .find_by_id(&user_id)
            .await?
            .ok_or(AuthError::PrincipalNotFound)
    }

    /// Best-effort principal lookup: any failure is `None`.
    pub async fn authenticate_optional(&self, authorization: Option<&str>) -> Option<User> {
        match self.authenticate_principal(authorization).await {
            Ok(user) => Some(user),
            Err(AuthError::Database(e)) => {
                tracing::warn!(error = %e, "Optional authentication lookup failed");
                None
            }
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::{age::Age, display_name::DisplayName, email::Email};
    use crate::infra::memory::InMemoryUserRepository;
    use platform::clock::ManualClock;
    use platform::password::HashedPassword;
    use platform::token::{DEFAULT_TOKEN_LIFETIME, SessionSecret};
    use std::time::Duration;

    const HASH: &str = "$argon2id$v=19$m=64,t=1,p=1$c29tZXNhbHQ$ZmFrZWhhc2hmYWtlaGFzaA";

    fn user() -> User {
        User::new(
            Email::new("katie@example.com").unwrap(),
            HashedPassword::from_phc_string(HASH).unwrap(),
            DisplayName::new("Katie").unwrap(),
            Age::new(11).unwrap(),
        )
    }

    async fn setup() -> (Authenticator<InMemoryUserRepository>, ManualClock, User) {
        let clock = ManualClock::new(1_700_000_000_000);
        let tokens = TokenService::new(SessionSecret::random()).with_clock(Arc::new(clock.clone()));
        let users = InMemoryUserRepository::new();
        let user = user();
        users.create(&user).await.unwrap();
        (
            Authenticator::new(Arc::new(tokens), Arc::new(users)),
            clock,
            user,
        )
    }

    fn bearer(authenticator: &Authenticator<InMemoryUserRepository>, user: &User) -> String {
        format!("Bearer {}", authenticator.tokens.issue(&user.identity()).unwrap())
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(extract_bearer_token(Some("abc")), Some("abc"));
        assert_eq!(extract_bearer_token(Some("Bearer ")), None);
        assert_eq!(extract_bearer_token(Some("")), None);
        assert_eq!(extract_bearer_token(None), None);
    }

    #[tokio::test]
    async fn test_missing_header() {
        let (authenticator, _, _) = setup().await;
        assert!(matches!(
            authenticator.authenticate(None),
            Err(AuthError::MissingCredential)
        ));
        assert!(matches!(
            authenticator.authenticate(Some("Bearer ")),
            Err(AuthError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn test_malformed_token() {
        let (authenticator, _, _) = setup().await;
        assert!(matches!(
            authenticator.authenticate(Some("Bearer not.a.token")),
            Err(AuthError::InvalidOrExpiredCredential)
        ));
    }

    #[tokio::test]
    async fn test_valid_token_returns_identity_unchanged() {
        let (authenticator, _, user) = setup().await;
        let identity = authenticator.authenticate(Some(&bearer(&authenticator, &user))).unwrap();
        assert_eq!(identity, user.identity());
    }

    #[tokio::test]
    async fn test_bare_token_is_accepted() {
        let (authenticator, _, user) = setup().await;
        let token = authenticator.tokens.issue(&user.identity()).unwrap();
        assert!(authenticator.authenticate(Some(&token)).is_ok());
    }

    #[tokio::test]
    async fn test_expired_token() {
        let (authenticator, clock, user) = setup().await;
        let header = bearer(&authenticator, &user);
        clock.advance(DEFAULT_TOKEN_LIFETIME + Duration::from_secs(1));

        assert!(matches!(
            authenticator.authenticate(Some(&header)),
            Err(AuthError::InvalidOrExpiredCredential)
        ));
    }

    #[tokio::test]
    async fn test_principal_lookup() {
        let (authenticator, _, user) = setup().await;
        let header = bearer(&authenticator, &user);

        let principal = authenticator.authenticate_principal(Some(&header)).await.unwrap();
        assert_eq!(principal.id, user.id);

        authenticator.users.remove(&user.id).await;
        assert!(matches!(
            authenticator.authenticate_principal(Some(&header)).await,
            Err(AuthError::PrincipalNotFound)
        ));
    }

    #[tokio::test]
    async fn test_optional_swallows_failures() {
        let (authenticator, _, user) = setup().await;
        assert!(authenticator.authenticate_optional(None).await.is_none());
        assert!(authenticator.authenticate_optional(Some("garbage")).await.is_none());

        let header = bearer(&authenticator, &user);
        assert!(authenticator.authenticate_optional(Some(&header)).await.is_some());
    }
}
