//! Application Configuration

use std::fmt;
use std::time::Duration;

use platform::password::{PasswordCodec, PasswordCost, PasswordHashError};
use platform::token::{DEFAULT_TOKEN_LIFETIME, SessionSecret, TokenService};

/// Auth application configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC key for session tokens
    pub session_secret: SessionSecret,
    pub token_lifetime: Duration,
    pub password_cost: PasswordCost,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_lifetime", &self.token_lifetime)
            .field("password_cost", &self.password_cost)
            .field("password_pepper", &self.password_pepper.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl AuthConfig {
    pub fn new(session_secret: SessionSecret) -> Self {
        Self {
            session_secret,
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            password_cost: PasswordCost::default(),
            password_pepper: None,
        }
    }

    /// Config with a random session secret (for development and tests)
    pub fn with_random_secret() -> Self {
        Self::new(SessionSecret::random())
    }

    pub fn token_service(&self) -> TokenService {
        TokenService::new(self.session_secret.clone()).with_lifetime(self.token_lifetime)
    }

    pub fn password_codec(&self) -> Result<PasswordCodec, PasswordHashError> {
        PasswordCodec::new(self.password_cost, self.password_pepper.clone())
    }
}
