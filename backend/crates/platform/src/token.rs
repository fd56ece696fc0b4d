//! Session Tokens
//!
//! Stateless, signed identity tokens: compact HS256 JWTs produced and
//! checked by `jsonwebtoken`.
//!
//! Expiry is absolute and fixed at issuance. Verification touches nothing
//! but the secret and the clock, so it can run concurrently without locks.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::clock::{Clock, SystemClock};
use crate::crypto::random_bytes;

/// Default token lifetime (30 days)
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(30 * 24 * 3600);

// ============================================================================
// Errors
// ============================================================================

/// Startup configuration errors. These are fatal: the process must not
/// start serving without a signing secret.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingSecret(String),

    #[error("{0} must not be empty")]
    EmptySecret(String),
}

/// Why a token was rejected (or, for `Encoding`, could not be produced).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Unsupported token algorithm")]
    UnsupportedAlgorithm,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Token expired")]
    Expired,

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

impl From<JwtError> for TokenError {
    fn from(err: JwtError) -> Self {
        match err.kind() {
            JwtErrorKind::InvalidSignature => TokenError::BadSignature,
            JwtErrorKind::InvalidAlgorithm | JwtErrorKind::InvalidAlgorithmName => {
                TokenError::UnsupportedAlgorithm
            }
            JwtErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

// ============================================================================
// Secret
// ============================================================================

/// HMAC signing secret, loaded once at startup and immutable afterwards.
#[derive(Clone)]
pub struct SessionSecret(Zeroizing<Vec<u8>>);

impl SessionSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ConfigError::EmptySecret("Session secret".to_string()));
        }
        Ok(Self(Zeroizing::new(bytes)))
    }

    /// Read the secret from an environment variable.
    pub fn from_env(var: &str) -> Result<Self, ConfigError> {
        let value = std::env::var(var).map_err(|_| ConfigError::MissingSecret(var.to_string()))?;
        if value.trim().is_empty() {
            return Err(ConfigError::EmptySecret(var.to_string()));
        }
        if value.len() < 32 {
            tracing::warn!(
                variable = var,
                length = value.len(),
                "Session secret is shorter than 32 bytes"
            );
        }
        Ok(Self(Zeroizing::new(value.into_bytes())))
    }

    /// Random 32-byte secret (development and tests)
    pub fn random() -> Self {
        Self(Zeroizing::new(random_bytes(32)))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionSecret([REDACTED])")
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Identity facts carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

/// Full claim set: identity plus issue/expiry times (Unix seconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(flatten)]
    pub identity: Identity,
    pub iat: i64,
    pub exp: i64,
}

// ============================================================================
// Service
// ============================================================================

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(secret: SessionSecret) -> Self {
        // Expiry is checked against the injected clock instead.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime: DEFAULT_TOKEN_LIFETIME,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Sign a token for `identity`, expiring `lifetime` from now.
    pub fn issue(&self, identity: &Identity) -> Result<String, TokenError> {
        let iat = self.clock.now_secs();
        let claims = SessionClaims {
            identity: identity.clone(),
            iat,
            exp: iat.saturating_add(self.lifetime.as_secs() as i64),
        };
        self.encode(&claims)
    }

    /// Check structure, algorithm, signature and expiry.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let claims = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?.claims;

        if claims.exp <= self.clock.now_secs() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn encode(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

    const SECRET: &[u8] = b"test-secret-test-secret-test-sec";
    const START_MS: i64 = 1_700_000_000_000;

    fn identity() -> Identity {
        Identity {
            user_id: "3f1c2a9e-8d4b-4c6e-9a7f-0b1d2e3f4a5b".to_string(),
            email: "katie@example.com".to_string(),
            display_name: "Katie".to_string(),
        }
    }

    fn service(clock: &ManualClock) -> TokenService {
        TokenService::new(SessionSecret::new(SECRET.to_vec()).unwrap())
            .with_clock(Arc::new(clock.clone()))
    }

    fn flip_bit_in_segment(token: &str, segment: usize) -> String {
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let mut bytes = URL_SAFE_NO_PAD.decode(&parts[segment]).unwrap();
        bytes[0] ^= 0x01;
        parts[segment] = URL_SAFE_NO_PAD.encode(&bytes);
        parts.join(".")
    }

    #[test]
    fn test_issue_then_verify_roundtrip() {
        let clock = ManualClock::new(START_MS);
        let service = service(&clock);

        let token = service.issue(&identity()).unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.identity, identity());
        assert_eq!(claims.iat, START_MS / 1000);
        assert_eq!(claims.exp, START_MS / 1000 + 30 * 24 * 3600);
    }

    #[test]
    fn test_token_has_three_segments_and_hs256_header() {
        let clock = ManualClock::new(START_MS);
        let token = service(&clock).issue(&identity()).unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[0]).unwrap()).unwrap();
        assert_eq!(header["alg"], "HS256");

        let claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        assert_eq!(claims["userId"], identity().user_id);
        assert_eq!(claims["name"], "Katie");
    }

    #[test]
    fn test_signature_is_deterministic() {
        let clock = ManualClock::new(START_MS);
        let service = service(&clock);
        assert_eq!(
            service.issue(&identity()).unwrap(),
            service.issue(&identity()).unwrap()
        );
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let clock = ManualClock::new(START_MS);
        let service = service(&clock);
        let token = service.issue(&identity()).unwrap();

        // One second past expiry
        clock.advance(DEFAULT_TOKEN_LIFETIME + Duration::from_secs(1));
        assert_eq!(service.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_token_valid_until_expiry_instant() {
        let clock = ManualClock::new(START_MS);
        let service = service(&clock).with_lifetime(Duration::from_secs(60));
        let token = service.issue(&identity()).unwrap();

        clock.advance(Duration::from_secs(59));
        assert!(service.verify(&token).is_ok());

        clock.advance(Duration::from_secs(1));
        assert_eq!(service.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_flipped_signature_bit_is_rejected() {
        let clock = ManualClock::new(START_MS);
        let service = service(&clock);
        let token = service.issue(&identity()).unwrap();

        let tampered = flip_bit_in_segment(&token, 2);
        assert_eq!(service.verify(&tampered), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_flipped_claims_bit_is_rejected() {
        let clock = ManualClock::new(START_MS);
        let service = service(&clock);
        let token = service.issue(&identity()).unwrap();

        let tampered = flip_bit_in_segment(&token, 1);
        assert_eq!(service.verify(&tampered), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let clock = ManualClock::new(START_MS);
        let other = TokenService::new(SessionSecret::random()).with_clock(Arc::new(clock.clone()));
        let token = other.issue(&identity()).unwrap();

        assert_eq!(service(&clock).verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let clock = ManualClock::new(START_MS);
        let service = service(&clock);

        for token in ["", "abc", "a.b", "a.b.c.d", "..", "a.b.!!!"] {
            assert!(service.verify(token).is_err(), "accepted {token:?}");
        }
        assert_eq!(service.verify("a.b"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_other_hmac_algorithm_is_rejected_even_if_signed() {
        let clock = ManualClock::new(START_MS);
        let service = service(&clock);
        let claims = SessionClaims {
            identity: identity(),
            iat: START_MS / 1000,
            exp: START_MS / 1000 + 3600,
        };
        let forged = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(service.verify(&forged), Err(TokenError::UnsupportedAlgorithm));
    }

    #[test]
    fn test_alg_none_is_rejected() {
        let clock = ManualClock::new(START_MS);
        let service = service(&clock);
        let token = service.issue(&identity()).unwrap();
        let claims_b64 = token.split('.').nth(1).unwrap();

        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let forged = format!("{header}.{claims_b64}.");

        assert!(service.verify(&forged).is_err());
    }

    #[test]
    fn test_token_without_expiry_is_rejected() {
        #[derive(Serialize)]
        struct NoExpiry<'a> {
            #[serde(rename = "userId")]
            user_id: &'a str,
            email: &'a str,
            name: &'a str,
            iat: i64,
        }

        let clock = ManualClock::new(START_MS);
        let token = encode(
            &Header::new(Algorithm::HS256),
            &NoExpiry {
                user_id: "u1",
                email: "katie@example.com",
                name: "Katie",
                iat: START_MS / 1000,
            },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(service(&clock).verify(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn test_empty_secret_is_a_config_error() {
        assert!(matches!(
            SessionSecret::new(Vec::new()),
            Err(ConfigError::EmptySecret(_))
        ));
    }

    #[test]
    fn test_missing_env_secret_is_a_config_error() {
        let result = SessionSecret::from_env("PLATFORM_TEST_SECRET_THAT_IS_NEVER_SET");
        assert_eq!(
            result.unwrap_err(),
            ConfigError::MissingSecret("PLATFORM_TEST_SECRET_THAT_IS_NEVER_SET".to_string())
        );
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = SessionSecret::new(b"super-secret".to_vec()).unwrap();
        assert!(!format!("{:?}", secret).contains("super"));
    }
}
