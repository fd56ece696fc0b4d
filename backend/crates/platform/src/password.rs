//! Password Hashing and Verification
//!
//! Argon2id-based credential codec:
//! - `hash` produces a PHC string with a fresh 128-bit salt on every call
//! - `verify` recomputes with the salt and cost embedded in the digest and
//!   never errors: a malformed digest simply does not match
//! - Cost (memory, iterations, lanes) is tunable through [`PasswordCost`]
//! - Cleartext is NFKC-normalized, redacted in `Debug` and zeroized on drop

use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Minimum password length in code points
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum password length in code points
pub const MAX_PASSWORD_LENGTH: usize = 128;

const DECOY_PASSWORD: &str = "decoy-password-for-unknown-accounts";

// ============================================================================
// Error Types
// ============================================================================

/// Password policy violations (registration only)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters")]
    TooLong { max: usize, actual: usize },

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,
}

/// Password hashing failures. These are internal faults, never user errors.
#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password cost parameters: {0}")]
    InvalidCost(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization.
///
/// Deliberately not `Clone`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Normalize and validate a password chosen at registration.
    ///
    /// Rules: 6 to 128 code points after NFKC normalization, not blank,
    /// no control characters other than space, tab and newline.
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let candidate = Self::for_verification(raw);
        let normalized = &candidate.0;

        if normalized.trim().is_empty() {
            return Err(PasswordPolicyError::EmptyOrWhitespace);
        }

        let char_count = normalized.chars().count();
        if char_count < MIN_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: MIN_PASSWORD_LENGTH,
                actual: char_count,
            });
        }
        if char_count > MAX_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: MAX_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        if normalized
            .chars()
            .any(|ch| ch.is_control() && ch != '\t' && ch != '\n')
        {
            return Err(PasswordPolicyError::InvalidCharacter);
        }

        Ok(candidate)
    }

    /// Normalize a password presented at login. No policy is applied:
    /// a password that fails policy simply won't match any digest.
    pub fn for_verification(mut raw: String) -> Self {
        let normalized: String = raw.nfkc().collect();
        raw.zeroize();
        Self(normalized)
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Argon2id hash in PHC string format
/// (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`).
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Wrap a PHC string loaded from storage
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    pub fn into_phc_string(self) -> String {
        self.hash
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Cost parameters
// ============================================================================

/// Argon2id work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordCost {
    /// Memory in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism (lanes)
    pub parallelism: u32,
}

impl Default for PasswordCost {
    /// OWASP recommended Argon2id parameters: m=19456 (19 MiB), t=2, p=1
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl PasswordCost {
    fn params(&self) -> Result<Params, PasswordHashError> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| PasswordHashError::InvalidCost(e.to_string()))
    }
}

// ============================================================================
// Codec
// ============================================================================

/// Hashes and verifies passwords with a fixed cost and optional pepper.
///
/// The pepper is an application-wide secret appended to the password bytes
/// before hashing; it must be identical for hashing and verification.
#[derive(Clone)]
pub struct PasswordCodec {
    argon2: Argon2<'static>,
    cost: PasswordCost,
    pepper: Option<Zeroizing<Vec<u8>>>,
    /// Digest at the current cost that no caller ever owns
    decoy: HashedPassword,
}

impl PasswordCodec {
    pub fn new(cost: PasswordCost, pepper: Option<Vec<u8>>) -> Result<Self, PasswordHashError> {
        let params = cost.params()?;
        let mut codec = Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            cost,
            pepper: pepper.map(Zeroizing::new),
            decoy: HashedPassword {
                hash: String::new(),
            },
        };
        codec.decoy = codec.hash(&ClearTextPassword::for_verification(
            DECOY_PASSWORD.to_string(),
        ))?;
        Ok(codec)
    }

    pub fn cost(&self) -> PasswordCost {
        self.cost
    }

    /// Hash a password with a freshly generated salt.
    pub fn hash(&self, password: &ClearTextPassword) -> Result<HashedPassword, PasswordHashError> {
        let input = self.peppered(password);
        let salt = SaltString::generate(OsRng);

        let hash = self
            .argon2
            .hash_password(&input, &salt)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
        })
    }

    /// Check a password against a stored digest.
    ///
    /// Parameters and salt come from the digest itself, so hashes created
    /// under an older cost keep verifying. Malformed digests return `false`.
    pub fn verify(&self, password: &ClearTextPassword, digest: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(digest) else {
            return false;
        };
        let input = self.peppered(password);

        // Argon2 compares the recomputed output in constant time
        self.argon2.verify_password(&input, &parsed_hash).is_ok()
    }

    /// Spend one verification's worth of work and report no match.
    ///
    /// Used when there is no stored digest to check (unknown account), so
    /// that path costs the same as a wrong password.
    pub fn verify_decoy(&self, password: &ClearTextPassword) -> bool {
        let _ = self.verify(password, self.decoy.as_phc_string());
        false
    }

    /// True when the digest was produced with a different algorithm or cost
    pub fn needs_rehash(&self, hashed: &HashedPassword) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hashed.as_phc_string()) else {
            return true;
        };
        if parsed_hash.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }
        match Params::try_from(&parsed_hash) {
            Ok(params) => {
                params.m_cost() != self.cost.memory_kib
                    || params.t_cost() != self.cost.iterations
                    || params.p_cost() != self.cost.parallelism
            }
            Err(_) => true,
        }
    }

    fn peppered(&self, password: &ClearTextPassword) -> Zeroizing<Vec<u8>> {
        let mut bytes = password.as_bytes().to_vec();
        if let Some(pepper) = &self.pepper {
            bytes.extend_from_slice(pepper);
        }
        Zeroizing::new(bytes)
    }
}

impl fmt::Debug for PasswordCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCodec")
            .field("cost", &self.cost)
            .field("pepper", &self.pepper.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
