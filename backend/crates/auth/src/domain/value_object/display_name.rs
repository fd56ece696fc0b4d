//! Display Name Value Object

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AuthError, AuthResult};

/// Maximum display name length (in characters)
pub const DISPLAY_NAME_MAX_LENGTH: usize = 100;

/// Name the tutor uses to address the learner. Free-form, trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(name: impl AsRef<str>) -> AuthResult<Self> {
        let name = name.as_ref().trim();

        if name.is_empty() {
            return Err(AuthError::Validation("Name is required".to_string()));
        }
        if name.chars().count() > DISPLAY_NAME_MAX_LENGTH {
            return Err(AuthError::Validation(format!(
                "Name must be at most {DISPLAY_NAME_MAX_LENGTH} characters"
            )));
        }
        if name.chars().any(char::is_control) {
            return Err(AuthError::Validation(
                "Name contains invalid characters".to_string(),
            ));
        }

        Ok(Self(name.to_string()))
    }

    pub fn from_db(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_is_trimmed() {
        assert_eq!(DisplayName::new("  Katie ").unwrap().as_str(), "Katie");
    }

    #[test]
    fn test_display_name_rejects_blank_and_long() {
        assert!(DisplayName::new("").is_err());
        assert!(DisplayName::new("   ").is_err());
        assert!(DisplayName::new("a".repeat(101)).is_err());
        assert!(DisplayName::new("a".repeat(100)).is_ok());
        assert!(DisplayName::new("Ka\u{0007}tie").is_err());
    }
}
