//! Learner Age Value Object

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AuthError, AuthResult};

pub const MIN_AGE: i64 = 5;
pub const MAX_AGE: i64 = 18;

/// Learner age in years, 5 to 18 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Age(u8);

impl Age {
    pub fn new(years: i64) -> AuthResult<Self> {
        if !(MIN_AGE..=MAX_AGE).contains(&years) {
            return Err(AuthError::Validation(format!(
                "Age must be between {MIN_AGE} and {MAX_AGE}"
            )));
        }
        Ok(Self(years as u8))
    }

    pub fn from_db(years: i16) -> Self {
        Self(years.clamp(0, u8::MAX as i16) as u8)
    }

    pub fn years(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
