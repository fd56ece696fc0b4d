//! User Entity
//!
//! A learner account: login credentials plus the profile the tutor uses.

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use platform::password::HashedPassword;
use platform::token::Identity;

use crate::domain::value_object::{age::Age, display_name::DisplayName, email::Email};

/// Voice assigned to new accounts
pub const DEFAULT_VOICE: &str = "shimmer";

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    /// Unique, lowercased
    pub email: Email,
    pub password_hash: HashedPassword,
    pub name: DisplayName,
    pub age: Age,
    pub selected_voice: String,
    /// Never negative
    pub total_points: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: Email, password_hash: HashedPassword, name: DisplayName, age: Age) -> Self {
        let now = Utc::now();

        Self {
            id: UserId::new(),
            email,
            password_hash,
            name,
            age,
            selected_voice: DEFAULT_VOICE.to_string(),
            total_points: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Claims embedded in session tokens for this user
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id.to_string(),
            email: self.email.to_string(),
            display_name: self.name.to_string(),
        }
    }

    pub fn rename(&mut self, name: DisplayName) {
        self.name = name;
        self.updated_at = Utc::now();
    }

    /// Caller validates `voice` against the catalog.
    pub fn select_voice(&mut self, voice: impl Into<String>) {
        self.selected_voice = voice.into();
        self.updated_at = Utc::now();
    }

    pub fn set_password_hash(&mut self, password_hash: HashedPassword) {
        self.password_hash = password_hash;
        self.updated_at = Utc::now();
    }
}
