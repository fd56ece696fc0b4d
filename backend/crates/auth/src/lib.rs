//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Business logic, entities, repository traits
//! - `application/` - Use cases and the request authenticator
//! - `infra/` - Database implementations
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Learner registration and email + password login
//! - Stateless bearer session tokens (HS256, 30-day absolute expiry)
//! - `Authenticator` gate shared with every protected route
//!
//! ## Security Model
//! - Passwords hashed with Argon2id on the blocking pool
//! - Unknown email and wrong password produce the same error
//! - `register` and `login` are rate limited per client

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::authenticator::Authenticator;
pub use application::config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use infra::postgres::PgUserRepository;
pub use presentation::handlers::AuthAppState;
pub use presentation::router::auth_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod models {
    pub use crate::domain::entity::user::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}
