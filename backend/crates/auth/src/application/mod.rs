//! Application Layer
//!
//! Use cases and application services.

pub mod authenticator;
pub mod config;
pub mod current_user;
pub mod login;
pub mod register;

// Re-exports
pub use authenticator::{Authenticator, extract_bearer_token};
pub use config::AuthConfig;
pub use current_user::CurrentUserUseCase;
pub use login::{LoginInput, LoginOutput, LoginUseCase};
pub use register::{RegisterInput, RegisterOutput, RegisterUseCase};
