//! Shared Kernel
//!
//! Vocabulary shared by every crate in the workspace:
//! - The unified [`error::app_error::AppError`] and its [`error::kind::ErrorKind`]
//! - Typed identifiers for users and conversations
//!
//! Only things with the same meaning in every domain belong here.

pub mod error {
    pub mod app_error;
    pub mod kind;
}
pub mod id;
