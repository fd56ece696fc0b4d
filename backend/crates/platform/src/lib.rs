//! Platform Crate - Rate limiting and authentication core
//!
//! This crate provides the technical foundations every route relies on:
//! - Password hashing (Argon2id) - [`password`]
//! - Signed, time-bound session tokens (HS256 JWT) - [`token`]
//! - Fixed-window rate limiting with an injectable store - [`rate_limit`]
//! - Client key derivation from request headers - [`client`]
//! - Wall-clock abstraction for deterministic tests - [`clock`]
//! - Secure random bytes - [`crypto`]

pub mod client;
pub mod clock;
pub mod crypto;
pub mod password;
pub mod rate_limit;
pub mod token;
