//! Infrastructure Layer
//!
//! Repository implementations and the realtime provider client.

pub mod memory;
pub mod openai;
pub mod postgres;
