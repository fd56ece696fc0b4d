//! Value Object Module

pub mod age;
pub mod display_name;
pub mod email;
