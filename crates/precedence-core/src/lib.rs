//! Core primitives shared across the precedence crates.
//!
//! Includes the content digest helper, the canonical record and topic set
//! types, registration outcomes, and base errors.

pub mod error;
pub mod hash;
pub mod types;

pub use types::{CanonicalRecord, RegistrationOutcome, TopicSet};
