//! CDC envelope codec.
//!
//! Decodes Debezium-style key/value envelopes into canonical records and
//! provides the canonical JSON form used for chains and registration bodies.

pub mod canonical;
pub mod envelope;
pub mod error;
