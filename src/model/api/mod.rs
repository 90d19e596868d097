//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as plain integers under an `id` key.
//! - Datetimes are serialised as RFC 3339 strings.
//! - Secrets such as password hashes never appear.

pub mod election;
pub mod participant;
pub mod results;
pub mod vote;
