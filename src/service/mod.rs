//! The business logic, independent of HTTP.
//!
//! Every operation takes the [`Store`](crate::store::Store) to work against, so routes and tests
//! can drive the same code.

pub mod accounts;
pub mod lifecycle;
pub mod results;
pub mod voting;
