//! Authentication tokens and the access levels they grant.

mod access;
mod principal;
mod token;

pub use access::{Access, Admin, Voter};
pub use principal::Principal;
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
