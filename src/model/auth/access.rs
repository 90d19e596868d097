use crate::model::common::participant::Role;

/// A level of access that a route can demand of its caller.
pub trait Access {
    /// Human-readable name, for log and error messages.
    const NAME: &'static str;

    /// Does a participant with the given role have this access?
    fn permits(role: Role) -> bool;
}

/// Any authenticated participant.
pub struct Voter;

impl Access for Voter {
    const NAME: &'static str = "voter";

    fn permits(_role: Role) -> bool {
        true
    }
}

/// Administrators only.
pub struct Admin;

impl Access for Admin {
    const NAME: &'static str = "admin";

    fn permits(role: Role) -> bool {
        role == Role::Admin
    }
}
