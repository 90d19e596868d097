use std::fmt::{self, Display};

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// What a participant is allowed to do.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// May vote and read results.
    Voter,
    /// May additionally manage elections and participants.
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Voter => f.write_str("VOTER"),
            Self::Admin => f.write_str("ADMIN"),
        }
    }
}

impl From<Role> for Bson {
    fn from(role: Role) -> Self {
        to_bson(&role).expect("Serialisation is infallible")
    }
}
