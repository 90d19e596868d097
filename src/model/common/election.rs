use std::fmt::{self, Display};
use std::str::FromStr;

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// States in the election lifecycle.
///
/// Transitions are made by administrators; nothing moves an election between states
/// automatically, not even the end of its voting window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionStatus {
    /// Under construction; options may still be added.
    Draft,
    /// Accepting votes while inside the voting window.
    Active,
    /// No longer accepting votes.
    Closed,
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

impl FromStr for ElectionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "ACTIVE" => Ok(Self::Active),
            "CLOSED" => Ok(Self::Closed),
            _ => Err(Error::InvalidArgument(format!(
                "Unknown election status '{s}', expected one of DRAFT, ACTIVE, CLOSED"
            ))),
        }
    }
}

impl From<ElectionStatus> for Bson {
    fn from(status: ElectionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
