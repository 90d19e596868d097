use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::{election::ElectionStatus, ElectionId};

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCore {
    pub name: String,
    pub description: Option<String>,
    /// Votes are accepted from this instant, inclusive.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    /// Votes are accepted up to this instant, inclusive.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    pub status: ElectionStatus,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl ElectionCore {
    /// Create a new draft election.
    pub fn new(
        name: String,
        description: Option<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            name,
            description,
            start_time,
            end_time,
            status: ElectionStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    /// Is the election accepting votes at the given instant?
    ///
    /// Both ends of the voting window are inclusive.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ElectionStatus::Active && self.start_time <= now && now <= self.end_time
    }

    /// Is the election accepting votes right now?
    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    /// Can options still be added to this election?
    pub fn can_be_modified(&self) -> bool {
        self.status == ElectionStatus::Draft
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: ElectionId,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}
