use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::{ElectionId, ParticipantId, RecordId};

/// The fact that a participant has voted in an election, without what they chose.
///
/// At most one record may exist per (participant, election) pair; the store enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationCore {
    pub participant_id: ParticipantId,
    pub election_id: ElectionId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub voted_at: DateTime<Utc>,
}

/// A participation record without an ID.
pub type NewParticipation = ParticipationCore;

/// A participation record from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(flatten)]
    pub record: ParticipationCore,
}

impl Deref for ParticipationRecord {
    type Target = ParticipationCore;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}
