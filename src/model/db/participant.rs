use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::{participant::Role, ParticipantId};

/// Core participant account data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantCore {
    /// Unique across all participants.
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    /// National identity number. Unique across all participants when present, and left out of
    /// the stored document when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pesel: Option<String>,
    pub role: Role,
    /// Deactivated participants can neither log in nor vote.
    pub active: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl ParticipantCore {
    /// Check whether the given password is correct.
    ///
    /// A malformed stored hash never verifies.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// A participant without an ID.
pub type NewParticipant = ParticipantCore;

/// A participant from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "_id")]
    pub id: ParticipantId,
    #[serde(flatten)]
    pub participant: ParticipantCore,
}

impl Deref for Participant {
    type Target = ParticipantCore;

    fn deref(&self) -> &Self::Target {
        &self.participant
    }
}

impl DerefMut for Participant {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.participant
    }
}
