use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::{ElectionId, OptionId};

/// Core option data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionOptionCore {
    /// The election this option belongs to. Never changes after creation.
    pub election_id: ElectionId,
    pub title: String,
    pub description: Option<String>,
    /// Options are presented in ascending order of this value.
    pub display_order: i32,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ElectionOptionCore {
    pub fn new(
        election_id: ElectionId,
        title: String,
        description: Option<String>,
        display_order: Option<i32>,
    ) -> Self {
        Self {
            election_id,
            title,
            description,
            display_order: display_order.unwrap_or(0),
            created_at: Utc::now(),
        }
    }
}

/// An option without an ID.
pub type NewElectionOption = ElectionOptionCore;

/// An option from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionOption {
    #[serde(rename = "_id")]
    pub id: OptionId,
    #[serde(flatten)]
    pub option: ElectionOptionCore,
}

impl Deref for ElectionOption {
    type Target = ElectionOptionCore;

    fn deref(&self) -> &Self::Target {
        &self.option
    }
}
