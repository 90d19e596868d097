use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::collection::Coll;

pub const ELECTION_ID_COUNTER_ID: &str = "election_id";
pub const OPTION_ID_COUNTER_ID: &str = "option_id";
pub const PARTICIPANT_ID_COUNTER_ID: &str = "participant_id";
pub const RECORD_ID_COUNTER_ID: &str = "record_id";

const ALL_COUNTER_IDS: [&str; 4] = [
    ELECTION_ID_COUNTER_ID,
    OPTION_ID_COUNTER_ID,
    PARTICIPANT_ID_COUNTER_ID,
    RECORD_ID_COUNTER_ID,
];

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Atomically retrieve the next value of the counter with the given ID.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u32> {
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await?
            .ok_or_else(|| Error::unexpected(format!("Failed to find counter with ID {id}")))?;
        Ok(counter.next)
    }
}

/// Ensure every auto-increment counter exists, starting from 1.
///
/// Existing counters are left alone, so this operation is idempotent.
pub async fn ensure_counters_exist(counters: &Coll<Counter>) -> Result<()> {
    let upsert = UpdateOptions::builder().upsert(true).build();
    for id in ALL_COUNTER_IDS {
        counters
            .update_one(
                doc! { "_id": id },
                doc! { "$setOnInsert": { "next": 1 } },
                upsert.clone(),
            )
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use mongodb::Database;

    use super::*;

    #[backend_test]
    #[ignore = "requires a MongoDB replica set"]
    async fn counter_increment(db: Database) {
        let counters = Coll::<Counter>::from_db(&db);
        ensure_counters_exist(&counters).await.unwrap();

        assert_eq!(Counter::next(&counters, ELECTION_ID_COUNTER_ID).await.unwrap(), 1);
        assert_eq!(Counter::next(&counters, ELECTION_ID_COUNTER_ID).await.unwrap(), 2);
        // Counters are independent.
        assert_eq!(Counter::next(&counters, OPTION_ID_COUNTER_ID).await.unwrap(), 1);

        // Re-running setup does not reset anything.
        ensure_counters_exist(&counters).await.unwrap();
        assert_eq!(Counter::next(&counters, ELECTION_ID_COUNTER_ID).await.unwrap(), 3);
    }
}
