use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{Ballot, Election, ElectionOption, Participant, ParticipationRecord};

use super::counter::Counter;

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl MongoCollection for Election {
    const NAME: &'static str = "elections";
}

impl MongoCollection for ElectionOption {
    const NAME: &'static str = "options";
}

impl MongoCollection for Ballot {
    const NAME: &'static str = "ballots";
}

impl MongoCollection for ParticipationRecord {
    const NAME: &'static str = "participation";
}

impl MongoCollection for Participant {
    const NAME: &'static str = "participants";
}

impl MongoCollection for Counter {
    const NAME: &'static str = "counters";
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Participant emails are unique.
    let participant_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique.clone())
        .build();
    Coll::<Participant>::from_db(db)
        .create_index(participant_index, None)
        .await?;

    // So are PESELs, for the participants that have one.
    let sparse_unique = IndexOptions::builder().unique(true).sparse(true).build();
    let pesel_index = IndexModel::builder()
        .keys(doc! {"pesel": 1})
        .options(sparse_unique)
        .build();
    Coll::<Participant>::from_db(db)
        .create_index(pesel_index, None)
        .await?;

    // One participation record per participant per election. This is what ultimately stops
    // concurrent double votes.
    let participation_index = IndexModel::builder()
        .keys(doc! {"participant_id": 1, "election_id": 1})
        .options(unique)
        .build();
    Coll::<ParticipationRecord>::from_db(db)
        .create_index(participation_index, None)
        .await?;

    // Tallying.
    let ballot_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "option_id": 1})
        .build();
    Coll::<Ballot>::from_db(db)
        .create_index(ballot_index, None)
        .await?;

    let option_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "display_order": 1})
        .build();
    Coll::<ElectionOption>::from_db(db)
        .create_index(option_index, None)
        .await?;

    Ok(())
}
