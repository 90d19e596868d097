//! Persistence for elections, options, ballots, participation records and participants.
//!
//! Services talk to a [`Store`] trait object held in managed state as [`Storage`], so the same
//! code runs against the in-memory store and MongoDB.

use std::ops::Deref;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{
    common::{election::ElectionStatus, ElectionId, OptionId, ParticipantId},
    db::{
        Election, ElectionOption, NewBallot, NewElection, NewElectionOption, NewParticipant,
        NewParticipation, Participant,
    },
};

mod memory;
pub mod mongodb;

pub use self::memory::MemoryStore;
pub use self::mongodb::MongoStore;

/// Which backend to persist data in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Memory,
    Mongodb,
}

/// Everything the services need from persistent storage.
///
/// Implementations must make [`Store::commit_vote`] atomic, and must reject a second
/// participation record for the same participant and election no matter how many callers race
/// to write one.
#[rocket::async_trait]
pub trait Store: Send + Sync {
    /// Insert a new election, assigning it a fresh ID.
    async fn insert_election(&self, election: NewElection) -> Result<Election>;

    async fn election(&self, id: ElectionId) -> Result<Option<Election>>;

    /// All elections, in ascending ID order.
    async fn elections(&self) -> Result<Vec<Election>>;

    /// Set an election's status, returning the updated election if it exists.
    async fn update_election_status(
        &self,
        id: ElectionId,
        status: ElectionStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Election>>;

    /// Delete an election with its options, ballots and participation records.
    ///
    /// Returns false if no such election existed.
    async fn delete_election(&self, id: ElectionId) -> Result<bool>;

    /// Insert a new option, assigning it a fresh ID.
    async fn insert_option(&self, option: NewElectionOption) -> Result<ElectionOption>;

    async fn option(&self, id: OptionId) -> Result<Option<ElectionOption>>;

    /// An election's options, ordered by display order and then ID.
    async fn options_for_election(&self, election_id: ElectionId) -> Result<Vec<ElectionOption>>;

    /// Insert a new participant, failing with [`Error::DuplicateResource`] if the email or PESEL
    /// is taken.
    async fn insert_participant(&self, participant: NewParticipant) -> Result<Participant>;

    async fn participant(&self, id: ParticipantId) -> Result<Option<Participant>>;

    async fn participant_by_email(&self, email: &str) -> Result<Option<Participant>>;

    /// All participants, in ascending ID order.
    async fn participants(&self) -> Result<Vec<Participant>>;

    /// Activate or deactivate a participant, returning the updated participant if it exists.
    async fn set_participant_active(
        &self,
        id: ParticipantId,
        active: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Participant>>;

    /// Is there at least one admin account?
    async fn has_admin(&self) -> Result<bool>;

    /// Has the participant already voted in the election?
    async fn has_participated(
        &self,
        participant_id: ParticipantId,
        election_id: ElectionId,
    ) -> Result<bool>;

    /// Atomically store an anonymous ballot together with the participation record.
    ///
    /// Either both are written or neither is. If a participation record already exists for the
    /// same participant and election, fails with [`Error::AlreadyVoted`] and writes nothing.
    async fn commit_vote(&self, ballot: NewBallot, participation: NewParticipation) -> Result<()>;

    /// Number of ballots cast in an election.
    async fn count_ballots(&self, election_id: ElectionId) -> Result<u64>;

    /// Number of ballots cast in an election for a specific option.
    async fn count_ballots_for_choice(
        &self,
        election_id: ElectionId,
        option_id: OptionId,
    ) -> Result<u64>;

    /// Number of ballots cast for an option, whatever election they were cast in.
    async fn count_ballots_for_option(&self, option_id: OptionId) -> Result<u64>;

    /// Number of participation records for an election.
    async fn count_participation(&self, election_id: ElectionId) -> Result<u64>;
}

/// A shared handle on the configured [`Store`], kept in managed state.
#[derive(Clone)]
pub struct Storage(Arc<dyn Store>);

impl Storage {
    pub fn new(store: impl Store + 'static) -> Self {
        Self(Arc::new(store))
    }

    /// A fresh, empty in-memory store.
    pub fn memory() -> Self {
        Self::new(MemoryStore::default())
    }
}

impl Deref for Storage {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Storage {
    type Error = Error;

    /// Get a handle on the managed [`Storage`].
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        req.guard::<&State<Storage>>()
            .await
            .map(|storage| storage.inner().clone())
            .map_failure(|_| {
                (
                    Status::InternalServerError,
                    Error::unexpected("Storage is not managed"),
                )
            })
    }
}
