//! A [`Store`] backed by MongoDB.
//!
//! Vote commits and cascading deletes run in multi-document transactions, so the server must be
//! a replica set (a single-node one is enough).

mod collection;
mod counter;
mod errors;

pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{ensure_counters_exist, Counter};
pub use errors::is_duplicate_key_error;

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, Document},
    error::{Error as DbError, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, ClientSession, Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    common::{election::ElectionStatus, participant::Role, ElectionId, OptionId, ParticipantId},
    db::{
        Ballot, Election, ElectionOption, NewBallot, NewElection, NewElectionOption,
        NewParticipant, NewParticipation, Participant, ParticipationRecord,
    },
};

use self::counter::{
    ELECTION_ID_COUNTER_ID, OPTION_ID_COUNTER_ID, PARTICIPANT_ID_COUNTER_ID, RECORD_ID_COUNTER_ID,
};
use super::Store;

/// How many times to attempt a transaction that keeps failing transiently.
const MAX_TRANSACTION_ATTEMPTS: usize = 5;

/// A [`Store`] backed by a MongoDB database.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Connect to the database, creating any missing indexes and counters.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await?;
        ensure_counters_exist(&Coll::from_db(&db)).await?;
        Ok(Self { client, db })
    }

    /// The underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn coll<T: MongoCollection>(&self) -> Coll<T> {
        Coll::from_db(&self.db)
    }

    async fn next_id(&self, counter: &str) -> Result<u32> {
        Counter::next(&self.coll(), counter).await
    }

    /// Both halves of a vote, inside the session's current transaction.
    ///
    /// The participation record goes first so a duplicate fails before any ballot is written.
    async fn write_vote(
        &self,
        session: &mut ClientSession,
        ballot: &Ballot,
        record: &ParticipationRecord,
    ) -> std::result::Result<(), DbError> {
        self.coll::<ParticipationRecord>()
            .insert_one_with_session(record, None, session)
            .await?;
        self.coll::<Ballot>()
            .insert_one_with_session(ballot, None, session)
            .await?;
        Ok(())
    }

    /// Everything belonging to an election, inside the session's current transaction.
    async fn write_delete(
        &self,
        session: &mut ClientSession,
        id: ElectionId,
    ) -> std::result::Result<bool, DbError> {
        let children = doc! { "election_id": id };
        self.coll::<ParticipationRecord>()
            .delete_many_with_session(children.clone(), None, session)
            .await?;
        self.coll::<Ballot>()
            .delete_many_with_session(children.clone(), None, session)
            .await?;
        self.coll::<ElectionOption>()
            .delete_many_with_session(children, None, session)
            .await?;
        let deleted = self
            .coll::<Election>()
            .delete_one_with_session(doc! { "_id": id }, None, session)
            .await?;
        Ok(deleted.deleted_count > 0)
    }

    async fn count<T: MongoCollection + Send + Sync>(&self, filter: Document) -> Result<u64> {
        Ok(self.coll::<T>().count_documents(filter, None).await?)
    }
}

/// Whether a commit that failed on the given attempt should be sent again.
fn should_retry_commit(result_unknown: bool, attempt: usize) -> bool {
    result_unknown && attempt < MAX_TRANSACTION_ATTEMPTS
}

/// Commit the session's transaction, retrying a bounded number of times while the outcome is
/// unknown.
async fn commit_with_retry(session: &mut ClientSession) -> std::result::Result<(), DbError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = session.commit_transaction().await;
        let unknown = result
            .as_ref()
            .err()
            .map_or(false, |e| e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT));
        if !should_retry_commit(unknown, attempt) {
            return result;
        }
        debug!("Transaction commit result unknown, retrying commit (attempt {attempt})");
    }
}

/// Abort the session's transaction after a failed write.
async fn abort(session: &mut ClientSession) {
    if let Err(e) = session.abort_transaction().await {
        debug!("Failed to abort transaction: {e}");
    }
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn insert_election(&self, election: NewElection) -> Result<Election> {
        let id = self.next_id(ELECTION_ID_COUNTER_ID).await?;
        let election = Election { id, election };
        self.coll::<Election>().insert_one(&election, None).await?;
        Ok(election)
    }

    async fn election(&self, id: ElectionId) -> Result<Option<Election>> {
        Ok(self
            .coll::<Election>()
            .find_one(doc! { "_id": id }, None)
            .await?)
    }

    async fn elections(&self) -> Result<Vec<Election>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        Ok(self
            .coll::<Election>()
            .find(None, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn update_election_status(
        &self,
        id: ElectionId,
        status: ElectionStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Election>> {
        let update = doc! {
            "$set": {
                "status": status,
                "updated_at": updated_at,
            }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .coll::<Election>()
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await?)
    }

    async fn delete_election(&self, id: ElectionId) -> Result<bool> {
        let mut session = self.client.start_session(None).await?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            session.start_transaction(None).await?;
            let result = match self.write_delete(&mut session, id).await {
                Ok(deleted) => commit_with_retry(&mut session).await.map(|_| deleted),
                Err(e) => {
                    abort(&mut session).await;
                    Err(e)
                }
            };
            match result {
                Err(e)
                    if e.contains_label(TRANSIENT_TRANSACTION_ERROR)
                        && attempt < MAX_TRANSACTION_ATTEMPTS =>
                {
                    debug!("Transient error deleting election {id}, retrying: {e}");
                }
                result => return Ok(result?),
            }
        }
    }

    async fn insert_option(&self, option: NewElectionOption) -> Result<ElectionOption> {
        let id = self.next_id(OPTION_ID_COUNTER_ID).await?;
        let option = ElectionOption { id, option };
        self.coll::<ElectionOption>()
            .insert_one(&option, None)
            .await?;
        Ok(option)
    }

    async fn option(&self, id: OptionId) -> Result<Option<ElectionOption>> {
        Ok(self
            .coll::<ElectionOption>()
            .find_one(doc! { "_id": id }, None)
            .await?)
    }

    async fn options_for_election(&self, election_id: ElectionId) -> Result<Vec<ElectionOption>> {
        let options = FindOptions::builder()
            .sort(doc! { "display_order": 1, "_id": 1 })
            .build();
        Ok(self
            .coll::<ElectionOption>()
            .find(doc! { "election_id": election_id }, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn insert_participant(&self, participant: NewParticipant) -> Result<Participant> {
        let id = self.next_id(PARTICIPANT_ID_COUNTER_ID).await?;
        let participant = Participant { id, participant };
        match self
            .coll::<Participant>()
            .insert_one(&participant, None)
            .await
        {
            Ok(_) => Ok(participant),
            // Either unique index may have fired; the email one is checked by lookup.
            Err(e) if is_duplicate_key_error(&e) => {
                match (
                    self.participant_by_email(&participant.email).await?,
                    &participant.pesel,
                ) {
                    (None, Some(pesel)) => Err(Error::pesel_taken(pesel)),
                    _ => Err(Error::email_taken(&participant.email)),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn participant(&self, id: ParticipantId) -> Result<Option<Participant>> {
        Ok(self
            .coll::<Participant>()
            .find_one(doc! { "_id": id }, None)
            .await?)
    }

    async fn participant_by_email(&self, email: &str) -> Result<Option<Participant>> {
        Ok(self
            .coll::<Participant>()
            .find_one(doc! { "email": email }, None)
            .await?)
    }

    async fn participants(&self) -> Result<Vec<Participant>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        Ok(self
            .coll::<Participant>()
            .find(None, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn set_participant_active(
        &self,
        id: ParticipantId,
        active: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Participant>> {
        let update = doc! {
            "$set": {
                "active": active,
                "updated_at": updated_at,
            }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .coll::<Participant>()
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await?)
    }

    async fn has_admin(&self) -> Result<bool> {
        let admins = self
            .count::<Participant>(doc! { "role": Role::Admin })
            .await?;
        Ok(admins > 0)
    }

    async fn has_participated(
        &self,
        participant_id: ParticipantId,
        election_id: ElectionId,
    ) -> Result<bool> {
        let records = self
            .count::<ParticipationRecord>(doc! {
                "participant_id": participant_id,
                "election_id": election_id,
            })
            .await?;
        Ok(records > 0)
    }

    async fn commit_vote(&self, ballot: NewBallot, participation: NewParticipation) -> Result<()> {
        let election_id = participation.election_id;
        let record = ParticipationRecord {
            id: self.next_id(RECORD_ID_COUNTER_ID).await?,
            record: participation,
        };
        let ballot = Ballot::new(ballot);

        let mut session = self.client.start_session(None).await?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            session.start_transaction(None).await?;
            let result = match self.write_vote(&mut session, &ballot, &record).await {
                Ok(()) => commit_with_retry(&mut session).await,
                Err(e) => {
                    abort(&mut session).await;
                    Err(e)
                }
            };
            match result {
                Ok(()) => return Ok(()),
                Err(e) if is_duplicate_key_error(&e) => {
                    return Err(Error::AlreadyVoted(election_id));
                }
                Err(e)
                    if e.contains_label(TRANSIENT_TRANSACTION_ERROR)
                        && attempt < MAX_TRANSACTION_ATTEMPTS =>
                {
                    debug!("Transient error committing vote, retrying: {e}");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn count_ballots(&self, election_id: ElectionId) -> Result<u64> {
        self.count::<Ballot>(doc! { "election_id": election_id })
            .await
    }

    async fn count_ballots_for_choice(
        &self,
        election_id: ElectionId,
        option_id: OptionId,
    ) -> Result<u64> {
        self.count::<Ballot>(doc! {
            "election_id": election_id,
            "option_id": option_id,
        })
        .await
    }

    async fn count_ballots_for_option(&self, option_id: OptionId) -> Result<u64> {
        self.count::<Ballot>(doc! { "option_id": option_id })
            .await
    }

    async fn count_participation(&self, election_id: ElectionId) -> Result<u64> {
        self.count::<ParticipationRecord>(doc! { "election_id": election_id })
            .await
    }
}
