use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{
    common::{
        election::ElectionStatus, participant::Role, BallotId, ElectionId, OptionId,
        ParticipantId, RecordId,
    },
    db::{
        Ballot, Election, ElectionOption, NewBallot, NewElection, NewElectionOption,
        NewParticipant, NewParticipation, Participant, ParticipationRecord,
    },
};

use super::Store;

#[derive(Default)]
struct Tables {
    elections: BTreeMap<ElectionId, Election>,
    options: BTreeMap<OptionId, ElectionOption>,
    ballots: BTreeMap<BallotId, Ballot>,
    participation: HashMap<(ParticipantId, ElectionId), ParticipationRecord>,
    participants: BTreeMap<ParticipantId, Participant>,
    last_election_id: ElectionId,
    last_option_id: OptionId,
    last_participant_id: ParticipantId,
    last_record_id: RecordId,
}

/// Take the next value of an auto-increment counter. IDs start at 1.
fn next_id(last: &mut u32) -> u32 {
    *last += 1;
    *last
}

/// A [`Store`] that keeps everything in process memory behind a single lock.
///
/// Every operation runs entirely under the lock, so each is atomic with respect to the others.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::unexpected("In-memory store lock poisoned"))
    }
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn insert_election(&self, election: NewElection) -> Result<Election> {
        let mut tables = self.lock()?;
        let id = next_id(&mut tables.last_election_id);
        let election = Election { id, election };
        tables.elections.insert(id, election.clone());
        Ok(election)
    }

    async fn election(&self, id: ElectionId) -> Result<Option<Election>> {
        Ok(self.lock()?.elections.get(&id).cloned())
    }

    async fn elections(&self) -> Result<Vec<Election>> {
        Ok(self.lock()?.elections.values().cloned().collect())
    }

    async fn update_election_status(
        &self,
        id: ElectionId,
        status: ElectionStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Election>> {
        let mut tables = self.lock()?;
        Ok(tables.elections.get_mut(&id).map(|election| {
            election.status = status;
            election.updated_at = updated_at;
            election.clone()
        }))
    }

    async fn delete_election(&self, id: ElectionId) -> Result<bool> {
        let mut tables = self.lock()?;
        if tables.elections.remove(&id).is_none() {
            return Ok(false);
        }
        tables.options.retain(|_, option| option.election_id != id);
        tables.ballots.retain(|_, ballot| ballot.election_id != id);
        tables
            .participation
            .retain(|(_, election_id), _| *election_id != id);
        Ok(true)
    }

    async fn insert_option(&self, option: NewElectionOption) -> Result<ElectionOption> {
        let mut tables = self.lock()?;
        let id = next_id(&mut tables.last_option_id);
        let option = ElectionOption { id, option };
        tables.options.insert(id, option.clone());
        Ok(option)
    }

    async fn option(&self, id: OptionId) -> Result<Option<ElectionOption>> {
        Ok(self.lock()?.options.get(&id).cloned())
    }

    async fn options_for_election(&self, election_id: ElectionId) -> Result<Vec<ElectionOption>> {
        let tables = self.lock()?;
        let mut options = tables
            .options
            .values()
            .filter(|option| option.election_id == election_id)
            .cloned()
            .collect::<Vec<_>>();
        // Already in ID order, and the sort is stable.
        options.sort_by_key(|option| option.display_order);
        Ok(options)
    }

    async fn insert_participant(&self, participant: NewParticipant) -> Result<Participant> {
        let mut tables = self.lock()?;
        for existing in tables.participants.values() {
            if existing.email == participant.email {
                return Err(Error::email_taken(&participant.email));
            }
            if let (Some(pesel), Some(taken)) = (&participant.pesel, &existing.pesel) {
                if pesel == taken {
                    return Err(Error::pesel_taken(pesel));
                }
            }
        }
        let id = next_id(&mut tables.last_participant_id);
        let participant = Participant { id, participant };
        tables.participants.insert(id, participant.clone());
        Ok(participant)
    }

    async fn participant(&self, id: ParticipantId) -> Result<Option<Participant>> {
        Ok(self.lock()?.participants.get(&id).cloned())
    }

    async fn participant_by_email(&self, email: &str) -> Result<Option<Participant>> {
        Ok(self
            .lock()?
            .participants
            .values()
            .find(|participant| participant.email == email)
            .cloned())
    }

    async fn participants(&self) -> Result<Vec<Participant>> {
        Ok(self.lock()?.participants.values().cloned().collect())
    }

    async fn set_participant_active(
        &self,
        id: ParticipantId,
        active: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Participant>> {
        let mut tables = self.lock()?;
        Ok(tables.participants.get_mut(&id).map(|participant| {
            participant.active = active;
            participant.updated_at = updated_at;
            participant.clone()
        }))
    }

    async fn has_admin(&self) -> Result<bool> {
        Ok(self
            .lock()?
            .participants
            .values()
            .any(|participant| participant.role == Role::Admin))
    }

    async fn has_participated(
        &self,
        participant_id: ParticipantId,
        election_id: ElectionId,
    ) -> Result<bool> {
        Ok(self
            .lock()?
            .participation
            .contains_key(&(participant_id, election_id)))
    }

    async fn commit_vote(&self, ballot: NewBallot, participation: NewParticipation) -> Result<()> {
        let mut tables = self.lock()?;
        let key = (participation.participant_id, participation.election_id);
        if tables.participation.contains_key(&key) {
            return Err(Error::AlreadyVoted(participation.election_id));
        }

        let mut ballot = Ballot::new(ballot);
        while tables.ballots.contains_key(&ballot.id) {
            ballot = Ballot::new(ballot.ballot);
        }
        let id = next_id(&mut tables.last_record_id);
        tables.ballots.insert(ballot.id, ballot);
        tables.participation.insert(
            key,
            ParticipationRecord {
                id,
                record: participation,
            },
        );
        Ok(())
    }

    async fn count_ballots(&self, election_id: ElectionId) -> Result<u64> {
        let tables = self.lock()?;
        Ok(tables
            .ballots
            .values()
            .filter(|ballot| ballot.election_id == election_id)
            .count() as u64)
    }

    async fn count_ballots_for_choice(
        &self,
        election_id: ElectionId,
        option_id: OptionId,
    ) -> Result<u64> {
        let tables = self.lock()?;
        Ok(tables
            .ballots
            .values()
            .filter(|ballot| ballot.election_id == election_id && ballot.option_id == option_id)
            .count() as u64)
    }

    async fn count_ballots_for_option(&self, option_id: OptionId) -> Result<u64> {
        let tables = self.lock()?;
        Ok(tables
            .ballots
            .values()
            .filter(|ballot| ballot.option_id == option_id)
            .count() as u64)
    }

    async fn count_participation(&self, election_id: ElectionId) -> Result<u64> {
        let tables = self.lock()?;
        Ok(tables
            .participation
            .keys()
            .filter(|(_, id)| *id == election_id)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::db::{BallotCore, ElectionCore, ElectionOptionCore, ParticipantCore};

    fn vote(
        participant_id: ParticipantId,
        election_id: ElectionId,
        option_id: OptionId,
    ) -> (NewBallot, NewParticipation) {
        (
            BallotCore {
                election_id,
                option_id,
            },
            NewParticipation {
                participant_id,
                election_id,
                voted_at: Utc::now(),
            },
        )
    }

    #[rocket::async_test]
    async fn ids_are_sequential() {
        let store = MemoryStore::default();
        let first = store
            .insert_election(ElectionCore::draft_example())
            .await
            .unwrap();
        let second = store
            .insert_election(ElectionCore::draft_example())
            .await
            .unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        let ids = store
            .elections()
            .await
            .unwrap()
            .into_iter()
            .map(|election| election.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, [1, 2]);
    }

    #[rocket::async_test]
    async fn options_sorted_by_display_order() {
        let store = MemoryStore::default();
        let election = store
            .insert_election(ElectionCore::draft_example())
            .await
            .unwrap();
        let bob = store
            .insert_option(ElectionOptionCore::example2(election.id))
            .await
            .unwrap();
        let alice = store
            .insert_option(ElectionOptionCore::example1(election.id))
            .await
            .unwrap();
        let mut tie = ElectionOptionCore::example1(election.id);
        tie.title = "Abstain".to_string();
        let tie = store.insert_option(tie).await.unwrap();

        let ordered = store
            .options_for_election(election.id)
            .await
            .unwrap()
            .into_iter()
            .map(|option| option.id)
            .collect::<Vec<_>>();
        assert_eq!(ordered, [alice.id, tie.id, bob.id]);
        assert!(store.options_for_election(99).await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn second_vote_rejected_without_writing() {
        let store = MemoryStore::default();
        let (ballot, participation) = vote(1, 1, 1);
        store.commit_vote(ballot, participation).await.unwrap();

        let (ballot, participation) = vote(1, 1, 2);
        let err = store.commit_vote(ballot, participation).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyVoted(1)));
        assert_eq!(store.count_ballots(1).await.unwrap(), 1);
        assert_eq!(store.count_ballots_for_choice(1, 2).await.unwrap(), 0);
        assert_eq!(store.count_participation(1).await.unwrap(), 1);

        // The same participant may still vote elsewhere.
        let (ballot, participation) = vote(1, 2, 3);
        store.commit_vote(ballot, participation).await.unwrap();
        assert!(store.has_participated(1, 2).await.unwrap());
    }

    #[rocket::async_test]
    async fn counts() {
        let store = MemoryStore::default();
        for (participant, election, option) in [(1, 1, 1), (2, 1, 1), (3, 1, 2), (1, 2, 3)] {
            let (ballot, participation) = vote(participant, election, option);
            store.commit_vote(ballot, participation).await.unwrap();
        }
        assert_eq!(store.count_ballots(1).await.unwrap(), 3);
        assert_eq!(store.count_ballots_for_choice(1, 1).await.unwrap(), 2);
        assert_eq!(store.count_ballots_for_choice(2, 1).await.unwrap(), 0);
        assert_eq!(store.count_ballots_for_option(3).await.unwrap(), 1);
        assert_eq!(store.count_participation(1).await.unwrap(), 3);
        assert_eq!(store.count_participation(2).await.unwrap(), 1);
        assert!(!store.has_participated(2, 2).await.unwrap());
    }

    #[rocket::async_test]
    async fn delete_election_cascades() {
        let store = MemoryStore::default();
        let doomed = store
            .insert_election(ElectionCore::active_example())
            .await
            .unwrap();
        let kept = store
            .insert_election(ElectionCore::active_example())
            .await
            .unwrap();
        let doomed_option = store
            .insert_option(ElectionOptionCore::example1(doomed.id))
            .await
            .unwrap();
        let kept_option = store
            .insert_option(ElectionOptionCore::example1(kept.id))
            .await
            .unwrap();
        let (ballot, participation) = vote(1, doomed.id, doomed_option.id);
        store.commit_vote(ballot, participation).await.unwrap();
        let (ballot, participation) = vote(1, kept.id, kept_option.id);
        store.commit_vote(ballot, participation).await.unwrap();

        assert!(store.delete_election(doomed.id).await.unwrap());
        assert!(!store.delete_election(doomed.id).await.unwrap());

        assert!(store.election(doomed.id).await.unwrap().is_none());
        assert!(store.option(doomed_option.id).await.unwrap().is_none());
        assert_eq!(store.count_ballots(doomed.id).await.unwrap(), 0);
        assert!(!store.has_participated(1, doomed.id).await.unwrap());

        assert!(store.option(kept_option.id).await.unwrap().is_some());
        assert_eq!(store.count_ballots(kept.id).await.unwrap(), 1);
        assert!(store.has_participated(1, kept.id).await.unwrap());
    }

    #[rocket::async_test]
    async fn duplicate_email_rejected() {
        let store = MemoryStore::default();
        store
            .insert_participant(ParticipantCore::example_voter())
            .await
            .unwrap();
        let err = store
            .insert_participant(ParticipantCore::example_voter())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateResource(_)));
        assert_eq!(store.participants().await.unwrap().len(), 1);
    }

    #[rocket::async_test]
    async fn duplicate_pesel_rejected() {
        let store = MemoryStore::default();
        store
            .insert_participant(ParticipantCore::example_voter())
            .await
            .unwrap();
        let err = store
            .insert_participant(ParticipantCore {
                email: "impostor@example.com".to_string(),
                ..ParticipantCore::example_voter()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateResource(ref message) if message.contains("PESEL")));
        assert_eq!(store.participants().await.unwrap().len(), 1);

        // Any number of participants may go without one.
        for email in ["carol@example.com", "dave@example.com"] {
            store
                .insert_participant(ParticipantCore {
                    email: email.to_string(),
                    ..ParticipantCore::example_admin()
                })
                .await
                .unwrap();
        }
        assert_eq!(store.participants().await.unwrap().len(), 3);
    }

    #[rocket::async_test]
    async fn participant_activation() {
        let store = MemoryStore::default();
        assert!(!store.has_admin().await.unwrap());
        let admin = store
            .insert_participant(ParticipantCore::example_admin())
            .await
            .unwrap();
        assert!(store.has_admin().await.unwrap());

        let updated = store
            .set_participant_active(admin.id, false, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert!(!updated.active);
        assert!(!store.participant(admin.id).await.unwrap().unwrap().active);
        assert!(store
            .set_participant_active(42, true, Utc::now())
            .await
            .unwrap()
            .is_none());

        let found = store
            .participant_by_email("carol@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, admin.id);
    }
}
