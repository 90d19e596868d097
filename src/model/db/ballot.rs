use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::model::common::{random_ballot_id, BallotId, ElectionId, OptionId};

/// A recorded choice, as stored in the database.
///
/// A ballot deliberately carries nothing that identifies who cast it or when: only the
/// election and the chosen option. Together with random ballot IDs this keeps ballots
/// uncorrelatable with participation records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotCore {
    pub election_id: ElectionId,
    pub option_id: OptionId,
}

/// A ballot without an ID.
pub type NewBallot = BallotCore;

/// A ballot from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(rename = "_id")]
    pub id: BallotId,
    #[serde(flatten)]
    pub ballot: BallotCore,
}

impl Ballot {
    /// Assign a fresh random ID to a new ballot.
    pub fn new(ballot: NewBallot) -> Self {
        Self {
            id: random_ballot_id(),
            ballot,
        }
    }
}

impl Deref for Ballot {
    type Target = BallotCore;

    fn deref(&self) -> &Self::Target {
        &self.ballot
    }
}
