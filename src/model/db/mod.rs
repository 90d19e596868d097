//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in a DB-friendly way, e.g.:
//!
//! - IDs are stored under MongoDB's `_id` key.
//! - Datetimes are serialised in MongoDB's own format.

mod ballot;
pub use ballot::{Ballot, BallotCore, NewBallot};

mod election;
pub use election::{Election, ElectionCore, NewElection};

mod option;
pub use option::{ElectionOption, ElectionOptionCore, NewElectionOption};

mod participant;
pub use participant::{NewParticipant, Participant, ParticipantCore};

mod participation;
pub use participation::{NewParticipation, ParticipationCore, ParticipationRecord};
