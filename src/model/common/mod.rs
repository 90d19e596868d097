//! Types shared between the database and API representations.

pub mod election;
pub mod participant;

/// Our election IDs are auto-incremented integers.
pub type ElectionId = u32;
/// Our option IDs are auto-incremented integers.
pub type OptionId = u32;
/// Our participant IDs are auto-incremented integers.
pub type ParticipantId = u32;
/// Our participation record IDs are auto-incremented integers.
pub type RecordId = u32;
/// Ballot IDs are random, so they reveal nothing about the order ballots were cast in.
pub type BallotId = u64;

/// Generate a fresh random ballot ID.
///
/// The top bit is always clear so the ID survives a round trip through BSON's signed 64-bit
/// integers.
pub fn random_ballot_id() -> BallotId {
    rand::random::<BallotId>() & (i64::MAX as BallotId)
}
