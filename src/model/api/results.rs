use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::{election::ElectionStatus, ElectionId, OptionId};

/// The tally for a single option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionResult {
    pub option_id: OptionId,
    pub title: String,
    pub description: Option<String>,
    pub vote_count: u64,
}

/// Per-option tallies for an election, in display order.
///
/// Every option is listed, including those with no votes, and the option counts always sum
/// to `total_votes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub election_id: ElectionId,
    pub name: String,
    pub description: Option<String>,
    pub status: ElectionStatus,
    pub total_votes: u64,
    pub option_results: Vec<OptionResult>,
}

/// Aggregate participation figures for an election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionStatistics {
    pub election_id: ElectionId,
    pub name: String,
    pub status: ElectionStatus,
    pub total_votes: u64,
    pub total_participants: u64,
    pub total_options: u64,
    /// Ballots per participant as a percentage; zero when nobody has participated.
    pub participation_rate: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// The number of ballots cast for one option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionVoteCount {
    pub option_id: OptionId,
    pub vote_count: u64,
}
