use serde::{Deserialize, Serialize};

use crate::model::common::{ElectionId, OptionId};

/// A request to cast a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub election_id: ElectionId,
    pub option_id: OptionId,
}

/// Acknowledgement of a successfully cast vote.
///
/// Deliberately carries nothing that could link the ballot back to the voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteAcknowledgement {
    pub message: String,
}

impl Default for VoteAcknowledgement {
    fn default() -> Self {
        Self {
            message: "Vote cast successfully.".to_string(),
        }
    }
}
