use crate::model::common::{participant::Role, ParticipantId};

/// An authenticated participant, as handed to the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub participant_id: ParticipantId,
    pub role: Role,
}

impl Principal {
    pub fn new(participant_id: ParticipantId, role: Role) -> Self {
        Self {
            participant_id,
            role,
        }
    }
}
