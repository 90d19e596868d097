//! Casting votes.
//!
//! A vote is split into two unlinked rows: an anonymous ballot carrying the chosen option, and a
//! participation record carrying who voted. Both are written together by
//! [`Store::commit_vote`], and nothing stored ever joins them back up.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{
    auth::Principal,
    common::{ElectionId, OptionId},
    db::{NewBallot, NewParticipation},
};
use crate::store::Store;

/// Cast a vote for `option_id` in `election_id` on behalf of `principal`.
pub async fn cast_vote(
    store: &dyn Store,
    principal: &Principal,
    election_id: ElectionId,
    option_id: OptionId,
) -> Result<()> {
    cast_vote_at(store, principal, election_id, option_id, Utc::now()).await
}

/// Cast a vote as though the current time were `now`.
///
/// Preconditions are checked in a fixed order, failing on the first that does not hold.
pub async fn cast_vote_at(
    store: &dyn Store,
    principal: &Principal,
    election_id: ElectionId,
    option_id: OptionId,
    now: DateTime<Utc>,
) -> Result<()> {
    let participant_id = principal.participant_id;

    match store.participant(participant_id).await? {
        Some(participant) if participant.active => {}
        _ => {
            return Err(Error::not_found(format!(
                "Participant with ID '{participant_id}'"
            )))
        }
    }

    let election = store
        .election(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))?;

    if !election.is_active_at(now) {
        return Err(Error::ElectionNotActive(election_id));
    }

    // Fast path only; the store's uniqueness constraint is what actually decides a race.
    if store.has_participated(participant_id, election_id).await? {
        return Err(Error::AlreadyVoted(election_id));
    }

    let option = store
        .option(option_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Option with ID '{option_id}'")))?;

    if option.election_id != election_id {
        return Err(Error::invalid_argument(format!(
            "Option {option_id} does not belong to election {election_id}"
        )));
    }

    store
        .commit_vote(
            NewBallot {
                election_id,
                option_id,
            },
            NewParticipation {
                participant_id,
                election_id,
                voted_at: now,
            },
        )
        .await?;

    // Deliberately omits the option.
    info!("Participant {participant_id} voted in election {election_id}");
    Ok(())
}
