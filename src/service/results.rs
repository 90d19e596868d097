//! Tallies and participation figures.
//!
//! Ballots and participation records are only ever counted separately. No query here joins
//! them, so the figures cannot reveal who chose what.

use crate::error::Result;
use crate::model::{
    api::results::{ElectionResults, ElectionStatistics, OptionResult, OptionVoteCount},
    common::{ElectionId, OptionId},
};
use crate::service::lifecycle::find_election;
use crate::store::Store;

/// Per-option tallies, listing every option including those nobody chose.
pub async fn election_results(
    store: &dyn Store,
    election_id: ElectionId,
) -> Result<ElectionResults> {
    let election = find_election(store, election_id).await?;
    let total_votes = store.count_ballots(election_id).await?;

    let mut option_results = Vec::new();
    for option in store.options_for_election(election_id).await? {
        let vote_count = store
            .count_ballots_for_choice(election_id, option.id)
            .await?;
        option_results.push(OptionResult {
            option_id: option.id,
            title: option.option.title,
            description: option.option.description,
            vote_count,
        });
    }

    Ok(ElectionResults {
        election_id,
        name: election.election.name,
        description: election.election.description,
        status: election.election.status,
        total_votes,
        option_results,
    })
}

/// Ballots cast as a percentage of participants, or zero if nobody has participated.
pub fn participation_rate(total_votes: u64, total_participants: u64) -> f64 {
    if total_participants == 0 {
        0.0
    } else {
        total_votes as f64 * 100.0 / total_participants as f64
    }
}

pub async fn election_statistics(
    store: &dyn Store,
    election_id: ElectionId,
) -> Result<ElectionStatistics> {
    let election = find_election(store, election_id).await?;
    let total_votes = store.count_ballots(election_id).await?;
    let total_participants = store.count_participation(election_id).await?;
    let total_options = store.options_for_election(election_id).await?.len() as u64;

    Ok(ElectionStatistics {
        election_id,
        name: election.election.name,
        status: election.election.status,
        total_votes,
        total_participants,
        total_options,
        participation_rate: participation_rate(total_votes, total_participants),
        start_time: election.election.start_time,
        end_time: election.election.end_time,
    })
}

/// Ballots cast for a single option. An unknown option simply has no ballots.
pub async fn option_vote_count(store: &dyn Store, option_id: OptionId) -> Result<OptionVoteCount> {
    Ok(OptionVoteCount {
        option_id,
        vote_count: store.count_ballots_for_option(option_id).await?,
    })
}
