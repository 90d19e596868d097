//! Creating elections, attaching options, and moving elections through their lifecycle.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::model::{
    api::election::{ElectionDescription, ElectionSpec, OptionDescription, OptionSpec},
    common::{election::ElectionStatus, ElectionId},
    db::{Election, NewElection},
};
use crate::store::Store;

/// Fetch an election or fail with [`Error::NotFound`].
pub(crate) async fn find_election(store: &dyn Store, id: ElectionId) -> Result<Election> {
    store
        .election(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{id}'")))
}

async fn describe(store: &dyn Store, election: Election) -> Result<ElectionDescription> {
    let options = store.options_for_election(election.id).await?;
    Ok(ElectionDescription::new(election, options))
}

/// Create a new election in the DRAFT state.
pub async fn create_election(store: &dyn Store, spec: ElectionSpec) -> Result<ElectionDescription> {
    let election = store.insert_election(NewElection::try_from(spec)?).await?;
    info!("Created election {} '{}'", election.id, election.name);
    Ok(ElectionDescription::new(election, Vec::new()))
}

/// All elections with their options.
pub async fn list_elections(store: &dyn Store) -> Result<Vec<ElectionDescription>> {
    let mut descriptions = Vec::new();
    for election in store.elections().await? {
        descriptions.push(describe(store, election).await?);
    }
    Ok(descriptions)
}

pub async fn get_election(store: &dyn Store, id: ElectionId) -> Result<ElectionDescription> {
    let election = find_election(store, id).await?;
    describe(store, election).await
}

/// Attach a new option to an election that is still a draft.
pub async fn add_option(
    store: &dyn Store,
    election_id: ElectionId,
    spec: OptionSpec,
) -> Result<OptionDescription> {
    let election = find_election(store, election_id).await?;
    if !election.can_be_modified() {
        return Err(Error::invalid_argument(format!(
            "Options can only be added to {} elections, election {election_id} is {}",
            ElectionStatus::Draft,
            election.status
        )));
    }
    let option = store.insert_option(spec.into_option(election_id)?).await?;
    info!("Added option {} to election {election_id}", option.id);
    Ok(option.into())
}

/// Move an election to any status.
///
/// No transition graph is enforced, and nothing here or elsewhere closes an election when its
/// voting window ends.
pub async fn set_election_status(
    store: &dyn Store,
    id: ElectionId,
    status: ElectionStatus,
) -> Result<ElectionDescription> {
    let previous = find_election(store, id).await?.status;
    let election = store
        .update_election_status(id, status, Utc::now())
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{id}'")))?;
    info!("Election {id} status {previous} -> {status}");
    describe(store, election).await
}

/// Delete an election together with its options, ballots and participation records.
pub async fn delete_election(store: &dyn Store, id: ElectionId) -> Result<()> {
    if !store.delete_election(id).await? {
        return Err(Error::not_found(format!("Election with ID '{id}'")));
    }
    warn!("Deleted election {id} and everything recorded against it");
    Ok(())
}
