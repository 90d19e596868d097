use rocket::{serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        api::vote::{VoteAcknowledgement, VoteRequest},
        auth::{AuthToken, Voter},
    },
    service::voting,
    store::Storage,
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote]
}

#[post("/votes/cast", data = "<vote>", format = "json")]
async fn cast_vote(
    token: AuthToken<Voter>,
    vote: Json<VoteRequest>,
    storage: Storage,
) -> Result<Json<VoteAcknowledgement>> {
    let principal = token.principal();
    if let Err(e) = voting::cast_vote(&*storage, &principal, vote.election_id, vote.option_id).await
    {
        warn!(
            "Rejected vote by participant {} in election {}: {e}",
            principal.participant_id, vote.election_id
        );
        return Err(e);
    }
    Ok(Json(VoteAcknowledgement::default()))
}
