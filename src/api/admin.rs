use rocket::{serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        api::participant::ParticipantDescription,
        auth::{Admin, AuthToken},
        common::ParticipantId,
    },
    service::accounts,
    store::Storage,
};

pub fn routes() -> Vec<Route> {
    routes![
        get_participants,
        get_participant,
        activate_participant,
        deactivate_participant,
    ]
}

#[get("/admin/participants")]
async fn get_participants(
    _token: AuthToken<Admin>,
    storage: Storage,
) -> Result<Json<Vec<ParticipantDescription>>> {
    Ok(Json(accounts::list_participants(&*storage).await?))
}

#[get("/admin/participants/<participant_id>")]
async fn get_participant(
    _token: AuthToken<Admin>,
    participant_id: ParticipantId,
    storage: Storage,
) -> Result<Json<ParticipantDescription>> {
    Ok(Json(
        accounts::get_participant(&*storage, participant_id).await?,
    ))
}

#[patch("/admin/participants/<participant_id>/activate")]
async fn activate_participant(
    _token: AuthToken<Admin>,
    participant_id: ParticipantId,
    storage: Storage,
) -> Result<Json<ParticipantDescription>> {
    Ok(Json(
        accounts::set_participant_active(&*storage, participant_id, true).await?,
    ))
}

#[patch("/admin/participants/<participant_id>/deactivate")]
async fn deactivate_participant(
    _token: AuthToken<Admin>,
    participant_id: ParticipantId,
    storage: Storage,
) -> Result<Json<ParticipantDescription>> {
    Ok(Json(
        accounts::set_participant_active(&*storage, participant_id, false).await?,
    ))
}
