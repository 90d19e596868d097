use rocket::{http::Status, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::election::{ElectionDescription, ElectionSpec, OptionDescription, OptionSpec},
        auth::{Admin, AuthToken},
        common::{election::ElectionStatus, ElectionId},
    },
    service::lifecycle,
    store::Storage,
};

pub fn routes() -> Vec<Route> {
    routes![
        get_elections,
        get_election,
        create_election,
        add_option,
        set_status,
        delete_election,
    ]
}

#[get("/elections")]
async fn get_elections(storage: Storage) -> Result<Json<Vec<ElectionDescription>>> {
    Ok(Json(lifecycle::list_elections(&*storage).await?))
}

#[get("/elections/<election_id>")]
async fn get_election(
    election_id: ElectionId,
    storage: Storage,
) -> Result<Json<ElectionDescription>> {
    Ok(Json(lifecycle::get_election(&*storage, election_id).await?))
}

#[post("/elections", data = "<spec>", format = "json")]
async fn create_election(
    _token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    storage: Storage,
) -> Result<(Status, Json<ElectionDescription>)> {
    let election = lifecycle::create_election(&*storage, spec.0).await?;
    Ok((Status::Created, Json(election)))
}

#[post("/elections/<election_id>/options", data = "<spec>", format = "json")]
async fn add_option(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    spec: Json<OptionSpec>,
    storage: Storage,
) -> Result<(Status, Json<OptionDescription>)> {
    let option = lifecycle::add_option(&*storage, election_id, spec.0).await?;
    Ok((Status::Created, Json(option)))
}

#[patch("/elections/<election_id>/status?<status>")]
async fn set_status(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    status: Option<&str>,
    storage: Storage,
) -> Result<Json<ElectionDescription>> {
    let status = status
        .ok_or_else(|| Error::invalid_argument("Missing `status` query parameter"))?
        .parse::<ElectionStatus>()?;
    Ok(Json(
        lifecycle::set_election_status(&*storage, election_id, status).await?,
    ))
}

#[delete("/elections/<election_id>")]
async fn delete_election(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    storage: Storage,
) -> Result<Status> {
    lifecycle::delete_election(&*storage, election_id).await?;
    Ok(Status::NoContent)
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use super::*;
    use crate::error::ErrorBody;
    use crate::model::db::{ElectionCore, ElectionOptionCore};

    #[backend_test]
    async fn list_and_get_are_public(client: Client, storage: Storage) {
        let election = storage
            .insert_election(ElectionCore::active_example())
            .await
            .unwrap();
        storage
            .insert_option(ElectionOptionCore::example2(election.id))
            .await
            .unwrap();
        storage
            .insert_option(ElectionOptionCore::example1(election.id))
            .await
            .unwrap();

        let response = client.get(uri!(get_elections)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let elections = response
            .into_json::<Vec<ElectionDescription>>()
            .await
            .unwrap();
        assert_eq!(elections.len(), 1);

        let response = client
            .get(uri!(get_election(election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let description = response.into_json::<ElectionDescription>().await.unwrap();
        assert!(description.active);
        let titles = description
            .options
            .iter()
            .map(|option| option.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, ["Alice", "Bob"]);
    }

    #[backend_test]
    async fn get_missing_election(client: Client) {
        let response = client.get(uri!(get_election(404))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let body = response.into_json::<ErrorBody>().await.unwrap();
        assert_eq!(body.message, "Election with ID '404'");
    }

    #[backend_test(admin)]
    async fn create_and_populate(client: Client) {
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .body(json!(ElectionSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let election = response.into_json::<ElectionDescription>().await.unwrap();
        assert_eq!(election.status, ElectionStatus::Draft);

        for spec in [OptionSpec::example1(), OptionSpec::example2()] {
            let response = client
                .post(uri!(add_option(election.id)))
                .header(ContentType::JSON)
                .body(json!(spec).to_string())
                .dispatch()
                .await;
            assert_eq!(Status::Created, response.status());
        }

        let response = client
            .patch(format!("/elections/{}/status?status=active", election.id))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let election = response.into_json::<ElectionDescription>().await.unwrap();
        assert_eq!(election.status, ElectionStatus::Active);
        assert!(election.active);
        assert_eq!(election.options.len(), 2);

        // No more options once active.
        let response = client
            .post(uri!(add_option(election.id)))
            .header(ContentType::JSON)
            .body(json!(OptionSpec::example1()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn invalid_election_spec(client: Client) {
        let example = ElectionSpec::example();
        let spec = ElectionSpec {
            start_time: example.end_time,
            end_time: example.start_time,
            ..example
        };
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn malformed_status(client: Client, storage: Storage) {
        let election = storage
            .insert_election(ElectionCore::draft_example())
            .await
            .unwrap();
        let response = client
            .patch(format!("/elections/{}/status?status=published", election.id))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .patch(format!("/elections/{}/status", election.id))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        let body = response.into_json::<ErrorBody>().await.unwrap();
        assert!(body.message.contains("status"));

        let stored = storage.election(election.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ElectionStatus::Draft);
    }

    #[backend_test(admin)]
    async fn delete_cascades(client: Client, storage: Storage) {
        let election = storage
            .insert_election(ElectionCore::draft_example())
            .await
            .unwrap();
        let option = storage
            .insert_option(ElectionOptionCore::example1(election.id))
            .await
            .unwrap();

        let response = client
            .delete(uri!(delete_election(election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::NoContent, response.status());
        assert!(storage.option(option.id).await.unwrap().is_none());

        let response = client
            .delete(uri!(delete_election(election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(voter)]
    async fn voters_cannot_administer(client: Client, storage: Storage) {
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .body(json!(ElectionSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
        assert!(storage.elections().await.unwrap().is_empty());
    }

    #[backend_test]
    async fn anonymous_cannot_administer(client: Client) {
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .body(json!(ElectionSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}
