use rocket::{serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        api::results::{ElectionResults, ElectionStatistics, OptionVoteCount},
        auth::{Admin, AuthToken, Voter},
        common::{ElectionId, OptionId},
    },
    service::results,
    store::Storage,
};

pub fn routes() -> Vec<Route> {
    routes![election_results, election_statistics, option_vote_count]
}

#[get("/results/elections/<election_id>")]
async fn election_results(
    _token: AuthToken<Voter>,
    election_id: ElectionId,
    storage: Storage,
) -> Result<Json<ElectionResults>> {
    Ok(Json(results::election_results(&*storage, election_id).await?))
}

#[get("/results/elections/<election_id>/statistics")]
async fn election_statistics(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    storage: Storage,
) -> Result<Json<ElectionStatistics>> {
    Ok(Json(
        results::election_statistics(&*storage, election_id).await?,
    ))
}

#[get("/results/options/<option_id>/count")]
async fn option_vote_count(
    _token: AuthToken<Voter>,
    option_id: OptionId,
    storage: Storage,
) -> Result<Json<OptionVoteCount>> {
    Ok(Json(results::option_vote_count(&*storage, option_id).await?))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rocket::{http::Status, local::asynchronous::Client};

    use super::*;
    use crate::model::db::{BallotCore, ElectionCore, ElectionOptionCore, NewParticipation};

    /// An active election with two options and one vote for the first.
    async fn populate(storage: &Storage) -> (ElectionId, OptionId, OptionId) {
        let election = storage
            .insert_election(ElectionCore::active_example())
            .await
            .unwrap();
        let alice = storage
            .insert_option(ElectionOptionCore::example1(election.id))
            .await
            .unwrap();
        let bob = storage
            .insert_option(ElectionOptionCore::example2(election.id))
            .await
            .unwrap();
        storage
            .commit_vote(
                BallotCore {
                    election_id: election.id,
                    option_id: alice.id,
                },
                NewParticipation {
                    participant_id: 1,
                    election_id: election.id,
                    voted_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        (election.id, alice.id, bob.id)
    }

    #[backend_test(voter)]
    async fn voters_see_results(client: Client, storage: Storage) {
        let (election_id, alice, bob) = populate(&storage).await;

        let response = client
            .get(uri!(election_results(election_id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let results = response.into_json::<ElectionResults>().await.unwrap();
        assert_eq!(results.total_votes, 1);
        let counts = results
            .option_results
            .iter()
            .map(|result| (result.option_id, result.vote_count))
            .collect::<Vec<_>>();
        assert_eq!(counts, [(alice, 1), (bob, 0)]);

        let response = client
            .get(uri!(option_vote_count(alice)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let count = response.into_json::<OptionVoteCount>().await.unwrap();
        assert_eq!(count.vote_count, 1);
    }

    #[backend_test(voter)]
    async fn voters_cannot_see_statistics(client: Client, storage: Storage) {
        let (election_id, _, _) = populate(&storage).await;
        let response = client
            .get(uri!(election_statistics(election_id)))
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
    }

    #[backend_test(admin)]
    async fn admins_see_statistics(client: Client, storage: Storage) {
        let (election_id, _, _) = populate(&storage).await;
        let response = client
            .get(uri!(election_statistics(election_id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let stats = response.into_json::<ElectionStatistics>().await.unwrap();
        assert_eq!(stats.total_votes, 1);
        assert_eq!(stats.total_participants, 1);
        assert_eq!(stats.total_options, 2);
        assert_eq!(stats.participation_rate, 100.0);
    }

    #[backend_test(voter)]
    async fn results_for_missing_election(client: Client) {
        let response = client.get(uri!(election_results(77))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn results_require_login(client: Client, storage: Storage) {
        let (election_id, _, _) = populate(&storage).await;
        let response = client
            .get(uri!(election_results(election_id)))
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}
