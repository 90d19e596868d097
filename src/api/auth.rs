use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::Result,
    model::{
        api::participant::{AuthResponse, Credentials, Registration},
        auth::{AuthToken, Voter, AUTH_TOKEN_COOKIE},
        db::Participant,
    },
    service::accounts,
    store::Storage,
};

pub fn routes() -> Vec<Route> {
    routes![register, login, logout]
}

/// Issue a token for the participant, set it as a cookie, and describe it in the body.
fn issue(
    participant: Participant,
    cookies: &CookieJar<'_>,
    config: &Config,
) -> Result<AuthResponse> {
    let jwt = AuthToken::<Voter>::new(&participant).encode(config)?;
    cookies.add(AuthToken::<Voter>::cookie(jwt.clone(), config));
    Ok(AuthResponse::new(jwt, participant))
}

#[post("/auth/register", data = "<registration>", format = "json")]
pub async fn register(
    registration: Json<Registration>,
    cookies: &CookieJar<'_>,
    storage: Storage,
    config: &State<Config>,
) -> Result<(Status, Json<AuthResponse>)> {
    let participant = accounts::register(&*storage, registration.0).await?;
    Ok((Status::Created, Json(issue(participant, cookies, config)?)))
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    credentials: Json<Credentials>,
    cookies: &CookieJar<'_>,
    storage: Storage,
    config: &State<Config>,
) -> Result<Json<AuthResponse>> {
    let participant = accounts::authenticate(&*storage, &credentials).await?;
    Ok(Json(issue(participant, cookies, config)?))
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
