use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::error::ErrorBody;

mod admin;
pub(crate) mod auth;
mod elections;
mod results;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(elections::routes());
    routes.extend(voting::routes());
    routes.extend(results::routes());
    routes.extend(admin::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Turn any error status without a body of its own, e.g. a failed request guard, into JSON.
#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> (Status, Json<ErrorBody>) {
    let message = match status.code {
        400 => "The request was malformed",
        401 => "Authentication required",
        403 => "You do not have permission to do this",
        404 => "No such resource",
        409 => "The request conflicts with existing data",
        422 => "The request body could not be understood",
        500 => "An unexpected error occurred",
        _ => status.reason_lossy(),
    };
    (status, Json(ErrorBody::new(status, message)))
}
