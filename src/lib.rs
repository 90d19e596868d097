#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use config::Config;

/// Build the server with configuration from `Rocket.toml` and the environment.
pub fn build() -> Rocket<Build> {
    rocket_with(rocket::build())
}

/// Mount everything onto the given base instance.
fn rocket_with(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/", api::routes())
        .register("/", api::catchers())
        .attach(logging::LoggerFairing)
        .attach(config::ConfigFairing)
        .attach(config::StorageFairing)
}

#[cfg(test)]
pub(crate) const TEST_ADMIN_EMAIL: &str = "returning.officer@example.com";

#[cfg(test)]
pub(crate) const TEST_ADMIN_PASSWORD: &str = "count every vote";

/// A server for tests, using the given storage and fixed settings.
#[cfg(test)]
pub(crate) fn rocket_for_storage(storage: store::Storage) -> Rocket<Build> {
    log4rs_test_utils::test_logging::init_logging_once_for(
        ["secret_ballot_backend"],
        None,
        None,
    );

    let figment = rocket::Config::figment()
        .merge(("jwt_secret", "a test secret that is long enough"))
        .merge(("auth_ttl", 3600))
        .merge(("admin_email", TEST_ADMIN_EMAIL))
        .merge(("admin_password", TEST_ADMIN_PASSWORD))
        .merge(("log_level", "off"));
    rocket_with(rocket::custom(figment)).manage(storage)
}

/// A fresh MongoDB-backed store in a randomly named database.
///
/// Connects to `MONGODB_URI`, or a local server if unset.
#[cfg(test)]
pub(crate) async fn test_mongo_storage() -> (store::Storage, mongodb::Database) {
    let uri =
        std::env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let db_name = format!("test{}", rand::random::<u32>());
    info!("Using database {db_name}");
    let store = store::MongoStore::connect(&uri, &db_name).await.unwrap();
    let db = store.database().clone();
    (store::Storage::new(store), db)
}
