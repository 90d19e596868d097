use chrono::Duration;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::error::Error;
use crate::service::accounts::ensure_admin_exists;
use crate::store::{MongoStore, Storage, StorageKind};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    admin_email: String,
    // secrets
    jwt_secret: String,
    admin_password: String,
}

impl Config {
    /// Valid lifetime of auth tokens in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Email of the admin account created when none exists.
    pub fn admin_email(&self) -> &str {
        &self.admin_email
    }

    /// Initial password of the admin account created when none exists.
    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

fn default_db_name() -> String {
    "ballot_box".to_string()
}

/// Configuration for the storage backend.
#[derive(Deserialize)]
struct StorageConfig {
    // non-secrets
    #[serde(default)]
    storage: StorageKind,
    #[serde(default = "default_db_name")]
    db_name: String,
    // secrets
    db_uri: Option<String>,
}

/// A fairing that sets up the configured storage backend, places it into managed state, and
/// makes sure an admin account exists.
///
/// If a [`Storage`] is already managed, that one is used as-is. Must be attached after
/// [`ConfigFairing`].
pub struct StorageFairing;

#[rocket::async_trait]
impl Fairing for StorageFairing {
    fn info(&self) -> Info {
        Info {
            name: "Storage",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let managed = rocket.state::<Storage>().cloned();
        let storage = match managed {
            Some(storage) => storage,
            None => {
                let connected = connect(&rocket).await;
                let Some(storage) = connected else {
                    return Err(rocket);
                };
                rocket = rocket.manage(storage.clone());
                storage
            }
        };

        let result = match rocket.state::<Config>() {
            Some(config) => ensure_admin_exists(&*storage, config).await,
            None => Err(Error::unexpected(
                "Storage set up before application config was loaded",
            )),
        };
        if let Err(e) = result {
            error!("Failed to create admin account: {e}");
            return Err(rocket);
        }

        Ok(rocket)
    }
}

/// Load the storage config and build the backend it names.
async fn connect(rocket: &Rocket<Build>) -> Option<Storage> {
    let config = match rocket.figment().extract::<StorageConfig>() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load storage config");
            rocket::config::pretty_print_error(e);
            return None;
        }
    };

    match config.storage {
        StorageKind::Memory => {
            warn!("Using in-memory storage, nothing will survive a restart");
            Some(Storage::memory())
        }
        StorageKind::Mongodb => {
            let Some(db_uri) = config.db_uri else {
                error!("`db_uri` must be set to use MongoDB storage");
                return None;
            };
            info!("Loaded database config, connecting...");
            match MongoStore::connect(&db_uri, &config.db_name).await {
                Ok(store) => {
                    info!("...database connection online!");
                    Some(Storage::new(store))
                }
                Err(e) => {
                    error!("Failed to connect to database: {e}");
                    None
                }
            }
        }
    }
}
