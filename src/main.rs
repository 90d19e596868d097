use log::{error, info};
use rocket::Error as RocketError;
use thiserror::Error;

/// Errors that are critical to the entire server.
#[derive(Debug, Error)]
enum Error {
    #[error(transparent)]
    Rocket(#[from] RocketError),
    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}

async fn run() -> Result<(), Error> {
    info!("Configuring server...");
    let rocket = secret_ballot_backend::build().ignite().await?;
    info!("...server configured!");
    let _ = rocket.launch().await?;
    Ok(())
}

fn init_logging() -> Result<(), Error> {
    log4rs::init_file("log4rs.yaml", Default::default()).map_err(|e| Error::Logging(e.to_string()))
}

#[rocket::main]
async fn main() {
    // Set up logging.
    if let Err(err) = init_logging() {
        eprintln!("{err}");
        std::process::exit(1)
    }
    info!("Initialised logging");

    // Launch server.
    if let Err(err) = run().await {
        error!("{err}");
        error!("Critical failure, shutting down");
        std::process::exit(1)
    }
}
