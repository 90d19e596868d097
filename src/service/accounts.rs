//! Participant accounts: registration, login, and administration.

use chrono::Utc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::participant::{hash_password, Credentials, ParticipantDescription, Registration},
    common::{participant::Role, ParticipantId},
    db::{NewParticipant, Participant},
};
use crate::store::Store;

/// Register a new voter account.
pub async fn register(store: &dyn Store, registration: Registration) -> Result<Participant> {
    let participant = store
        .insert_participant(registration.into_participant(Role::Voter)?)
        .await?;
    info!("Registered participant {}", participant.id);
    Ok(participant)
}

/// Check a participant's credentials.
///
/// Unknown emails, wrong passwords and deactivated accounts are indistinguishable to the caller.
pub async fn authenticate(store: &dyn Store, credentials: &Credentials) -> Result<Participant> {
    let email = credentials.email.trim().to_lowercase();
    match store.participant_by_email(&email).await? {
        Some(participant)
            if participant.active && participant.verify_password(&credentials.password) =>
        {
            Ok(participant)
        }
        _ => Err(Error::Unauthorized("Invalid email or password".to_string())),
    }
}

pub async fn list_participants(store: &dyn Store) -> Result<Vec<ParticipantDescription>> {
    Ok(store
        .participants()
        .await?
        .into_iter()
        .map(Into::into)
        .collect())
}

pub async fn get_participant(
    store: &dyn Store,
    id: ParticipantId,
) -> Result<ParticipantDescription> {
    store
        .participant(id)
        .await?
        .map(Into::into)
        .ok_or_else(|| Error::not_found(format!("Participant with ID '{id}'")))
}

/// Enable or disable a participant's account.
pub async fn set_participant_active(
    store: &dyn Store,
    id: ParticipantId,
    active: bool,
) -> Result<ParticipantDescription> {
    let participant = store
        .set_participant_active(id, active, Utc::now())
        .await?
        .ok_or_else(|| Error::not_found(format!("Participant with ID '{id}'")))?;
    info!(
        "Participant {id} {}",
        if active { "activated" } else { "deactivated" }
    );
    Ok(participant.into())
}

/// Ensure there is at least one admin account, creating the configured one if not.
pub async fn ensure_admin_exists(store: &dyn Store, config: &Config) -> Result<()> {
    if store.has_admin().await? {
        return Ok(());
    }

    let now = Utc::now();
    let admin = NewParticipant {
        email: config.admin_email().trim().to_lowercase(),
        password_hash: hash_password(config.admin_password())?,
        first_name: "Default".to_string(),
        last_name: "Administrator".to_string(),
        pesel: None,
        role: Role::Admin,
        active: true,
        created_at: now,
        updated_at: now,
    };
    let admin = store.insert_participant(admin).await?;
    warn!(
        "No admin account existed, created {} from configuration",
        admin.email
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[rocket::async_test]
    async fn register_then_authenticate() {
        let store = MemoryStore::default();
        let registration = Registration::example1();
        let credentials = registration.credentials();
        let registered = register(&store, registration).await.unwrap();
        assert_eq!(registered.role, Role::Voter);

        let authenticated = authenticate(&store, &credentials).await.unwrap();
        assert_eq!(authenticated.id, registered.id);

        // Email matching ignores case.
        let shouty = Credentials {
            email: credentials.email.to_uppercase(),
            ..credentials
        };
        assert!(authenticate(&store, &shouty).await.is_ok());
    }

    #[rocket::async_test]
    async fn duplicate_registration() {
        let store = MemoryStore::default();
        register(&store, Registration::example1()).await.unwrap();
        let err = register(&store, Registration::example1())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateResource(_)));
    }

    #[rocket::async_test]
    async fn duplicate_pesel_registration() {
        let store = MemoryStore::default();
        register(&store, Registration::example1()).await.unwrap();
        let impostor = Registration {
            email: "impostor@example.com".into(),
            ..Registration::example1()
        };
        let err = register(&store, impostor).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateResource(_)));
        assert_eq!(list_participants(&store).await.unwrap().len(), 1);
    }

    #[rocket::async_test]
    async fn bad_credentials() {
        let store = MemoryStore::default();
        let registration = Registration::example1();
        let credentials = registration.credentials();
        register(&store, registration).await.unwrap();

        let wrong_password = Credentials {
            password: "not the password".to_string(),
            ..credentials.clone()
        };
        assert!(matches!(
            authenticate(&store, &wrong_password).await,
            Err(Error::Unauthorized(_))
        ));

        let unknown = Registration::example2().credentials();
        assert!(matches!(
            authenticate(&store, &unknown).await,
            Err(Error::Unauthorized(_))
        ));
    }

    #[rocket::async_test]
    async fn deactivated_cannot_authenticate() {
        let store = MemoryStore::default();
        let registration = Registration::example1();
        let credentials = registration.credentials();
        let participant = register(&store, registration).await.unwrap();

        let description = set_participant_active(&store, participant.id, false)
            .await
            .unwrap();
        assert!(!description.active);
        assert!(matches!(
            authenticate(&store, &credentials).await,
            Err(Error::Unauthorized(_))
        ));

        set_participant_active(&store, participant.id, true)
            .await
            .unwrap();
        assert!(authenticate(&store, &credentials).await.is_ok());
    }

    #[rocket::async_test]
    async fn participant_lookup() {
        let store = MemoryStore::default();
        let alice = register(&store, Registration::example1()).await.unwrap();
        register(&store, Registration::example2()).await.unwrap();

        assert_eq!(list_participants(&store).await.unwrap().len(), 2);
        assert_eq!(
            get_participant(&store, alice.id).await.unwrap().email,
            "alice@example.com"
        );
        assert!(matches!(
            get_participant(&store, 99).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            set_participant_active(&store, 99, false).await,
            Err(Error::NotFound(_))
        ));
    }

    #[rocket::async_test]
    async fn admin_bootstrap_is_idempotent() {
        let store = MemoryStore::default();
        let config = Config::example();
        ensure_admin_exists(&store, &config).await.unwrap();
        ensure_admin_exists(&store, &config).await.unwrap();

        let participants = store.participants().await.unwrap();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].role, Role::Admin);

        let credentials = Credentials {
            email: config.admin_email().to_string(),
            password: config.admin_password().to_string(),
        };
        assert!(authenticate(&store, &credentials).await.is_ok());
    }
}
