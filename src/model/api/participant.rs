use argon2::Config;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{participant::Role, ParticipantId},
    db::{NewParticipant, Participant},
};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 255;
pub const MAX_EMAIL_LENGTH: usize = 255;
pub const MAX_PERSONAL_NAME_LENGTH: usize = 100;
pub const PESEL_LENGTH: usize = 11;

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    // 16 bytes is the recommended salt length for Argon2.
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    Ok(argon2::hash_encoded(
        password.as_bytes(),
        &salt,
        &Config::default(),
    )?)
}

/// Raw registration details, received from a new participant. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub pesel: Option<String>,
}

/// Check a first or last name is present and not too long.
fn validate_personal_name(name: &str, which: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid_argument(format!("{which} is required")));
    }
    if name.chars().count() > MAX_PERSONAL_NAME_LENGTH {
        return Err(Error::invalid_argument(format!(
            "{which} must not exceed {MAX_PERSONAL_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_string())
}

/// Check an optional PESEL has exactly the right length. A blank one counts as absent.
fn validate_pesel(pesel: Option<String>) -> Result<Option<String>> {
    let Some(pesel) = pesel.map(|pesel| pesel.trim().to_string()) else {
        return Ok(None);
    };
    if pesel.is_empty() {
        return Ok(None);
    }
    if pesel.chars().count() != PESEL_LENGTH {
        return Err(Error::invalid_argument(format!(
            "PESEL must be exactly {PESEL_LENGTH} characters"
        )));
    }
    Ok(Some(pesel))
}

impl Registration {
    /// Validate the details and hash the password, giving an account with the given role.
    pub fn into_participant(self, role: Role) -> Result<NewParticipant> {
        let email = self.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::invalid_argument("A valid email address is required"));
        }
        if email.chars().count() > MAX_EMAIL_LENGTH {
            return Err(Error::invalid_argument(format!(
                "Email must not exceed {MAX_EMAIL_LENGTH} characters"
            )));
        }
        let password_length = self.password.chars().count();
        if password_length < MIN_PASSWORD_LENGTH {
            return Err(Error::invalid_argument(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        if password_length > MAX_PASSWORD_LENGTH {
            return Err(Error::invalid_argument(format!(
                "Password must not exceed {MAX_PASSWORD_LENGTH} characters"
            )));
        }
        let first_name = validate_personal_name(&self.first_name, "First name")?;
        let last_name = validate_personal_name(&self.last_name, "Last name")?;
        let pesel = validate_pesel(self.pesel)?;

        let now = Utc::now();
        Ok(NewParticipant {
            email,
            password_hash: hash_password(&self.password)?,
            first_name,
            last_name,
            pesel,
            role,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Login credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// What a participant receives after logging in or registering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token_type: String,
    pub token: String,
    pub id: ParticipantId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl AuthResponse {
    pub fn new(token: String, participant: Participant) -> Self {
        Self {
            token_type: "Bearer".to_string(),
            token,
            id: participant.id,
            email: participant.participant.email,
            first_name: participant.participant.first_name,
            last_name: participant.participant.last_name,
            role: participant.participant.role,
        }
    }
}

/// An API-friendly participant description, without the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantDescription {
    pub id: ParticipantId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub pesel: Option<String>,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Participant> for ParticipantDescription {
    fn from(participant: Participant) -> Self {
        Self {
            id: participant.id,
            email: participant.participant.email,
            first_name: participant.participant.first_name,
            last_name: participant.participant.last_name,
            pesel: participant.participant.pesel,
            role: participant.participant.role,
            active: participant.participant.active,
            created_at: participant.participant.created_at,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_hashes_password() {
        let registration = Registration::example1();
        let password = registration.password.clone();
        let participant = registration.into_participant(Role::Voter).unwrap();
        assert_ne!(participant.password_hash, password);
        assert!(participant.verify_password(&password));
        assert!(participant.active);
        assert_eq!(participant.role, Role::Voter);
    }

    #[test]
    fn email_is_normalised() {
        let registration = Registration {
            email: "  Alice@Example.COM ".into(),
            ..Registration::example1()
        };
        let participant = registration.into_participant(Role::Voter).unwrap();
        assert_eq!(participant.email, "alice@example.com");
    }

    #[test]
    fn short_password_rejected() {
        let registration = Registration {
            password: "short".into(),
            ..Registration::example1()
        };
        assert!(matches!(
            registration.into_participant(Role::Voter),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn missing_email_rejected() {
        let registration = Registration {
            email: "nobody".into(),
            ..Registration::example1()
        };
        assert!(matches!(
            registration.into_participant(Role::Voter),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn name_length_limits() {
        let registration = Registration {
            first_name: "A".repeat(MAX_PERSONAL_NAME_LENGTH),
            last_name: "  Archer  ".into(),
            ..Registration::example1()
        };
        let participant = registration.into_participant(Role::Voter).unwrap();
        assert_eq!(participant.last_name, "Archer");

        let registration = Registration {
            last_name: "B".repeat(MAX_PERSONAL_NAME_LENGTH + 1),
            ..Registration::example1()
        };
        assert!(matches!(
            registration.into_participant(Role::Voter),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn long_email_rejected() {
        let registration = Registration {
            email: format!("{}@example.com", "a".repeat(MAX_EMAIL_LENGTH)),
            ..Registration::example1()
        };
        assert!(matches!(
            registration.into_participant(Role::Voter),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn pesel_must_have_exact_length() {
        for pesel in ["1234567890", "123456789012"] {
            let registration = Registration {
                pesel: Some(pesel.into()),
                ..Registration::example1()
            };
            assert!(matches!(
                registration.into_participant(Role::Voter),
                Err(Error::InvalidArgument(_))
            ));
        }

        let registration = Registration {
            pesel: Some(" 90010112345 ".into()),
            ..Registration::example1()
        };
        let participant = registration.into_participant(Role::Voter).unwrap();
        assert_eq!(participant.pesel.as_deref(), Some("90010112345"));
    }

    #[test]
    fn blank_pesel_is_absent() {
        let registration = Registration {
            pesel: Some("   ".into()),
            ..Registration::example1()
        };
        let participant = registration.into_participant(Role::Voter).unwrap();
        assert_eq!(participant.pesel, None);
    }
}
