use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    common::{participant::Role, ParticipantId},
    db::Participant,
};
use crate::store::Storage;

use super::{access::Access, principal::Principal};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token for a specific participant, proving they have access level `A`.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<A> {
    #[serde(rename = "sub")]
    pub id: ParticipantId,
    #[serde(rename = "rgt")]
    pub role: Role,
    #[serde(skip)]
    phantom: PhantomData<A>,
}

impl<A> AuthToken<A> {
    /// Create a new [`AuthToken`] for the given participant.
    pub fn new(participant: &Participant) -> Self {
        Self {
            id: participant.id,
            role: participant.role,
            phantom: PhantomData,
        }
    }

    /// The authenticated participant this token stands for.
    pub fn principal(&self) -> Principal {
        Principal::new(self.id, self.role)
    }

    /// Sign this token into a JWT.
    pub fn encode(self, config: &Config) -> Result<String> {
        self.sign(&Header::default(), config)
    }

    /// Failing to sign is a server fault, unlike failing to verify.
    fn sign(self, header: &Header, config: &Config) -> Result<String> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        jsonwebtoken::encode(
            header,
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .map_err(|e| Error::unexpected(format!("Failed to sign auth token: {e}")))
    }

    /// Wrap a signed JWT in a cookie.
    pub fn cookie(jwt: String, config: &Config) -> Cookie<'static> {
        Cookie::build(AUTH_TOKEN_COOKIE, jwt)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Verify and decode a JWT.
    pub fn decode(jwt: &str, config: &Config) -> Result<Self> {
        let token = jsonwebtoken::decode(
            jwt,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<A>>| claims.claims.token)?;
        Ok(token)
    }
}

/// JWT claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<A> {
    #[serde(flatten, bound = "")]
    token: AuthToken<A>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// Find the raw JWT in a request, from either the cookie or a bearer `Authorization` header.
fn raw_token<'r>(req: &'r Request<'_>) -> Option<&'r str> {
    if let Some(cookie) = req.cookies().get(AUTH_TOKEN_COOKIE) {
        return Some(cookie.value());
    }
    req.headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

#[rocket::async_trait]
impl<'r, A> FromRequest<'r> for AuthToken<A>
where
    A: Access + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the request and verify that its participant still exists, is
    /// active, and has access level `A`.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = try_outcome!(req.guard::<&State<Config>>().await.map_failure(|_| {
            (
                Status::InternalServerError,
                Error::unexpected("Config is not managed"),
            )
        }));

        let Some(jwt) = raw_token(req) else {
            return Outcome::Failure((
                Status::Unauthorized,
                Error::Unauthorized("Authentication required".to_string()),
            ));
        };

        let token = match Self::decode(jwt, config) {
            Ok(token) => token,
            Err(e) => {
                debug!("Rejected auth token: {e}");
                return Outcome::Failure((Status::Unauthorized, e));
            }
        };

        // Check the participant still exists and may log in; their current role wins over
        // whatever the token claims.
        let storage = try_outcome!(req.guard::<Storage>().await);
        let participant = match storage.participant(token.id).await {
            Ok(Some(participant)) if participant.active => participant,
            Ok(_) => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Unauthorized("Account is unknown or deactivated".to_string()),
                ))
            }
            Err(e) => return Outcome::Failure((e.status(), e)),
        };

        if !A::permits(participant.role) {
            return Outcome::Failure((
                Status::Forbidden,
                Error::Forbidden(format!("{} access required", A::NAME)),
            ));
        }

        Outcome::Success(Self::new(&participant))
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::Algorithm;

    use super::*;
    use crate::model::auth::Voter;

    fn token(role: Role) -> AuthToken<Voter> {
        AuthToken {
            id: 7,
            role,
            phantom: PhantomData,
        }
    }

    #[test]
    fn signed_token_verifies() {
        let config = Config::example();
        let jwt = token(Role::Admin).encode(&config).unwrap();

        let decoded = AuthToken::<Voter>::decode(&jwt, &config).unwrap();
        assert_eq!(decoded.principal(), Principal::new(7, Role::Admin));
    }

    #[test]
    fn bad_token_is_unauthorized() {
        let Err(err) = AuthToken::<Voter>::decode("not.a.jwt", &Config::example()) else {
            panic!("garbage token was accepted");
        };
        assert!(matches!(err, Error::Jwt(_)));
        assert_eq!(err.status(), Status::Unauthorized);
    }

    #[test]
    fn signing_failure_is_unexpected() {
        // An RSA algorithm cannot be used with a shared secret.
        let err = token(Role::Voter)
            .sign(&Header::new(Algorithm::RS256), &Config::example())
            .unwrap_err();
        assert!(matches!(err, Error::Unexpected(_)));
        assert_eq!(err.status(), Status::InternalServerError);
    }
}
