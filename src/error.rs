use argon2::Error as Argon2Error;
use jsonwebtoken::errors::Error as JwtError;
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::common::ElectionId;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while serving a request.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),
    #[error("Election {0} is not currently accepting votes")]
    ElectionNotActive(ElectionId),
    #[error("Participant has already voted in election {0}")]
    AlreadyVoted(ElectionId),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    DuplicateResource(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_argument(why: impl Into<String>) -> Self {
        Self::InvalidArgument(why.into())
    }

    pub fn unexpected(why: impl Into<String>) -> Self {
        Self::Unexpected(why.into())
    }

    pub fn email_taken(email: &str) -> Self {
        Self::DuplicateResource(format!("Email {email} is already registered"))
    }

    pub fn pesel_taken(pesel: &str) -> Self {
        Self::DuplicateResource(format!("PESEL {pesel} is already registered"))
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::NotFound(_) => Status::NotFound,
            Self::ElectionNotActive(_) | Self::InvalidArgument(_) => Status::BadRequest,
            Self::AlreadyVoted(_) | Self::DuplicateResource(_) => Status::Conflict,
            Self::Unauthorized(_) | Self::Jwt(_) => Status::Unauthorized,
            Self::Forbidden(_) => Status::Forbidden,
            Self::Db(_) | Self::Argon2(_) | Self::Unexpected(_) => Status::InternalServerError,
        }
    }
}

/// The JSON body sent alongside every error status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status: status.code,
            error: status.reason_lossy().to_string(),
            message: message.into(),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let message = if status == Status::InternalServerError {
            error!("{self:?}");
            // Internal details stay in the log.
            "An unexpected error occurred".to_string()
        } else {
            warn!("{self}");
            self.to_string()
        };
        (status, Json(ErrorBody::new(status, message))).respond_to(req)
    }
}
