use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{status::Custom, Responder},
    serde::json::{json, Json},
};
use thiserror::Error;

use crate::model::common::VotingError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error(transparent)]
    Voting(#[from] VotingError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    /// Create a not-found error for the described object.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::Voting(VotingError::NotFound(what.into()))
    }

    /// Create an error for a request that needs an admin login.
    pub fn unauthorized() -> Self {
        Self::Status(Status::Unauthorized, "Admin login required".to_string())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Argon2(_) => Status::BadRequest,
            Self::Voting(err) => match err {
                VotingError::NotFound(_) | VotingError::CandidateNotFound(_) => Status::NotFound,
                VotingError::PollActive
                | VotingError::PollInactive
                | VotingError::AlreadyVoted
                | VotingError::DuplicateVoter(_) => Status::Conflict,
                VotingError::MalformedInput(_) => Status::BadRequest,
                VotingError::ValidationFailed(_) => Status::UnprocessableEntity,
            },
            Self::Status(status, _) => *status,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{self}");
        } else {
            warn!("{self}");
        }
        let body = Json(json!({ "error": self.to_string() }));
        Custom(status, body).respond_to(req)
    }
}
