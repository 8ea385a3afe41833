use jsonwebtoken::errors::Error as JwtError;
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{self, status, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::logging::RequestId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Election {0} is not open for voting")]
    ElectionClosed(String),
    #[error("Invalid candidate: {0}")]
    InvalidCandidate(String),
    #[error("Voter has already voted in election {0}")]
    DuplicateVote(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn unauthorized(why: impl Into<String>) -> Self {
        Self::Unauthorized(why.into())
    }

    pub fn validation(why: impl Into<String>) -> Self {
        Self::Validation(why.into())
    }

    /// The HTTP status reported for this error.
    pub fn status(&self) -> Status {
        match self {
            Self::NotFound(_) => Status::NotFound,
            Self::ElectionClosed(_) => Status::Forbidden,
            Self::InvalidCandidate(_) => Status::BadRequest,
            Self::DuplicateVote(_) | Self::Conflict(_) => Status::Conflict,
            Self::Unauthorized(_) | Self::Jwt(_) => Status::Unauthorized,
            Self::Validation(_) => Status::UnprocessableEntity,
            Self::Db(_) | Self::Internal(_) => Status::InternalServerError,
        }
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::ElectionClosed(_) => "election_closed",
            Self::InvalidCandidate(_) => "invalid_candidate",
            Self::DuplicateVote(_) => "duplicate_vote",
            Self::Unauthorized(_) | Self::Jwt(_) => "unauthorized",
            Self::Validation(_) => "validation_error",
            Self::Conflict(_) => "conflict",
            Self::Db(_) | Self::Internal(_) => "internal_error",
        }
    }
}

/// Error kind for a status raised outside a handler, by a failed guard, an
/// unparseable body or an unmatched route.
pub fn kind_of_status(status: Status) -> &'static str {
    match status.code {
        400 => "bad_request",
        401 => "unauthorized",
        403 => "forbidden",
        404 => "not_found",
        409 => "conflict",
        422 => "validation_error",
        code if code >= 500 => "internal_error",
        _ => "error",
    }
}

/// The JSON body sent alongside an error status.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let id = RequestId::of(req);
        // Never leak storage or token internals to the caller.
        let message = if status.code >= 500 {
            error!("req{id} failed: {self}");
            "Something went wrong on our end".to_string()
        } else {
            debug!("req{id} rejected: {self}");
            self.to_string()
        };
        let body = ErrorBody {
            error: self.kind(),
            message,
        };
        status::Custom(status, Json(body)).respond_to(req)
    }
}
