use crate::social::SocialError;
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use json::Json;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};
use traveltales_common::{
    model::auth::{SessionTokenDecodeError, SessionTokenHashError},
    util::PositiveDuration,
};
use traveltales_db::{DbError, Store};

mod auth;
mod json;
mod query;
mod routes;

#[cfg(test)]
mod tests;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub store: Arc<dyn Store>,
    pub sessions: SessionPolicy,
}

/// How long newly issued sessions stay valid. `None` never expires.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct SessionPolicy {
    pub lifetime: Option<PositiveDuration>,
}

pub fn routes() -> ServerRouter {
    Router::new()
        .nest("/api", routes::routes())
        .fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided session token could not be decoded: {0}")]
    InvalidSessionToken(#[from] SessionTokenDecodeError),
    #[error("The session token could not be hashed: {0}")]
    SessionTokenHash(#[from] SessionTokenHashError),
    #[error("Provided token was invalid or expired")]
    InvalidToken,
    #[error(transparent)]
    Social(#[from] SocialError),
}

impl From<DbError> for ServerError {
    fn from(error: DbError) -> Self {
        Self::Social(error.into())
    }
}

/// The error class reported to clients next to the status code.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub enum ErrorKind {
    NotFound,
    InvalidOperation,
    InvalidInput,
    Unauthorized,
    Conflict,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidOperation | ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ServerError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PathRejection(_) => ErrorKind::NotFound,
            ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidSessionToken(_)
            | ServerError::InvalidToken => ErrorKind::Unauthorized,
            ServerError::JsonRejection(_) | ServerError::QueryRejection(_) => {
                ErrorKind::InvalidInput
            }
            ServerError::JsonResponse(_) | ServerError::SessionTokenHash(_) => ErrorKind::Internal,
            ServerError::Social(social) => match social {
                SocialError::UserByUsernameNotFound(_)
                | SocialError::UserByIdNotFound(_)
                | SocialError::PostByIdNotFound(_) => ErrorKind::NotFound,
                SocialError::SelfFollow | SocialError::MalformedVote => ErrorKind::InvalidOperation,
                SocialError::InvalidText(_)
                | SocialError::InvalidPage(_)
                | SocialError::VisitDateInFuture(_) => ErrorKind::InvalidInput,
                SocialError::Conflict(_) => ErrorKind::Conflict,
                SocialError::Store(_) => ErrorKind::Internal,
            },
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.kind().status()
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct ErrorResponse {
    status: u16,
    kind: ErrorKind,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = self.status();

        let message = if kind == ErrorKind::Internal {
            error!(error = %self, %status, "Replying with error");
            "Internal server error".to_owned()
        } else {
            debug!(error = %self, %status, "Replying with error");
            self.to_string()
        };

        let error_response = ErrorResponse {
            status: status.as_u16(),
            kind,
            message,
        };
        (status, Json(error_response)).into_response()
    }
}
