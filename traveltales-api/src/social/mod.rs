//! The social core: follow graph, engagement and comment ledgers, feed.
//!
//! Every operation takes the store handle explicitly and trusts the viewer id
//! it is given; authentication happens before these functions are reached.

pub mod comments;
pub mod engagement;
pub mod feed;
pub mod graph;
pub mod posts;
pub mod profiles;

#[cfg(test)]
pub(crate) mod test_support;

use std::future::Future;
use thiserror::Error;
use time::Date;
use tracing::warn;
use traveltales_common::model::{
    Id, pagination::InvalidPageRequestError, post::PostMarker, text::InvalidTextError,
    user::UserMarker,
};
use traveltales_db::DbError;

pub type Result<T, E = SocialError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("User {0} was not found.")]
    UserByUsernameNotFound(String),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Cannot follow yourself.")]
    SelfFollow,
    #[error("Vote payload must contain a boolean isLike.")]
    MalformedVote,
    #[error(transparent)]
    InvalidText(#[from] InvalidTextError),
    #[error(transparent)]
    InvalidPage(#[from] InvalidPageRequestError),
    #[error("Visit date {0} lies in the future.")]
    VisitDateInFuture(Date),
    #[error("Concurrent update conflicted on {0}.")]
    Conflict(String),
    #[error(transparent)]
    Store(DbError),
}

impl From<DbError> for SocialError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::UniqueViolation(constraint) => Self::Conflict(constraint),
            error => Self::Store(error),
        }
    }
}

/// Runs a store mutation, retrying exactly once if it lost a unique-index race.
pub(crate) async fn retry_on_conflict<T, F, Fut>(mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbError>>,
{
    match operation().await {
        Err(DbError::UniqueViolation(constraint)) => {
            warn!(%constraint, "Unique constraint raced, retrying once");
            Ok(operation().await?)
        }
        result => Ok(result?),
    }
}
