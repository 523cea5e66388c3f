use crate::social::{Result, SocialError, retry_on_conflict};
use tracing::info;
use traveltales_common::model::{
    Id,
    engagement::{Vote, VoteOutcome},
    post::PostMarker,
    user::UserMarker,
};
use traveltales_db::Store;

/// Casts, switches or retracts the user's vote and returns the recomputed
/// like counter together with the user's resulting vote.
pub async fn vote(
    store: &dyn Store,
    user: Id<UserMarker>,
    post_id: Id<PostMarker>,
    vote: Vote,
) -> Result<VoteOutcome> {
    let outcome = retry_on_conflict(|| store.vote(user, post_id, vote))
        .await?
        .ok_or(SocialError::PostByIdNotFound(post_id))?;
    info!(%user, %post_id, ?vote, ?outcome, "Recorded vote");

    Ok(outcome)
}
