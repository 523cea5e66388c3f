use crate::social::{Result, SocialError, retry_on_conflict};
use tracing::info;
use traveltales_common::model::{
    Id,
    graph::{FollowState, RelationshipCounts},
    pagination::{Page, PageRequest},
    user::{User, UserAccount, UserMarker, Username},
};
use traveltales_db::Store;

/// Resolves an active user. Malformed usernames cannot exist and are reported
/// as not found.
pub async fn resolve_username(store: &dyn Store, username: &str) -> Result<UserAccount> {
    let not_found = || SocialError::UserByUsernameNotFound(username.to_owned());
    let parsed = Username::new(username).map_err(|_| not_found())?;

    store
        .fetch_active_user_by_username(&parsed)
        .await?
        .ok_or_else(not_found)
}

pub async fn toggle_follow(
    store: &dyn Store,
    follower: Id<UserMarker>,
    target_username: &str,
) -> Result<FollowState> {
    let target = resolve_username(store, target_username).await?.user.id;
    if target == follower {
        return Err(SocialError::SelfFollow);
    }

    let state = retry_on_conflict(|| store.toggle_follow(follower, target)).await?;
    info!(%follower, following = %target, ?state, "Toggled follow");

    Ok(state)
}

pub async fn relationship_counts(
    store: &dyn Store,
    user: Id<UserMarker>,
) -> Result<RelationshipCounts> {
    Ok(store.relationship_counts(user).await?)
}

pub async fn is_following(
    store: &dyn Store,
    viewer: Option<Id<UserMarker>>,
    target: Id<UserMarker>,
) -> Result<bool> {
    match viewer {
        Some(viewer) if viewer != target => {
            Ok(store.follow_state(viewer, target).await?.is_following())
        }
        _ => Ok(false),
    }
}

pub async fn list_followers(
    store: &dyn Store,
    username: &str,
    page: PageRequest,
) -> Result<Page<User>> {
    let user = resolve_username(store, username).await?.user.id;
    Ok(store.list_followers(user, page).await?)
}

pub async fn list_following(
    store: &dyn Store,
    username: &str,
    page: PageRequest,
) -> Result<Page<User>> {
    let user = resolve_username(store, username).await?.user.id;
    Ok(store.list_following(user, page).await?)
}
