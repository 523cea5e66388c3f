use crate::social::{Result, SocialError, comments::list_comments};
use time::Date;
use tracing::info;
use traveltales_common::model::{
    Id,
    pagination::{Page, PageRequest},
    post::{CreatePost, Post, PostDetail, PostMarker, PostQuery},
    user::UserMarker,
};
use traveltales_db::Store;

pub async fn create_post(
    store: &dyn Store,
    author: Id<UserMarker>,
    post: &CreatePost,
    today: Date,
) -> Result<Post> {
    if !post.visit_date_is_valid(today) {
        return Err(SocialError::VisitDateInFuture(post.visit_date));
    }

    let created = store.create_post(author, post).await?;
    info!(%author, post_id = %created.id, "Created post");

    Ok(created)
}

/// Replaces the editable fields of a post owned by `author`, under the same
/// rules as [`create_post`]. Posts of other users look missing.
pub async fn update_post(
    store: &dyn Store,
    author: Id<UserMarker>,
    post_id: Id<PostMarker>,
    post: &CreatePost,
    today: Date,
) -> Result<Post> {
    if !post.visit_date_is_valid(today) {
        return Err(SocialError::VisitDateInFuture(post.visit_date));
    }

    let updated = store
        .update_post(author, post_id, post)
        .await?
        .ok_or(SocialError::PostByIdNotFound(post_id))?;
    info!(%author, %post_id, "Updated post");

    Ok(updated)
}

/// A published post with its comments, oldest first.
pub async fn get_post(
    store: &dyn Store,
    post_id: Id<PostMarker>,
    viewer: Option<Id<UserMarker>>,
) -> Result<PostDetail> {
    let post = store
        .fetch_post(post_id, viewer)
        .await?
        .ok_or(SocialError::PostByIdNotFound(post_id))?;
    let comments = list_comments(store, post_id).await?;

    Ok(PostDetail { post, comments })
}

pub async fn list_posts(
    store: &dyn Store,
    query: &PostQuery,
    page: PageRequest,
    viewer: Option<Id<UserMarker>>,
) -> Result<Page<Post>> {
    Ok(store.list_posts(query, page, viewer).await?)
}

/// Everything `author` wrote, drafts included, newest first.
pub async fn list_own_posts(
    store: &dyn Store,
    author: Id<UserMarker>,
    page: PageRequest,
) -> Result<Page<Post>> {
    Ok(store
        .list_posts(&PostQuery::own(author), page, Some(author))
        .await?)
}

/// Deletes a post owned by `author`. Posts of other users look missing.
pub async fn delete_post(
    store: &dyn Store,
    author: Id<UserMarker>,
    post_id: Id<PostMarker>,
) -> Result<()> {
    if !store.delete_post(author, post_id).await? {
        return Err(SocialError::PostByIdNotFound(post_id));
    }
    info!(%author, %post_id, "Deleted post");

    Ok(())
}
