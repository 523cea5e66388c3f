use crate::social::{Result, SocialError};
use tracing::info;
use traveltales_common::model::{
    Id,
    comment::{Comment, CommentAdded},
    post::PostMarker,
    text::CommentContent,
    user::UserMarker,
};
use traveltales_db::Store;

/// Appends a trimmed comment. Content is validated before the post is looked up.
pub async fn add_comment(
    store: &dyn Store,
    author: Id<UserMarker>,
    post_id: Id<PostMarker>,
    content: &str,
) -> Result<CommentAdded> {
    let content = CommentContent::new(content)?;

    let added = store
        .add_comment(author, post_id, &content)
        .await?
        .ok_or(SocialError::PostByIdNotFound(post_id))?;
    info!(%author, %post_id, comments_count = added.comments_count, "Added comment");

    Ok(added)
}

pub async fn list_comments(store: &dyn Store, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
    Ok(store.list_comments(post_id).await?)
}
