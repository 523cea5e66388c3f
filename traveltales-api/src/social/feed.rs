use crate::social::Result;
use tracing::debug;
use traveltales_common::model::{
    Id,
    pagination::{Page, PageRequest},
    post::{Post, PostQuery},
    user::UserMarker,
};
use traveltales_db::Store;

/// Published posts of everyone the viewer follows, newest first, each carrying
/// the viewer's own vote.
pub async fn following_feed(
    store: &dyn Store,
    viewer: Id<UserMarker>,
    page: PageRequest,
) -> Result<Page<Post>> {
    let following = store.following_ids(viewer).await?;

    if following.is_empty() {
        debug!(%viewer, "Viewer follows nobody, skipping post query");
        return Ok(Page::empty(page));
    }

    let query = PostQuery::by_authors(following);
    Ok(store.list_posts(&query, page, Some(viewer)).await?)
}
