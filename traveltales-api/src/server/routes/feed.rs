use crate::{
    server::{
        Result, ServerError, ServerRouter,
        auth::AuthenticatedUser,
        json::Json,
        query::Query,
        routes::{DEFAULT_POST_PAGE_SIZE, PageQuery, PostPage},
    },
    social::feed,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use traveltales_db::Store;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(following_feed)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/feed/following", rejection(ServerError))]
struct FollowingFeedPath();

async fn following_feed(
    FollowingFeedPath(): FollowingFeedPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<PostPage>> {
    let page = query.request(DEFAULT_POST_PAGE_SIZE)?;
    let feed = feed::following_feed(store.as_ref(), user.user_id(), page).await?;

    Ok(Json(PostPage {
        posts: feed.items,
        pagination: feed.pagination,
    }))
}
