use crate::{
    server::{
        Result, ServerError, ServerRouter,
        auth::AuthenticatedUser,
        json::{Created, Json},
        query::Query,
        routes::{DEFAULT_POST_PAGE_SIZE, PageQuery, PostPage},
    },
    social::{SocialError, comments, engagement, posts},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use time::OffsetDateTime;
use traveltales_common::model::{
    Id,
    comment::CommentAdded,
    engagement::{Vote, VoteOutcome},
    post::{CreatePost, Post, PostDetail, PostMarker, PostQuery},
};
use traveltales_db::Store;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(list_own_posts)
        .typed_get(get_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
        .typed_post(vote)
        .typed_post(add_comment)
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct ListPostsQuery {
    page: Option<u32>,
    limit: Option<u32>,
    country: Option<String>,
    author: Option<String>,
}

fn non_blank(filter: Option<String>) -> Option<String> {
    filter.filter(|value| !value.trim().is_empty())
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteRequest {
    is_like: Vote,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct CommentRequest {
    content: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

async fn list_posts(
    PostsPath(): PostsPath,
    State(store): State<Arc<dyn Store>>,
    viewer: Option<AuthenticatedUser>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PostPage>> {
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .request(DEFAULT_POST_PAGE_SIZE)?;
    let filter = PostQuery {
        authors: None,
        country: non_blank(query.country),
        author_username: non_blank(query.author),
        include_unpublished: false,
    };

    let listed = posts::list_posts(
        store.as_ref(),
        &filter,
        page,
        viewer.map(AuthenticatedUser::user_id),
    )
    .await?;

    Ok(Json(PostPage {
        posts: listed.items,
        pagination: listed.pagination,
    }))
}

async fn create_post(
    PostsPath(): PostsPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
    Json(post): Json<CreatePost>,
) -> Result<Created<Post>> {
    let today = OffsetDateTime::now_utc().date();
    let post = posts::create_post(store.as_ref(), user.user_id(), &post, today).await?;

    Ok(Created(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/user/me", rejection(ServerError))]
struct OwnPostsPath();

async fn list_own_posts(
    OwnPostsPath(): OwnPostsPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<PostPage>> {
    let page = query.request(DEFAULT_POST_PAGE_SIZE)?;
    let own = posts::list_own_posts(store.as_ref(), user.user_id(), page).await?;

    Ok(Json(PostPage {
        posts: own.items,
        pagination: own.pagination,
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn Store>>,
    viewer: Option<AuthenticatedUser>,
) -> Result<Json<PostDetail>> {
    let post = posts::get_post(store.as_ref(), id, viewer.map(AuthenticatedUser::user_id)).await?;

    Ok(Json(post))
}

async fn update_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
    Json(post): Json<CreatePost>,
) -> Result<Json<Post>> {
    let today = OffsetDateTime::now_utc().date();
    let post = posts::update_post(store.as_ref(), user.user_id(), id, &post, today).await?;

    Ok(Json(post))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    posts::delete_post(store.as_ref(), user.user_id(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/like", rejection(ServerError))]
struct VotePath {
    id: Id<PostMarker>,
}

async fn vote(
    VotePath { id }: VotePath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
    request: Result<Json<VoteRequest>, ServerError>,
) -> Result<Json<VoteOutcome>> {
    let Json(VoteRequest { is_like }) = request.map_err(|_| SocialError::MalformedVote)?;
    let outcome = engagement::vote(store.as_ref(), user.user_id(), id, is_like).await?;

    Ok(Json(outcome))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments", rejection(ServerError))]
struct CommentsPath {
    id: Id<PostMarker>,
}

async fn add_comment(
    CommentsPath { id }: CommentsPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
    Json(CommentRequest { content }): Json<CommentRequest>,
) -> Result<Created<CommentAdded>> {
    let added = comments::add_comment(store.as_ref(), user.user_id(), id, &content).await?;

    Ok(Created(added))
}
