use crate::{
    server::{
        Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json, query::Query,
        routes::{DEFAULT_USER_PAGE_SIZE, PageQuery},
    },
    social::{graph, profiles},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use traveltales_common::model::{
    pagination::{Page, Pagination},
    user::{Profile, User},
};
use traveltales_db::Store;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(search_users)
        .typed_get(get_profile)
        .typed_post(toggle_follow)
        .typed_get(list_followers)
        .typed_get(list_following)
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct UserPage {
    users: Vec<User>,
    pagination: Pagination,
}

impl From<Page<User>> for UserPage {
    fn from(page: Page<User>) -> Self {
        Self {
            users: page.items,
            pagination: page.pagination,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
struct FollowResponse {
    is_following: bool,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/search/{query}", rejection(ServerError))]
struct SearchPath {
    query: String,
}

async fn search_users(
    SearchPath { query: term }: SearchPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserPage>> {
    let page = query.request(DEFAULT_USER_PAGE_SIZE)?;
    let found = profiles::search_users(store.as_ref(), &term, page).await?;

    Ok(Json(found.into()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{username}", rejection(ServerError))]
struct ProfilePath {
    username: String,
}

async fn get_profile(
    ProfilePath { username }: ProfilePath,
    State(store): State<Arc<dyn Store>>,
    viewer: Option<AuthenticatedUser>,
) -> Result<Json<Profile>> {
    let profile =
        profiles::get_profile(store.as_ref(), &username, viewer.map(AuthenticatedUser::user_id))
            .await?;

    Ok(Json(profile))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{username}/follow", rejection(ServerError))]
struct FollowPath {
    username: String,
}

async fn toggle_follow(
    FollowPath { username }: FollowPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
) -> Result<Json<FollowResponse>> {
    let state = graph::toggle_follow(store.as_ref(), user.user_id(), &username).await?;

    Ok(Json(FollowResponse {
        is_following: state.is_following(),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{username}/followers", rejection(ServerError))]
struct FollowersPath {
    username: String,
}

async fn list_followers(
    FollowersPath { username }: FollowersPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserPage>> {
    let page = query.request(DEFAULT_USER_PAGE_SIZE)?;
    let followers = graph::list_followers(store.as_ref(), &username, page).await?;

    Ok(Json(followers.into()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{username}/following", rejection(ServerError))]
struct FollowingPath {
    username: String,
}

async fn list_following(
    FollowingPath { username }: FollowingPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserPage>> {
    let page = query.request(DEFAULT_USER_PAGE_SIZE)?;
    let following = graph::list_following(store.as_ref(), &username, page).await?;

    Ok(Json(following.into()))
}
