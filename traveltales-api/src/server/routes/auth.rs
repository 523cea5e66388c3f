use crate::{
    server::{
        Result, ServerError, ServerRouter, SessionPolicy,
        auth::{AuthenticatedUser, issue_session},
        json::{Created, Json},
    },
    social::profiles,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::info;
use traveltales_common::model::user::{CreateUser, Email, UpdateProfile, User, UserAccount};
use traveltales_db::Store;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(register)
        .typed_get(me)
        .typed_put(update_profile)
}

/// The caller's own account, including the private fields.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
struct Account {
    #[serde(flatten)]
    user: User,
    email: Email,
    bio: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl From<UserAccount> for Account {
    fn from(account: UserAccount) -> Self {
        Self {
            user: account.user,
            email: account.email,
            bio: account.bio,
            created_at: account.created_at,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct Registered {
    user: Account,
    token: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct Me {
    user: Account,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/register", rejection(ServerError))]
struct RegisterPath();

async fn register(
    RegisterPath(): RegisterPath,
    State(store): State<Arc<dyn Store>>,
    State(policy): State<SessionPolicy>,
    Json(user): Json<CreateUser>,
) -> Result<Created<Registered>> {
    let account = store.create_user(&user).await?;
    let token = issue_session(store.as_ref(), policy, account.user.id).await?;
    info!(user = %account.user.id, username = account.user.username.get(), "Registered user");

    Ok(Created(Registered {
        user: account.into(),
        token: token.to_bearer(),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/me", rejection(ServerError))]
struct MePath();

async fn me(
    MePath(): MePath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
) -> Result<Json<Me>> {
    let account = store
        .fetch_user(user.user_id())
        .await?
        .ok_or(ServerError::InvalidToken)?;

    Ok(Json(Me {
        user: account.into(),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/profile", rejection(ServerError))]
struct ProfilePath();

async fn update_profile(
    ProfilePath(): ProfilePath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
    Json(profile): Json<UpdateProfile>,
) -> Result<Json<Me>> {
    let account = profiles::update_profile(store.as_ref(), user.user_id(), &profile).await?;

    Ok(Json(Me {
        user: account.into(),
    }))
}
