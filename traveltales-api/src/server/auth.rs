use crate::{
    server::{Result, ServerError, SessionPolicy},
    social::SocialError,
};
use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, info};
use traveltales_common::model::{
    Id,
    auth::{Session, SessionToken},
    user::{UserAccount, UserMarker},
};
use traveltales_db::Store;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// An active user holding a valid, unexpired session.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }
}

/// Persists a fresh session for `user` and returns the only copy of its token.
pub async fn issue_session(
    store: &dyn Store,
    policy: SessionPolicy,
    user: Id<UserMarker>,
) -> Result<SessionToken> {
    let token = SessionToken::generate(user);
    let session = Session {
        user,
        token_hash: token.hash()?,
        created_at: OffsetDateTime::now_utc(),
        expires_after: policy.lifetime,
    };
    store.create_session(&session).await?;
    info!(%user, "Issued session");

    Ok(token)
}

/// Resolves a presented token to its active account.
pub async fn authenticate(store: &dyn Store, token: &SessionToken) -> Result<UserAccount> {
    let token_hash = token.hash()?;

    let session = store
        .fetch_session(&token_hash)
        .await?
        .ok_or(ServerError::InvalidToken)?;

    if session.user != token.user_id || session.is_expired_at(OffsetDateTime::now_utc()) {
        return Err(ServerError::InvalidToken);
    }

    store
        .fetch_user(session.user)
        .await?
        .filter(|account| account.is_active)
        .ok_or(ServerError::InvalidToken)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<dyn Store>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token: SessionToken =
            <AuthorizationHeader as FromRequestParts<S>>::from_request_parts(parts, state)
                .await
                .map_err(ServerError::InvalidAuthorizationHeader)?
                .token()
                .parse()?;

        let store = Arc::<dyn Store>::from_ref(state);
        let account = authenticate(store.as_ref(), &token).await?;

        Ok(Self {
            id: account.user.id,
        })
    }
}

/// Optional authentication: anything short of a store failure is anonymous.
impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    Arc<dyn Store>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        match <Self as FromRequestParts<S>>::from_request_parts(parts, state).await {
            Ok(user) => Ok(Some(user)),
            Err(error @ ServerError::Social(SocialError::Store(_))) => Err(error),
            Err(error) => {
                debug!(%error, "Treating request as anonymous");
                Ok(None)
            }
        }
    }
}
