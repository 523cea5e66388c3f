//! The persistence seam shared by every component.
//!
//! Each mutating method is atomic: the ledger change, the counter recompute
//! and the counter write either all happen or none do.

use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;
use traveltales_common::model::{
    Id, ModelValidationError,
    auth::{Session, SessionTokenHash},
    comment::{Comment, CommentAdded},
    engagement::{Vote, VoteOutcome},
    graph::{FollowState, RelationshipCounts},
    pagination::{Page, PageRequest},
    post::{CreatePost, Post, PostMarker, PostQuery},
    text::{CommentContent, SearchTerm},
    user::{CreateUser, UpdateProfile, User, UserAccount, UserMarker, Username},
};

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Unique constraint {0} was violated")]
    UniqueViolation(String),
    #[error("Referenced {0} does not exist")]
    MissingReference(&'static str),
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(database_error) = &error
            && database_error.is_unique_violation()
        {
            let constraint = database_error.constraint().unwrap_or("unknown").to_owned();
            return Self::UniqueViolation(constraint);
        }

        Self::Sqlx(error)
    }
}

#[async_trait]
pub trait Store: Send + Sync + Debug {
    /// Fails with [`DbError::UniqueViolation`] if the username or email is taken.
    async fn create_user(&self, user: &CreateUser) -> Result<UserAccount>;

    /// Looks up a user regardless of the active flag.
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<UserAccount>>;

    /// Only returns active users.
    async fn fetch_active_user_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<UserAccount>>;

    /// Active users whose username, first name or last name contains `term`,
    /// ignoring case. Ordered by username.
    async fn search_users(&self, term: &SearchTerm, page: PageRequest) -> Result<Page<User>>;

    /// Overwrites the fields set in `profile`. Returns `None` if the user does not exist.
    async fn update_profile(
        &self,
        user: Id<UserMarker>,
        profile: &UpdateProfile,
    ) -> Result<Option<UserAccount>>;

    async fn create_session(&self, session: &Session) -> Result<()>;

    async fn fetch_session(&self, token_hash: &SessionTokenHash) -> Result<Option<Session>>;

    async fn follow_state(
        &self,
        follower: Id<UserMarker>,
        following: Id<UserMarker>,
    ) -> Result<FollowState>;

    /// Applies the toggle transition for the pair and returns the new state.
    async fn toggle_follow(
        &self,
        follower: Id<UserMarker>,
        following: Id<UserMarker>,
    ) -> Result<FollowState>;

    async fn relationship_counts(&self, user: Id<UserMarker>) -> Result<RelationshipCounts>;

    async fn following_ids(&self, user: Id<UserMarker>) -> Result<Vec<Id<UserMarker>>>;

    async fn list_followers(&self, user: Id<UserMarker>, page: PageRequest) -> Result<Page<User>>;

    async fn list_following(&self, user: Id<UserMarker>, page: PageRequest) -> Result<Page<User>>;

    async fn create_post(&self, author: Id<UserMarker>, post: &CreatePost) -> Result<Post>;

    /// Replaces the editable fields of a post. Returns `None` if no post with
    /// that id is owned by `author`.
    async fn update_post(
        &self,
        author: Id<UserMarker>,
        post_id: Id<PostMarker>,
        post: &CreatePost,
    ) -> Result<Option<Post>>;

    /// Only returns published posts.
    async fn fetch_post(
        &self,
        post_id: Id<PostMarker>,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Option<Post>>;

    /// Posts matching `query`, newest first. Unpublished posts are skipped
    /// unless the query includes them.
    async fn list_posts(
        &self,
        query: &PostQuery,
        page: PageRequest,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Page<Post>>;

    /// Returns `false` if no post with that id is owned by `author`.
    async fn delete_post(&self, author: Id<UserMarker>, post_id: Id<PostMarker>) -> Result<bool>;

    /// Returns `None` if the post does not exist.
    async fn vote(
        &self,
        user: Id<UserMarker>,
        post_id: Id<PostMarker>,
        vote: Vote,
    ) -> Result<Option<VoteOutcome>>;

    /// Returns `None` if the post does not exist.
    async fn add_comment(
        &self,
        author: Id<UserMarker>,
        post_id: Id<PostMarker>,
        content: &CommentContent,
    ) -> Result<Option<CommentAdded>>;

    /// Oldest first.
    async fn list_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>>;
}
