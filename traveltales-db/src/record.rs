use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use traveltales_common::{
    model::{
        ModelValidationError,
        auth::Session,
        comment::Comment,
        counter,
        engagement::Vote,
        post::Post,
        text::{CommentContent, Country, PostContent, PostTitle},
        user::{Email, User, UserAccount, Username},
    },
    util::PositiveDuration,
};

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_id: i64,
    pub title: String,
    pub content: String,
    pub country: String,
    pub visit_date: Date,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub is_published: bool,
    pub likes_count: i32,
    pub comments_count: i32,
    pub created_at: OffsetDateTime,
    pub user_id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image: Option<String>,
    pub viewer_vote: Option<bool>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_id: i64,
    pub post_id: i64,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub user_id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct SessionRecord {
    pub user_id: i64,
    pub token_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_after_seconds: Option<i64>,
}

fn user(
    user_id: i64,
    username: String,
    first_name: Option<String>,
    last_name: Option<String>,
    profile_image: Option<String>,
) -> Result<User, ModelValidationError> {
    Ok(User {
        id: user_id.into(),
        username: Username::new(username)?,
        first_name,
        last_name,
        profile_image,
    })
}

impl TryFrom<UserRecord> for UserAccount {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: user(
                value.user_id,
                value.username,
                value.first_name,
                value.last_name,
                value.profile_image,
            )?,
            email: Email::new(value.email)?,
            bio: value.bio,
            is_active: value.is_active,
            created_at: value.created_at,
        })
    }
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        user(
            value.user_id,
            value.username,
            value.first_name,
            value.last_name,
            value.profile_image,
        )
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_id.into(),
            author: user(
                value.user_id,
                value.username,
                value.first_name,
                value.last_name,
                value.profile_image,
            )?,
            title: PostTitle::new(value.title)?,
            content: PostContent::new(value.content)?,
            country: Country::new(value.country)?,
            visit_date: value.visit_date,
            tags: value.tags,
            images: value.images,
            is_published: value.is_published,
            likes_count: counter(value.likes_count.into())?,
            comments_count: counter(value.comments_count.into())?,
            created_at: value.created_at,
            user_vote: value.viewer_vote.map(Vote::from_is_like),
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.comment_id.into(),
            post_id: value.post_id.into(),
            author: user(
                value.user_id,
                value.username,
                value.first_name,
                value.last_name,
                value.profile_image,
            )?,
            content: CommentContent::new(value.content)?,
            created_at: value.created_at,
        })
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = ModelValidationError;

    fn try_from(value: SessionRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user_id.into(),
            token_hash: value.token_hash.try_into()?,
            created_at: value.created_at,
            expires_after: value
                .expires_after_seconds
                .map(|seconds| time::Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}

/// Positive lifetimes only; the table has a matching CHECK constraint.
pub(crate) fn lifetime_seconds(lifetime: Option<PositiveDuration>) -> Option<i64> {
    lifetime.map(|lifetime| lifetime.whole_seconds())
}
