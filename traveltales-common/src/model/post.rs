use crate::{
    model::{
        Id,
        comment::Comment,
        engagement::Vote,
        text::{Country, PostContent, PostTitle},
        user::{User, UserMarker},
    },
    util::iso_date,
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

pub const PROFILE_RECENT_POSTS: u32 = 5;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub title: PostTitle,
    pub content: PostContent,
    pub country: Country,
    #[serde(with = "iso_date")]
    pub visit_date: Date,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub is_published: bool,
    pub likes_count: u32,
    pub comments_count: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// The requesting user's own vote, `None` for anonymous viewers.
    pub user_vote: Option<Vote>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// The short form shown on profiles.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: Id<PostMarker>,
    pub title: PostTitle,
    pub country: Country,
    #[serde(with = "iso_date")]
    pub visit_date: Date,
    pub likes_count: u32,
    pub comments_count: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Post> for PostSummary {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            country: post.country,
            visit_date: post.visit_date,
            likes_count: post.likes_count,
            comments_count: post.comments_count,
            created_at: post.created_at,
        }
    }
}

/// The author-editable part of a post, used both to create and to update it.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
    pub title: PostTitle,
    pub content: PostContent,
    pub country: Country,
    #[serde(with = "iso_date")]
    pub visit_date: Date,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreatePost {
    /// A trip cannot be written up before it happened.
    #[must_use]
    pub fn visit_date_is_valid(&self, today: Date) -> bool {
        self.visit_date <= today
    }
}

/// Which posts to list. All set filters must match.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostQuery {
    /// Restrict to these authors. `Some(vec![])` matches nothing.
    pub authors: Option<Vec<Id<UserMarker>>>,
    /// Case-insensitive substring of the country.
    pub country: Option<String>,
    /// Case-insensitive substring of the author's username.
    pub author_username: Option<String>,
    /// Also match unpublished posts. Only an author's own listing sets this.
    pub include_unpublished: bool,
}

impl PostQuery {
    #[must_use]
    pub fn by_authors(authors: Vec<Id<UserMarker>>) -> Self {
        Self {
            authors: Some(authors),
            ..Self::default()
        }
    }

    /// Everything `author` wrote, published or not.
    #[must_use]
    pub fn own(author: Id<UserMarker>) -> Self {
        Self {
            include_unpublished: true,
            ..Self::by_authors(vec![author])
        }
    }
}
