use crate::{
    record::{CommentRecord, PostRecord, SessionRecord, UserRecord, lifetime_seconds},
    store::{Result, Store},
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction, migrate::Migrator, query, query_as, query_scalar};
use tracing::{debug, instrument};
use traveltales_common::{
    model::{
        Id,
        auth::{Session, SessionTokenHash},
        comment::{Comment, CommentAdded},
        counter,
        engagement::{Vote, VoteOutcome, VoteTransition},
        graph::{FollowState, FollowTransition, RelationshipCounts},
        pagination::{Page, PageRequest, Pagination},
        post::{CreatePost, Post, PostMarker, PostQuery},
        text::{CommentContent, SearchTerm},
        user::{CreateUser, UpdateProfile, User, UserAccount, UserMarker, Username},
    },
    util::escape_like,
};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

macro_rules! user_columns {
    () => {
        "
        users.user_id,
        users.username,
        users.email,
        users.first_name,
        users.last_name,
        users.bio,
        users.profile_image,
        users.is_active,
        users.created_at
        "
    };
}

/// Post columns joined with the author and the viewer's vote.
/// The viewer id is always bound as `$1`.
macro_rules! post_select {
    () => {
        "
        SELECT
            posts.post_id,
            posts.title,
            posts.content,
            posts.country,
            posts.visit_date,
            posts.tags,
            posts.images,
            posts.is_published,
            posts.likes_count,
            posts.comments_count,
            posts.created_at,
            users.user_id,
            users.username,
            users.first_name,
            users.last_name,
            users.profile_image,
            likes.is_like AS viewer_vote
        FROM
            posts.posts
            JOIN users.users ON users.user_id = posts.user_id
            LEFT JOIN posts.likes ON likes.post_id = posts.post_id AND likes.user_id = $1::BIGINT
        "
    };
}

macro_rules! comment_select {
    () => {
        "
        SELECT
            comments.comment_id,
            comments.post_id,
            comments.content,
            comments.created_at,
            users.user_id,
            users.username,
            users.first_name,
            users.last_name,
            users.profile_image
        FROM
            posts.comments
            JOIN users.users ON users.user_id = comments.user_id
        "
    };
}

/// Filters shared by the post listing and its count. The arguments are the
/// placeholder numbers for the unpublished flag, the author ids, the country
/// and the username patterns.
macro_rules! post_filter {
    ($unpublished:literal, $authors:literal, $country:literal, $username:literal) => {
        concat!(
            "
            WHERE
                ($", $unpublished, "::BOOLEAN OR posts.is_published)
                AND ($", $authors, "::BIGINT[] IS NULL OR posts.user_id = ANY($", $authors, "))
                AND ($", $country, "::TEXT IS NULL OR posts.country ILIKE $", $country, ")
                AND ($", $username, "::TEXT IS NULL OR users.username ILIKE $", $username, ")
            "
        )
    };
}

/// Active users whose username or real name contains the `$1` pattern.
macro_rules! user_search_filter {
    () => {
        "
        WHERE
            users.is_active
            AND (
                users.username ILIKE $1
                OR users.first_name ILIKE $1
                OR users.last_name ILIKE $1
            )
        "
    };
}

#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    async fn fetch_post_in(
        tx: &mut Transaction<'_, Postgres>,
        post_id: Id<PostMarker>,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(concat!(post_select!(), "WHERE posts.post_id = $2"))
            .bind(viewer.map(Id::get))
            .bind(post_id.get())
            .fetch_optional(&mut **tx)
            .await?;

        Ok(record.map(Post::try_from).transpose()?)
    }

    /// Takes the row lock that serialises every counter update on one post.
    async fn lock_post(
        tx: &mut Transaction<'_, Postgres>,
        post_id: Id<PostMarker>,
    ) -> Result<bool> {
        let locked = query_scalar::<_, i64>(
            "SELECT post_id FROM posts.posts WHERE post_id = $1 FOR UPDATE",
        )
        .bind(post_id.get())
        .fetch_optional(&mut **tx)
        .await?;

        Ok(locked.is_some())
    }

    async fn list_relations(
        &self,
        sql: &'static str,
        count_sql: &'static str,
        user: Id<UserMarker>,
        page: PageRequest,
    ) -> Result<Page<User>> {
        let total = query_scalar::<_, i64>(count_sql)
            .bind(user.get())
            .fetch_one(&self.pool)
            .await?;

        let records = query_as::<_, UserRecord>(sql)
            .bind(user.get())
            .bind(i64::from(page.limit()))
            .bind(page.offset().cast_signed())
            .fetch_all(&self.pool)
            .await?;

        let users = records
            .into_iter()
            .map(User::try_from)
            .collect::<Result<_, _>>()?;

        Ok(Page {
            items: users,
            pagination: Pagination::new(page, total.cast_unsigned()),
        })
    }
}

#[async_trait]
impl Store for DbClient {
    async fn create_user(&self, user: &CreateUser) -> Result<UserAccount> {
        let record = query_as::<_, UserRecord>(concat!(
            "
            INSERT INTO users.users AS users (username, email, first_name, last_name, bio)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING
            ",
            user_columns!()
        ))
        .bind(user.username.get())
        .bind(user.email.get())
        .bind(user.first_name.as_ref().map(|name| name.get()))
        .bind(user.last_name.as_ref().map(|name| name.get()))
        .bind(user.bio.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<UserAccount>> {
        let record = query_as::<_, UserRecord>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users.users WHERE users.user_id = $1"
        ))
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(UserAccount::try_from).transpose()?)
    }

    async fn fetch_active_user_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<UserAccount>> {
        let record = query_as::<_, UserRecord>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users.users WHERE users.username = $1 AND users.is_active"
        ))
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(UserAccount::try_from).transpose()?)
    }

    async fn search_users(&self, term: &SearchTerm, page: PageRequest) -> Result<Page<User>> {
        let pattern = format!("%{}%", escape_like(term.get()));

        let total = query_scalar::<_, i64>(concat!(
            "SELECT COUNT(*) FROM users.users",
            user_search_filter!()
        ))
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let records = query_as::<_, UserRecord>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users.users",
            user_search_filter!(),
            "
            ORDER BY users.username, users.user_id
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(&pattern)
        .bind(i64::from(page.limit()))
        .bind(page.offset().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        let users = records
            .into_iter()
            .map(User::try_from)
            .collect::<Result<_, _>>()?;

        Ok(Page {
            items: users,
            pagination: Pagination::new(page, total.cast_unsigned()),
        })
    }

    #[instrument(skip(self, profile))]
    async fn update_profile(
        &self,
        user: Id<UserMarker>,
        profile: &UpdateProfile,
    ) -> Result<Option<UserAccount>> {
        let record = query_as::<_, UserRecord>(concat!(
            "
            UPDATE users.users AS users
            SET
                first_name = COALESCE($2, users.first_name),
                last_name = COALESCE($3, users.last_name),
                bio = COALESCE($4, users.bio),
                profile_image = COALESCE($5, users.profile_image)
            WHERE users.user_id = $1
            RETURNING
            ",
            user_columns!()
        ))
        .bind(user.get())
        .bind(profile.first_name.as_ref().map(|name| name.get()))
        .bind(profile.last_name.as_ref().map(|name| name.get()))
        .bind(profile.bio.as_deref())
        .bind(profile.profile_image.as_ref().map(|image| image.get()))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(UserAccount::try_from).transpose()?)
    }

    async fn create_session(&self, session: &Session) -> Result<()> {
        query(
            "
            INSERT INTO users.sessions (token_hash, user_id, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(session.token_hash.as_bytes())
        .bind(session.user.get())
        .bind(session.created_at)
        .bind(lifetime_seconds(session.expires_after))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_session(&self, token_hash: &SessionTokenHash) -> Result<Option<Session>> {
        let record = query_as::<_, SessionRecord>(
            "
            SELECT user_id, token_hash, created_at, expires_after_seconds
            FROM users.sessions
            WHERE token_hash = $1
            ",
        )
        .bind(token_hash.as_bytes())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Session::try_from).transpose()?)
    }

    async fn follow_state(
        &self,
        follower: Id<UserMarker>,
        following: Id<UserMarker>,
    ) -> Result<FollowState> {
        let exists = query_scalar::<_, bool>(
            "
            SELECT EXISTS (
                SELECT 1 FROM social.follows WHERE follower_id = $1 AND following_id = $2
            )
            ",
        )
        .bind(follower.get())
        .bind(following.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(FollowState::from_edge(exists))
    }

    #[instrument(skip(self))]
    async fn toggle_follow(
        &self,
        follower: Id<UserMarker>,
        following: Id<UserMarker>,
    ) -> Result<FollowState> {
        let mut tx = self.pool.begin().await?;

        let exists = query_scalar::<_, bool>(
            "
            SELECT EXISTS (
                SELECT 1 FROM social.follows WHERE follower_id = $1 AND following_id = $2
            )
            ",
        )
        .bind(follower.get())
        .bind(following.get())
        .fetch_one(&mut *tx)
        .await?;

        let transition = FollowState::from_edge(exists).toggle();
        let statement = match transition {
            FollowTransition::Follow => {
                "INSERT INTO social.follows (follower_id, following_id) VALUES ($1, $2)"
            }
            FollowTransition::Unfollow => {
                "DELETE FROM social.follows WHERE follower_id = $1 AND following_id = $2"
            }
        };
        query(statement)
            .bind(follower.get())
            .bind(following.get())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(?transition, "Applied follow transition");

        Ok(transition.resulting_state())
    }

    async fn relationship_counts(&self, user: Id<UserMarker>) -> Result<RelationshipCounts> {
        let (follower_count, following_count) = query_as::<_, (i64, i64)>(
            "
            SELECT
                (SELECT COUNT(*) FROM social.follows WHERE following_id = $1),
                (SELECT COUNT(*) FROM social.follows WHERE follower_id = $1)
            ",
        )
        .bind(user.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(RelationshipCounts {
            follower_count: follower_count.cast_unsigned(),
            following_count: following_count.cast_unsigned(),
        })
    }

    async fn following_ids(&self, user: Id<UserMarker>) -> Result<Vec<Id<UserMarker>>> {
        let ids = query_scalar::<_, i64>(
            "SELECT following_id FROM social.follows WHERE follower_id = $1",
        )
        .bind(user.get())
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(Id::new).collect())
    }

    async fn list_followers(&self, user: Id<UserMarker>, page: PageRequest) -> Result<Page<User>> {
        self.list_relations(
            concat!(
                "SELECT ",
                user_columns!(),
                "
                FROM social.follows JOIN users.users ON users.user_id = follows.follower_id
                WHERE follows.following_id = $1 AND users.is_active
                ORDER BY follows.created_at DESC, users.user_id
                LIMIT $2 OFFSET $3
                "
            ),
            "
            SELECT COUNT(*)
            FROM social.follows JOIN users.users ON users.user_id = follows.follower_id
            WHERE follows.following_id = $1 AND users.is_active
            ",
            user,
            page,
        )
        .await
    }

    async fn list_following(&self, user: Id<UserMarker>, page: PageRequest) -> Result<Page<User>> {
        self.list_relations(
            concat!(
                "SELECT ",
                user_columns!(),
                "
                FROM social.follows JOIN users.users ON users.user_id = follows.following_id
                WHERE follows.follower_id = $1 AND users.is_active
                ORDER BY follows.created_at DESC, users.user_id
                LIMIT $2 OFFSET $3
                "
            ),
            "
            SELECT COUNT(*)
            FROM social.follows JOIN users.users ON users.user_id = follows.following_id
            WHERE follows.follower_id = $1 AND users.is_active
            ",
            user,
            page,
        )
        .await
    }

    async fn create_post(&self, author: Id<UserMarker>, post: &CreatePost) -> Result<Post> {
        let mut tx = self.pool.begin().await?;

        let post_id = query_scalar::<_, i64>(
            "
            INSERT INTO posts.posts (user_id, title, content, country, visit_date, tags, images)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING post_id
            ",
        )
        .bind(author.get())
        .bind(post.title.get())
        .bind(post.content.get())
        .bind(post.country.get())
        .bind(post.visit_date)
        .bind(&post.tags)
        .bind(&post.images)
        .fetch_one(&mut *tx)
        .await?;

        let created = Self::fetch_post_in(&mut tx, post_id.into(), Some(author))
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        tx.commit().await?;

        Ok(created)
    }

    #[instrument(skip(self, post))]
    async fn update_post(
        &self,
        author: Id<UserMarker>,
        post_id: Id<PostMarker>,
        post: &CreatePost,
    ) -> Result<Option<Post>> {
        let mut tx = self.pool.begin().await?;

        let updated = query_scalar::<_, i64>(
            "
            UPDATE posts.posts
            SET title = $3, content = $4, country = $5, visit_date = $6, tags = $7, images = $8
            WHERE post_id = $1 AND user_id = $2
            RETURNING post_id
            ",
        )
        .bind(post_id.get())
        .bind(author.get())
        .bind(post.title.get())
        .bind(post.content.get())
        .bind(post.country.get())
        .bind(post.visit_date)
        .bind(&post.tags)
        .bind(&post.images)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Ok(None);
        }

        let post = Self::fetch_post_in(&mut tx, post_id, Some(author)).await?;
        tx.commit().await?;

        Ok(post)
    }

    async fn fetch_post(
        &self,
        post_id: Id<PostMarker>,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(concat!(
            post_select!(),
            "WHERE posts.post_id = $2 AND posts.is_published"
        ))
        .bind(viewer.map(Id::get))
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Post::try_from).transpose()?)
    }

    async fn list_posts(
        &self,
        query: &PostQuery,
        page: PageRequest,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Page<Post>> {
        let authors = query
            .authors
            .as_ref()
            .map(|authors| authors.iter().map(|id| id.get()).collect::<Vec<_>>());
        let country = query
            .country
            .as_deref()
            .map(|country| format!("%{}%", escape_like(country)));
        let author_username = query
            .author_username
            .as_deref()
            .map(|username| format!("%{}%", escape_like(username)));

        let total = query_scalar::<_, i64>(concat!(
            "
            SELECT COUNT(*)
            FROM posts.posts JOIN users.users ON users.user_id = posts.user_id
            ",
            post_filter!(1, 2, 3, 4)
        ))
        .bind(query.include_unpublished)
        .bind(&authors)
        .bind(&country)
        .bind(&author_username)
        .fetch_one(&self.pool)
        .await?;

        let records = query_as::<_, PostRecord>(concat!(
            post_select!(),
            post_filter!(2, 3, 4, 5),
            "
            ORDER BY posts.created_at DESC, posts.post_id DESC
            LIMIT $6 OFFSET $7
            "
        ))
        .bind(viewer.map(Id::get))
        .bind(query.include_unpublished)
        .bind(&authors)
        .bind(&country)
        .bind(&author_username)
        .bind(i64::from(page.limit()))
        .bind(page.offset().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;

        Ok(Page {
            items: posts,
            pagination: Pagination::new(page, total.cast_unsigned()),
        })
    }

    async fn delete_post(&self, author: Id<UserMarker>, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM posts.posts WHERE post_id = $1 AND user_id = $2")
            .bind(post_id.get())
            .bind(author.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn vote(
        &self,
        user: Id<UserMarker>,
        post_id: Id<PostMarker>,
        vote: Vote,
    ) -> Result<Option<VoteOutcome>> {
        let mut tx = self.pool.begin().await?;

        if !Self::lock_post(&mut tx, post_id).await? {
            return Ok(None);
        }

        let existing = query_scalar::<_, bool>(
            "SELECT is_like FROM posts.likes WHERE user_id = $1 AND post_id = $2",
        )
        .bind(user.get())
        .bind(post_id.get())
        .fetch_optional(&mut *tx)
        .await?
        .map(Vote::from_is_like);

        let transition = VoteTransition::plan(existing, vote);
        let statement = match transition {
            VoteTransition::Cast(_) => {
                "INSERT INTO posts.likes (user_id, post_id, is_like) VALUES ($1, $2, $3)"
            }
            VoteTransition::Retract => {
                "DELETE FROM posts.likes WHERE user_id = $1 AND post_id = $2 AND is_like = $3"
            }
            VoteTransition::Switch(_) => {
                "UPDATE posts.likes SET is_like = $3 WHERE user_id = $1 AND post_id = $2"
            }
        };
        query(statement)
            .bind(user.get())
            .bind(post_id.get())
            .bind(vote.is_like())
            .execute(&mut *tx)
            .await?;

        let likes_count = query_scalar::<_, i32>(
            "
            UPDATE posts.posts
            SET likes_count = (
                SELECT COUNT(*) FROM posts.likes WHERE post_id = $1 AND is_like
            )
            WHERE post_id = $1
            RETURNING likes_count
            ",
        )
        .bind(post_id.get())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(?transition, likes_count, "Applied vote transition");

        Ok(Some(VoteOutcome {
            likes_count: counter(likes_count.into())?,
            user_vote: transition.resulting_vote(),
        }))
    }

    #[instrument(skip(self, content))]
    async fn add_comment(
        &self,
        author: Id<UserMarker>,
        post_id: Id<PostMarker>,
        content: &CommentContent,
    ) -> Result<Option<CommentAdded>> {
        let mut tx = self.pool.begin().await?;

        if !Self::lock_post(&mut tx, post_id).await? {
            return Ok(None);
        }

        let comment_id = query_scalar::<_, i64>(
            "
            INSERT INTO posts.comments (post_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING comment_id
            ",
        )
        .bind(post_id.get())
        .bind(author.get())
        .bind(content.get())
        .fetch_one(&mut *tx)
        .await?;

        let comments_count = query_scalar::<_, i32>(
            "
            UPDATE posts.posts
            SET comments_count = (SELECT COUNT(*) FROM posts.comments WHERE post_id = $1)
            WHERE post_id = $1
            RETURNING comments_count
            ",
        )
        .bind(post_id.get())
        .fetch_one(&mut *tx)
        .await?;

        let record = query_as::<_, CommentRecord>(concat!(
            comment_select!(),
            "WHERE comments.comment_id = $1"
        ))
        .bind(comment_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(CommentAdded {
            comment: record.try_into()?,
            comments_count: counter(comments_count.into())?,
        }))
    }

    async fn list_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = query_as::<_, CommentRecord>(concat!(
            comment_select!(),
            "
            WHERE comments.post_id = $1
            ORDER BY comments.created_at, comments.comment_id
            "
        ))
        .bind(post_id.get())
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use crate::{client::DbClient, store::Store};
    use sqlx::PgPool;
    use time::macros::date;
    use traveltales_common::model::{
        Id,
        engagement::Vote,
        graph::FollowState,
        pagination::PageRequest,
        post::{CreatePost, PostMarker, PostQuery},
        text::{CommentContent, Country, PersonName, PostContent, PostTitle, SearchTerm},
        user::{CreateUser, Email, UpdateProfile, UserMarker, Username},
    };

    async fn user(client: &DbClient, name: &str) -> Id<UserMarker> {
        let user = CreateUser {
            username: Username::new(name).unwrap(),
            email: Email::new(format!("{name}@example.com")).unwrap(),
            first_name: None,
            last_name: None,
            bio: None,
        };
        client.create_user(&user).await.unwrap().user.id
    }

    fn new_post(country: &str) -> CreatePost {
        CreatePost {
            title: PostTitle::new(format!("Notes from {country}")).unwrap(),
            content: PostContent::new("Long walks, cheap noodles and one missed train.").unwrap(),
            country: Country::new(country).unwrap(),
            visit_date: date!(2024 - 03 - 15),
            tags: vec!["food".to_owned()],
            images: Vec::new(),
        }
    }

    async fn post(client: &DbClient, author: Id<UserMarker>, country: &str) -> Id<PostMarker> {
        client
            .create_post(author, &new_post(country))
            .await
            .unwrap()
            .id
    }

    async fn stored_likes(pool: &PgPool, post_id: Id<PostMarker>) -> (i32, i64) {
        sqlx::query_as(
            "
            SELECT
                likes_count,
                (SELECT COUNT(*) FROM posts.likes WHERE post_id = $1 AND is_like)
            FROM posts.posts
            WHERE post_id = $1
            ",
        )
        .bind(post_id.get())
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn vote_sequence_keeps_counter(pool: PgPool) {
        let client = DbClient::new(pool.clone());
        let ann = user(&client, "ann").await;
        let bob = user(&client, "bob").await;
        let post_id = post(&client, ann, "Vietnam").await;

        let liked = client.vote(bob, post_id, Vote::Like).await.unwrap().unwrap();
        assert_eq!((liked.likes_count, liked.user_vote), (1, Some(Vote::Like)));
        assert_eq!(stored_likes(&pool, post_id).await, (1, 1));

        let retracted = client.vote(bob, post_id, Vote::Like).await.unwrap().unwrap();
        assert_eq!((retracted.likes_count, retracted.user_vote), (0, None));
        assert_eq!(stored_likes(&pool, post_id).await, (0, 0));

        client.vote(bob, post_id, Vote::Like).await.unwrap();
        let switched = client
            .vote(bob, post_id, Vote::Dislike)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            (switched.likes_count, switched.user_vote),
            (0, Some(Vote::Dislike))
        );
        assert_eq!(stored_likes(&pool, post_id).await, (0, 0));

        let viewed = client.fetch_post(post_id, Some(bob)).await.unwrap().unwrap();
        assert_eq!(viewed.user_vote, Some(Vote::Dislike));

        assert!(client.vote(bob, Id::new(i64::MAX), Vote::Like).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn comments_bump_counter(pool: PgPool) {
        let client = DbClient::new(pool);
        let ann = user(&client, "ann").await;
        let bob = user(&client, "bob").await;
        let post_id = post(&client, ann, "Georgia").await;

        let first = client
            .add_comment(bob, post_id, &CommentContent::new("Khachapuri!").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.comments_count, 1);
        assert_eq!(first.comment.author.id, bob);

        let second = client
            .add_comment(ann, post_id, &CommentContent::new("Every day.").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.comments_count, 2);

        let comments = client.list_comments(post_id).await.unwrap();
        let ids: Vec<_> = comments.iter().map(|comment| comment.id).collect();
        assert_eq!(ids, vec![first.comment.id, second.comment.id]);

        let stored = client.fetch_post(post_id, None).await.unwrap().unwrap();
        assert_eq!(stored.comments_count, 2);
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn follow_toggles_back(pool: PgPool) {
        let client = DbClient::new(pool);
        let ann = user(&client, "ann").await;
        let bob = user(&client, "bob").await;

        assert_eq!(
            client.toggle_follow(ann, bob).await.unwrap(),
            FollowState::Following
        );
        assert_eq!(
            client.follow_state(ann, bob).await.unwrap(),
            FollowState::Following
        );
        let counts = client.relationship_counts(bob).await.unwrap();
        assert_eq!((counts.follower_count, counts.following_count), (1, 0));

        let followers = client
            .list_followers(bob, PageRequest::new(1, 20).unwrap())
            .await
            .unwrap();
        assert_eq!(followers.items.len(), 1);
        assert_eq!(followers.items[0].id, ann);

        assert_eq!(
            client.toggle_follow(ann, bob).await.unwrap(),
            FollowState::NotFollowing
        );
        assert!(client.following_ids(ann).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn feed_query_lists_followed_authors(pool: PgPool) {
        let client = DbClient::new(pool);
        let ann = user(&client, "ann").await;
        let bob = user(&client, "bob").await;
        let cid = user(&client, "cid").await;
        let older = post(&client, bob, "Spain").await;
        post(&client, cid, "Spain").await;
        let newer = post(&client, bob, "Portugal").await;

        client.toggle_follow(ann, bob).await.unwrap();
        let following = client.following_ids(ann).await.unwrap();

        let feed = client
            .list_posts(
                &PostQuery::by_authors(following),
                PageRequest::new(1, 10).unwrap(),
                Some(ann),
            )
            .await
            .unwrap();
        let ids: Vec<_> = feed.items.iter().map(|post| post.id).collect();
        assert_eq!(ids, vec![newer, older]);
        assert_eq!(feed.pagination.total_items, 2);

        let empty = client
            .list_posts(
                &PostQuery::by_authors(Vec::new()),
                PageRequest::new(1, 10).unwrap(),
                Some(ann),
            )
            .await
            .unwrap();
        assert!(empty.items.is_empty());
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn own_posts_and_edits(pool: PgPool) {
        let client = DbClient::new(pool.clone());
        let ann = user(&client, "ann").await;
        let bob = user(&client, "bob").await;
        let draft = post(&client, ann, "Malta").await;
        sqlx::query("UPDATE posts.posts SET is_published = FALSE WHERE post_id = $1")
            .bind(draft.get())
            .execute(&pool)
            .await
            .unwrap();

        let own = client
            .list_posts(&PostQuery::own(ann), PageRequest::new(1, 10).unwrap(), Some(ann))
            .await
            .unwrap();
        assert_eq!(own.pagination.total_items, 1);
        assert!(!own.items[0].is_published);
        assert!(
            client
                .list_posts(
                    &PostQuery::by_authors(vec![ann]),
                    PageRequest::new(1, 10).unwrap(),
                    None,
                )
                .await
                .unwrap()
                .items
                .is_empty()
        );

        let edit = CreatePost {
            images: vec!["https://img.example.com/valletta.jpg".to_owned()],
            ..new_post("Malta")
        };
        assert!(client.update_post(bob, draft, &edit).await.unwrap().is_none());
        let updated = client.update_post(ann, draft, &edit).await.unwrap().unwrap();
        assert_eq!(updated.images, edit.images);
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn search_and_profile_updates(pool: PgPool) {
        let client = DbClient::new(pool);
        let ann = user(&client, "ann").await;
        let carl = user(&client, "carl").await;
        user(&client, "dora").await;

        let renamed = UpdateProfile {
            last_name: Some(PersonName::new("Hanna").unwrap()),
            ..UpdateProfile::default()
        };
        let account = client.update_profile(carl, &renamed).await.unwrap().unwrap();
        assert_eq!(account.user.last_name.as_deref(), Some("Hanna"));
        assert_eq!(account.user.first_name, None);

        let found = client
            .search_users(&SearchTerm::new("aNn").unwrap(), PageRequest::new(1, 20).unwrap())
            .await
            .unwrap();
        let ids: Vec<_> = found.items.iter().map(|user| user.id).collect();
        assert_eq!(ids, vec![ann, carl]);

        let literal = client
            .search_users(&SearchTerm::new("a%").unwrap(), PageRequest::new(1, 20).unwrap())
            .await
            .unwrap();
        assert!(literal.items.is_empty());
    }
}
