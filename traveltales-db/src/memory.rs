//! In-process [`Store`] used as the test double for the components and the
//! HTTP layer.
//!
//! All state sits behind one async mutex, so every method is trivially atomic.

use crate::store::{DbError, Result, Store};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use traveltales_common::model::{
    Id,
    auth::{Session, SessionTokenHash},
    comment::{Comment, CommentAdded, CommentMarker},
    engagement::{Vote, VoteOutcome, VoteTransition},
    graph::{FollowState, FollowTransition, RelationshipCounts},
    pagination::{Page, PageRequest, Pagination},
    post::{CreatePost, Post, PostMarker, PostQuery},
    text::{CommentContent, Country, PostContent, PostTitle, SearchTerm},
    user::{CreateUser, UpdateProfile, User, UserAccount, UserMarker, Username},
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

/// Stored counters next to the cardinalities they are derived from.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CounterSnapshot {
    pub likes_count: u32,
    pub like_records: u32,
    pub dislike_records: u32,
    pub comments_count: u32,
    pub comment_records: u32,
}

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i64,
    pending_conflicts: u32,
    users: BTreeMap<Id<UserMarker>, UserAccount>,
    sessions: HashMap<SessionTokenHash, Session>,
    follows: BTreeMap<(Id<UserMarker>, Id<UserMarker>), OffsetDateTime>,
    posts: BTreeMap<Id<PostMarker>, PostRow>,
    likes: BTreeMap<(Id<UserMarker>, Id<PostMarker>), Vote>,
    comments: BTreeMap<Id<CommentMarker>, CommentRow>,
}

#[derive(Clone, Debug)]
struct PostRow {
    author: Id<UserMarker>,
    title: PostTitle,
    content: PostContent,
    country: Country,
    visit_date: time::Date,
    tags: Vec<String>,
    images: Vec<String>,
    is_published: bool,
    likes_count: u32,
    comments_count: u32,
    created_at: OffsetDateTime,
}

#[derive(Clone, Debug)]
struct CommentRow {
    post_id: Id<PostMarker>,
    author: Id<UserMarker>,
    content: CommentContent,
    created_at: OffsetDateTime,
}

fn count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

fn count_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = count(items.len());
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);

    Page {
        items: items.into_iter().skip(offset).take(limit).collect(),
        pagination: Pagination::new(page, total),
    }
}

impl MemoryState {
    fn next_id<Marker>(&mut self) -> Id<Marker> {
        self.last_id += 1;
        Id::new(self.last_id)
    }

    /// Simulates a unique-index race for the next mutation, if one is pending.
    fn take_conflict(&mut self, constraint: &str) -> Result<()> {
        if self.pending_conflicts > 0 {
            self.pending_conflicts -= 1;
            return Err(DbError::UniqueViolation(constraint.to_owned()));
        }
        Ok(())
    }

    fn user(&self, id: Id<UserMarker>) -> Result<&User> {
        self.users
            .get(&id)
            .map(|account| &account.user)
            .ok_or(DbError::MissingReference("user"))
    }

    fn post(&self, id: Id<PostMarker>, row: &PostRow, viewer: Option<Id<UserMarker>>) -> Result<Post> {
        Ok(Post {
            id,
            author: self.user(row.author)?.clone(),
            title: row.title.clone(),
            content: row.content.clone(),
            country: row.country.clone(),
            visit_date: row.visit_date,
            tags: row.tags.clone(),
            images: row.images.clone(),
            is_published: row.is_published,
            likes_count: row.likes_count,
            comments_count: row.comments_count,
            created_at: row.created_at,
            user_vote: viewer.and_then(|viewer| self.likes.get(&(viewer, id)).copied()),
        })
    }

    fn comment(&self, id: Id<CommentMarker>, row: &CommentRow) -> Result<Comment> {
        Ok(Comment {
            id,
            post_id: row.post_id,
            author: self.user(row.author)?.clone(),
            content: row.content.clone(),
            created_at: row.created_at,
        })
    }

    fn matches(&self, row: &PostRow, query: &PostQuery) -> bool {
        (query.include_unpublished || row.is_published)
            && query
                .authors
                .as_ref()
                .is_none_or(|authors| authors.contains(&row.author))
            && query
                .country
                .as_deref()
                .is_none_or(|country| contains_ignore_case(row.country.get(), country))
            && query.author_username.as_deref().is_none_or(|username| {
                self.users
                    .get(&row.author)
                    .is_some_and(|account| contains_ignore_case(account.user.username.get(), username))
            })
    }

    fn active_users(&self, ids: impl Iterator<Item = Id<UserMarker>>) -> Vec<User> {
        ids.filter_map(|id| self.users.get(&id))
            .filter(|account| account.is_active)
            .map(|account| account.user.clone())
            .collect()
    }

    /// Edges touching `user` on the given side, newest first.
    fn edges(&self, user: Id<UserMarker>, followers: bool) -> Vec<Id<UserMarker>> {
        let mut edges: Vec<_> = self
            .follows
            .iter()
            .filter_map(|(&(follower, following), &created_at)| {
                if followers && following == user {
                    Some((created_at, follower))
                } else if !followers && follower == user {
                    Some((created_at, following))
                } else {
                    None
                }
            })
            .collect();
        edges.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        edges.into_iter().map(|(_, id)| id).collect()
    }

    fn recompute_likes(&mut self, post_id: Id<PostMarker>) -> u32 {
        let likes = count_u32(
            self.likes
                .iter()
                .filter(|((_, post), vote)| *post == post_id && vote.is_like())
                .count(),
        );
        if let Some(row) = self.posts.get_mut(&post_id) {
            row.likes_count = likes;
        }
        likes
    }

    fn recompute_comments(&mut self, post_id: Id<PostMarker>) -> u32 {
        let comments = count_u32(
            self.comments
                .values()
                .filter(|comment| comment.post_id == post_id)
                .count(),
        );
        if let Some(row) = self.posts.get_mut(&post_id) {
            row.comments_count = comments;
        }
        comments
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_user_active(&self, user: Id<UserMarker>, is_active: bool) {
        if let Some(account) = self.state.lock().await.users.get_mut(&user) {
            account.is_active = is_active;
        }
    }

    pub async fn set_post_published(&self, post_id: Id<PostMarker>, is_published: bool) {
        if let Some(row) = self.state.lock().await.posts.get_mut(&post_id) {
            row.is_published = is_published;
        }
    }

    /// Makes the next `times` toggle mutations fail as if a concurrent request
    /// had won the race on a unique index.
    pub async fn inject_unique_violations(&self, times: u32) {
        self.state.lock().await.pending_conflicts = times;
    }

    pub async fn counter_snapshot(&self, post_id: Id<PostMarker>) -> Option<CounterSnapshot> {
        let state = self.state.lock().await;
        let row = state.posts.get(&post_id)?;

        let votes: Vec<Vote> = state
            .likes
            .iter()
            .filter(|((_, post), _)| *post == post_id)
            .map(|(_, vote)| *vote)
            .collect();

        Some(CounterSnapshot {
            likes_count: row.likes_count,
            like_records: count_u32(votes.iter().filter(|vote| vote.is_like()).count()),
            dislike_records: count_u32(votes.iter().filter(|vote| !vote.is_like()).count()),
            comments_count: row.comments_count,
            comment_records: count_u32(
                state
                    .comments
                    .values()
                    .filter(|comment| comment.post_id == post_id)
                    .count(),
            ),
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: &CreateUser) -> Result<UserAccount> {
        let mut state = self.state.lock().await;

        if state
            .users
            .values()
            .any(|account| account.user.username == user.username)
        {
            return Err(DbError::UniqueViolation("users_username_key".to_owned()));
        }
        if state.users.values().any(|account| account.email == user.email) {
            return Err(DbError::UniqueViolation("users_email_key".to_owned()));
        }

        let id = state.next_id();
        let account = UserAccount {
            user: User {
                id,
                username: user.username.clone(),
                first_name: user.first_name.clone().map(|name| name.into_inner()),
                last_name: user.last_name.clone().map(|name| name.into_inner()),
                profile_image: None,
            },
            email: user.email.clone(),
            bio: user.bio.clone(),
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        state.users.insert(id, account.clone());

        Ok(account)
    }

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<UserAccount>> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn fetch_active_user_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<UserAccount>> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .values()
            .find(|account| account.is_active && &account.user.username == username)
            .cloned())
    }

    async fn search_users(&self, term: &SearchTerm, page: PageRequest) -> Result<Page<User>> {
        let state = self.state.lock().await;
        let term = term.get();

        let mut users: Vec<_> = state
            .users
            .values()
            .filter(|account| account.is_active)
            .map(|account| &account.user)
            .filter(|user| {
                contains_ignore_case(user.username.get(), term)
                    || [&user.first_name, &user.last_name]
                        .into_iter()
                        .flatten()
                        .any(|name| contains_ignore_case(name, term))
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.get().cmp(b.username.get()).then(a.id.cmp(&b.id)));

        Ok(paginate(users, page))
    }

    async fn update_profile(
        &self,
        user: Id<UserMarker>,
        profile: &UpdateProfile,
    ) -> Result<Option<UserAccount>> {
        let mut state = self.state.lock().await;
        let Some(account) = state.users.get_mut(&user) else {
            return Ok(None);
        };

        if let Some(first_name) = &profile.first_name {
            account.user.first_name = Some(first_name.get().to_owned());
        }
        if let Some(last_name) = &profile.last_name {
            account.user.last_name = Some(last_name.get().to_owned());
        }
        if let Some(bio) = &profile.bio {
            account.bio = Some(bio.clone());
        }
        if let Some(profile_image) = &profile.profile_image {
            account.user.profile_image = Some(profile_image.get().to_owned());
        }

        Ok(Some(account.clone()))
    }

    async fn create_session(&self, session: &Session) -> Result<()> {
        let mut state = self.state.lock().await;
        state.user(session.user)?;
        if state.sessions.contains_key(&session.token_hash) {
            return Err(DbError::UniqueViolation("sessions_pkey".to_owned()));
        }
        state
            .sessions
            .insert(session.token_hash.clone(), session.clone());

        Ok(())
    }

    async fn fetch_session(&self, token_hash: &SessionTokenHash) -> Result<Option<Session>> {
        Ok(self.state.lock().await.sessions.get(token_hash).cloned())
    }

    async fn follow_state(
        &self,
        follower: Id<UserMarker>,
        following: Id<UserMarker>,
    ) -> Result<FollowState> {
        let state = self.state.lock().await;
        Ok(FollowState::from_edge(
            state.follows.contains_key(&(follower, following)),
        ))
    }

    async fn toggle_follow(
        &self,
        follower: Id<UserMarker>,
        following: Id<UserMarker>,
    ) -> Result<FollowState> {
        let mut state = self.state.lock().await;
        state.take_conflict("follows_pkey")?;
        state.user(follower)?;
        state.user(following)?;

        let pair = (follower, following);
        let transition = FollowState::from_edge(state.follows.contains_key(&pair)).toggle();
        match transition {
            FollowTransition::Follow => {
                state.follows.insert(pair, OffsetDateTime::now_utc());
            }
            FollowTransition::Unfollow => {
                state.follows.remove(&pair);
            }
        }

        Ok(transition.resulting_state())
    }

    async fn relationship_counts(&self, user: Id<UserMarker>) -> Result<RelationshipCounts> {
        let state = self.state.lock().await;
        Ok(RelationshipCounts {
            follower_count: count(state.follows.keys().filter(|(_, to)| *to == user).count()),
            following_count: count(state.follows.keys().filter(|(from, _)| *from == user).count()),
        })
    }

    async fn following_ids(&self, user: Id<UserMarker>) -> Result<Vec<Id<UserMarker>>> {
        let state = self.state.lock().await;
        Ok(state
            .follows
            .keys()
            .filter(|(from, _)| *from == user)
            .map(|(_, to)| *to)
            .collect())
    }

    async fn list_followers(&self, user: Id<UserMarker>, page: PageRequest) -> Result<Page<User>> {
        let state = self.state.lock().await;
        let users = state.active_users(state.edges(user, true).into_iter());
        Ok(paginate(users, page))
    }

    async fn list_following(&self, user: Id<UserMarker>, page: PageRequest) -> Result<Page<User>> {
        let state = self.state.lock().await;
        let users = state.active_users(state.edges(user, false).into_iter());
        Ok(paginate(users, page))
    }

    async fn create_post(&self, author: Id<UserMarker>, post: &CreatePost) -> Result<Post> {
        let mut state = self.state.lock().await;
        state.user(author)?;

        let id = state.next_id();
        let row = PostRow {
            author,
            title: post.title.clone(),
            content: post.content.clone(),
            country: post.country.clone(),
            visit_date: post.visit_date,
            tags: post.tags.clone(),
            images: post.images.clone(),
            is_published: true,
            likes_count: 0,
            comments_count: 0,
            created_at: OffsetDateTime::now_utc(),
        };
        let created = state.post(id, &row, Some(author))?;
        state.posts.insert(id, row);

        Ok(created)
    }

    async fn update_post(
        &self,
        author: Id<UserMarker>,
        post_id: Id<PostMarker>,
        post: &CreatePost,
    ) -> Result<Option<Post>> {
        let mut state = self.state.lock().await;
        let Some(row) = state
            .posts
            .get_mut(&post_id)
            .filter(|row| row.author == author)
        else {
            return Ok(None);
        };

        row.title = post.title.clone();
        row.content = post.content.clone();
        row.country = post.country.clone();
        row.visit_date = post.visit_date;
        row.tags = post.tags.clone();
        row.images = post.images.clone();

        let row = row.clone();
        state.post(post_id, &row, Some(author)).map(Some)
    }

    async fn fetch_post(
        &self,
        post_id: Id<PostMarker>,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Option<Post>> {
        let state = self.state.lock().await;
        state
            .posts
            .get(&post_id)
            .filter(|row| row.is_published)
            .map(|row| state.post(post_id, row, viewer))
            .transpose()
    }

    async fn list_posts(
        &self,
        query: &PostQuery,
        page: PageRequest,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Page<Post>> {
        let state = self.state.lock().await;

        let mut matching: Vec<_> = state
            .posts
            .iter()
            .filter(|(_, row)| state.matches(row, query))
            .collect();
        matching.sort_by(|(a_id, a), (b_id, b)| {
            b.created_at.cmp(&a.created_at).then(b_id.cmp(a_id))
        });

        let sliced = paginate(matching, page);
        let posts = sliced
            .items
            .into_iter()
            .map(|(id, row)| state.post(*id, row, viewer))
            .collect::<Result<_>>()?;

        Ok(Page {
            items: posts,
            pagination: sliced.pagination,
        })
    }

    async fn delete_post(&self, author: Id<UserMarker>, post_id: Id<PostMarker>) -> Result<bool> {
        let mut state = self.state.lock().await;

        if state.posts.get(&post_id).is_none_or(|row| row.author != author) {
            return Ok(false);
        }

        state.posts.remove(&post_id);
        state.likes.retain(|(_, post), _| *post != post_id);
        state.comments.retain(|_, comment| comment.post_id != post_id);

        Ok(true)
    }

    async fn vote(
        &self,
        user: Id<UserMarker>,
        post_id: Id<PostMarker>,
        vote: Vote,
    ) -> Result<Option<VoteOutcome>> {
        let mut state = self.state.lock().await;
        if !state.posts.contains_key(&post_id) {
            return Ok(None);
        }
        state.take_conflict("likes_pkey")?;
        state.user(user)?;

        let key = (user, post_id);
        let transition = VoteTransition::plan(state.likes.get(&key).copied(), vote);
        match transition {
            VoteTransition::Cast(vote) | VoteTransition::Switch(vote) => {
                state.likes.insert(key, vote);
            }
            VoteTransition::Retract => {
                state.likes.remove(&key);
            }
        }

        Ok(Some(VoteOutcome {
            likes_count: state.recompute_likes(post_id),
            user_vote: transition.resulting_vote(),
        }))
    }

    async fn add_comment(
        &self,
        author: Id<UserMarker>,
        post_id: Id<PostMarker>,
        content: &CommentContent,
    ) -> Result<Option<CommentAdded>> {
        let mut state = self.state.lock().await;
        if !state.posts.contains_key(&post_id) {
            return Ok(None);
        }
        state.user(author)?;

        let id = state.next_id();
        let row = CommentRow {
            post_id,
            author,
            content: content.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        let comment = state.comment(id, &row)?;
        state.comments.insert(id, row);

        Ok(Some(CommentAdded {
            comment,
            comments_count: state.recompute_comments(post_id),
        }))
    }

    async fn list_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let state = self.state.lock().await;
        let mut rows: Vec<_> = state
            .comments
            .iter()
            .filter(|(_, row)| row.post_id == post_id)
            .collect();
        rows.sort_by(|(a_id, a), (b_id, b)| a.created_at.cmp(&b.created_at).then(a_id.cmp(b_id)));

        rows.into_iter()
            .map(|(id, row)| state.comment(*id, row))
            .collect()
    }
}
