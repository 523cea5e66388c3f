use crate::social::{
    Result, SocialError,
    graph::{is_following, relationship_counts, resolve_username},
};
use tracing::info;
use traveltales_common::model::{
    Id,
    pagination::{Page, PageRequest},
    post::{PROFILE_RECENT_POSTS, PostQuery},
    text::SearchTerm,
    user::{Profile, UpdateProfile, User, UserAccount, UserMarker},
};
use traveltales_db::Store;

/// Active users whose username or real name contains `query`. The trimmed
/// query needs at least two characters.
pub async fn search_users(
    store: &dyn Store,
    query: &str,
    page: PageRequest,
) -> Result<Page<User>> {
    let term = SearchTerm::new(query)?;

    Ok(store.search_users(&term, page).await?)
}

pub async fn update_profile(
    store: &dyn Store,
    user: Id<UserMarker>,
    profile: &UpdateProfile,
) -> Result<UserAccount> {
    let account = store
        .update_profile(user, profile)
        .await?
        .ok_or(SocialError::UserByIdNotFound(user))?;
    info!(%user, "Updated profile");

    Ok(account)
}

/// The public profile of an active user: follow counts, whether the viewer
/// follows them, and their latest published posts.
pub async fn get_profile(
    store: &dyn Store,
    username: &str,
    viewer: Option<Id<UserMarker>>,
) -> Result<Profile> {
    let account = resolve_username(store, username).await?;
    let user_id = account.user.id;

    let counts = relationship_counts(store, user_id).await?;
    let is_following = is_following(store, viewer, user_id).await?;

    let recent = PageRequest::new(1, PROFILE_RECENT_POSTS)?;
    let recent_posts = store
        .list_posts(&PostQuery::by_authors(vec![user_id]), recent, viewer)
        .await?
        .items
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Profile {
        user: account.user,
        bio: account.bio,
        created_at: account.created_at,
        counts,
        is_following,
        recent_posts,
    })
}

#[cfg(test)]
mod tests {
    use crate::social::{
        SocialError,
        graph::toggle_follow,
        profiles::{get_profile, search_users, update_profile},
        test_support::{publish, register},
    };
    use traveltales_common::model::{
        Id,
        pagination::PageRequest,
        text::{InvalidTextError, PersonName},
        user::UpdateProfile,
    };
    use traveltales_db::MemoryStore;

    #[tokio::test]
    async fn profile_counts_and_recent_posts() {
        let store = MemoryStore::new();
        let ann = register(&store, "ann").await;
        let bob = register(&store, "bob").await;
        toggle_follow(&store, bob, "ann").await.unwrap();

        let mut posts = Vec::new();
        for _ in 0..7 {
            posts.push(publish(&store, ann, "Malta").await);
        }

        let as_bob = get_profile(&store, "ann", Some(bob)).await.unwrap();
        assert_eq!(as_bob.user.id, ann);
        assert_eq!(as_bob.counts.follower_count, 1);
        assert_eq!(as_bob.counts.following_count, 0);
        assert!(as_bob.is_following);
        assert_eq!(as_bob.recent_posts.len(), 5);
        assert_eq!(as_bob.recent_posts[0].id, posts[6]);

        assert!(!get_profile(&store, "ann", Some(ann)).await.unwrap().is_following);
        assert!(!get_profile(&store, "ann", None).await.unwrap().is_following);
    }

    #[tokio::test]
    async fn inactive_users_have_no_profile() {
        let store = MemoryStore::new();
        let ann = register(&store, "ann").await;
        store.set_user_active(ann, false).await;

        assert!(matches!(
            get_profile(&store, "ann", None).await,
            Err(SocialError::UserByUsernameNotFound(name)) if name == "ann"
        ));
    }

    #[tokio::test]
    async fn search_needs_two_characters() {
        let store = MemoryStore::new();
        register(&store, "ann").await;
        register(&store, "hannah").await;
        register(&store, "bob").await;

        assert!(matches!(
            search_users(&store, " a ", PageRequest::new(1, 20).unwrap()).await,
            Err(SocialError::InvalidText(InvalidTextError::TooShort { min: 2, .. }))
        ));

        let found = search_users(&store, " an ", PageRequest::new(1, 20).unwrap())
            .await
            .unwrap();
        let names: Vec<_> = found.items.iter().map(|user| user.username.get()).collect();
        assert_eq!(names, vec!["ann", "hannah"]);
    }

    #[tokio::test]
    async fn profile_edits_show_up_on_the_profile() {
        let store = MemoryStore::new();
        let ann = register(&store, "ann").await;

        let edit = UpdateProfile {
            first_name: Some(PersonName::new("Ann").unwrap()),
            bio: Some("Overland whenever possible.".to_owned()),
            ..UpdateProfile::default()
        };
        let account = update_profile(&store, ann, &edit).await.unwrap();
        assert_eq!(account.user.first_name.as_deref(), Some("Ann"));

        let profile = get_profile(&store, "ann", None).await.unwrap();
        assert_eq!(profile.user.first_name.as_deref(), Some("Ann"));
        assert_eq!(profile.bio.as_deref(), Some("Overland whenever possible."));

        assert!(matches!(
            update_profile(&store, Id::new(999), &edit).await,
            Err(SocialError::UserByIdNotFound(_))
        ));
    }
}
