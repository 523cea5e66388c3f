use time::macros::date;
use traveltales_common::model::{
    Id,
    post::{CreatePost, PostMarker},
    text::{Country, PostContent, PostTitle},
    user::{CreateUser, Email, UserMarker, Username},
};
use traveltales_db::{MemoryStore, Store};

pub(crate) async fn register(store: &MemoryStore, username: &str) -> Id<UserMarker> {
    let user = CreateUser {
        username: Username::new(username).unwrap(),
        email: Email::new(format!("{username}@example.com")).unwrap(),
        first_name: None,
        last_name: None,
        bio: None,
    };
    store.create_user(&user).await.unwrap().user.id
}

pub(crate) fn new_post(country: &str) -> CreatePost {
    CreatePost {
        title: PostTitle::new(format!("Notes from {country}")).unwrap(),
        content: PostContent::new("Long walks, cheap noodles, one missed train.").unwrap(),
        country: Country::new(country).unwrap(),
        visit_date: date!(2024 - 03 - 10),
        tags: Vec::new(),
        images: Vec::new(),
    }
}

pub(crate) async fn publish(
    store: &MemoryStore,
    author: Id<UserMarker>,
    country: &str,
) -> Id<PostMarker> {
    store
        .create_post(author, &new_post(country))
        .await
        .unwrap()
        .id
}
