use crate::{server::ServerRouter, social::SocialError};
use axum::Router;
use serde::{Deserialize, Serialize};
use traveltales_common::model::{
    pagination::{PageRequest, Pagination},
    post::Post,
};

mod auth;
mod feed;
mod health;
mod posts;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(users::routes())
        .merge(posts::routes())
        .merge(feed::routes())
}

const DEFAULT_POST_PAGE_SIZE: u32 = 10;
const DEFAULT_USER_PAGE_SIZE: u32 = 20;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct PageQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

impl PageQuery {
    fn request(self, default_limit: u32) -> Result<PageRequest, SocialError> {
        Ok(PageRequest::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(default_limit),
        )?)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct PostPage {
    posts: Vec<Post>,
    pagination: Pagination,
}
