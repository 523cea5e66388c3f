use crate::server::{ServerState, SessionPolicy, routes};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use traveltales_db::MemoryStore;

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let router = routes().with_state(ServerState {
            store: store.clone(),
            sessions: SessionPolicy::default(),
        });

        Self { router, store }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    /// Registers `username` and returns `(user id, bearer token)`.
    async fn register(&self, username: &str) -> (i64, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"username": username, "email": format!("{username}@example.com")})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        (
            body["user"]["id"].as_i64().unwrap(),
            body["token"].as_str().unwrap().to_owned(),
        )
    }

    async fn publish(&self, token: &str, country: &str) -> i64 {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/posts",
                Some(token),
                Some(json!({
                    "title": format!("Days in {country}"),
                    "content": "Buses, beaches and a lot of street food.",
                    "country": country,
                    "visitDate": "2024-02-01",
                    "tags": ["food"],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        body["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn health_and_unknown_routes() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");

    let (status, body) = app.send(Method::GET, "/api/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn registration_and_auth_gate() {
    let app = TestApp::new();
    let (id, token) = app.register("ann").await;

    let (status, body) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], id);
    assert_eq!(body["user"]["username"], "ann");
    assert_eq!(body["user"]["email"], "ann@example.com");

    let (status, body) = app.send(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "Unauthorized");

    let (status, body) = app
        .send(Method::GET, "/api/auth/me", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "Unauthorized");

    let (status, body) = app
        .send(Method::GET, "/api/auth/me", Some("17:AAAA:AAAA"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "Unauthorized");

    let (status, _) = app
        .send(Method::GET, "/api/users/ann", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"username": "ann", "email": "other@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "Conflict");

    app.store.set_user_active(id.into(), false).await;
    let (status, _) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn follow_toggle_over_http() {
    let app = TestApp::new();
    let (_, ann) = app.register("ann").await;
    let (_, bob) = app.register("bob").await;

    let (status, body) = app
        .send(Method::POST, "/api/users/bob/follow", Some(&ann), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"isFollowing": true}));

    let (_, profile) = app.send(Method::GET, "/api/users/bob", Some(&ann), None).await;
    assert_eq!(profile["followerCount"], 1);
    assert_eq!(profile["isFollowing"], true);

    let (_, anonymous) = app.send(Method::GET, "/api/users/bob", None, None).await;
    assert_eq!(anonymous["isFollowing"], false);

    let (_, followers) = app
        .send(Method::GET, "/api/users/bob/followers", None, None)
        .await;
    assert_eq!(followers["users"][0]["username"], "ann");
    assert_eq!(followers["pagination"]["totalItems"], 1);

    let (_, body) = app
        .send(Method::POST, "/api/users/bob/follow", Some(&ann), None)
        .await;
    assert_eq!(body, json!({"isFollowing": false}));

    let (status, body) = app
        .send(Method::POST, "/api/users/bob/follow", Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidOperation");

    let (status, body) = app
        .send(Method::POST, "/api/users/nobody/follow", Some(&ann), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");

    let (status, _) = app.send(Method::POST, "/api/users/bob/follow", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn vote_and_comment_over_http() {
    let app = TestApp::new();
    let (_, ann) = app.register("ann").await;
    let post_id = app.publish(&ann, "Morocco").await;
    let like = format!("/api/posts/{post_id}/like");

    let triple = [
        (json!({"isLike": true}), json!({"likesCount": 1, "userVote": true})),
        (json!({"isLike": true}), json!({"likesCount": 0, "userVote": null})),
        (json!({"isLike": false}), json!({"likesCount": 0, "userVote": false})),
    ];
    for (request, expected) in triple {
        let (status, body) = app.send(Method::POST, &like, Some(&ann), Some(request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, expected);
    }

    let (status, body) = app
        .send(Method::POST, &like, Some(&ann), Some(json!({"isLike": "yes"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidOperation");

    let (status, body) = app
        .send(Method::POST, "/api/posts/9999/like", Some(&ann), Some(json!({"isLike": true})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");

    let comments = format!("/api/posts/{post_id}/comments");
    let (status, body) = app
        .send(Method::POST, &comments, Some(&ann), Some(json!({"content": "   "})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidInput");

    let (status, body) = app
        .send(Method::POST, &comments, Some(&ann), Some(json!({"content": " Lovely "})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["commentsCount"], 1);
    assert_eq!(body["comment"]["content"], "Lovely");
    assert_eq!(body["comment"]["author"]["username"], "ann");

    let (_, detail) = app
        .send(Method::GET, &format!("/api/posts/{post_id}"), Some(&ann), None)
        .await;
    assert_eq!(detail["userVote"], false);
    assert_eq!(detail["comments"][0]["content"], "Lovely");
    assert_eq!(detail["visitDate"], "2024-02-01");
}

#[tokio::test]
async fn feed_over_http() {
    let app = TestApp::new();
    let (_, viewer) = app.register("viewer").await;
    let (_, author) = app.register("author").await;

    let (status, body) = app
        .send(Method::GET, "/api/feed/following?page=2", Some(&viewer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "posts": [],
            "pagination": {
                "currentPage": 2,
                "totalPages": 0,
                "totalItems": 0,
                "hasNext": false,
                "hasPrev": false,
            }
        })
    );

    app.send(Method::POST, "/api/users/author/follow", Some(&viewer), None)
        .await;
    let post_id = app.publish(&author, "Japan").await;

    let (_, body) = app
        .send(Method::GET, "/api/feed/following", Some(&viewer), None)
        .await;
    assert_eq!(body["posts"][0]["id"], post_id);
    assert_eq!(body["posts"][0]["userVote"], Value::Null);
    assert_eq!(body["pagination"]["totalPages"], 1);

    let (status, body) = app
        .send(Method::GET, "/api/feed/following?page=0", Some(&viewer), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidInput");

    let (status, _) = app.send(Method::GET, "/api/feed/following", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn post_catalogue_over_http() {
    let app = TestApp::new();
    let (_, ann) = app.register("ann").await;
    let (_, bob) = app.register("bob").await;
    let kept = app.publish(&ann, "New Zealand").await;
    let removed = app.publish(&ann, "Portugal").await;

    let (status, body) = app
        .send(Method::DELETE, &format!("/api/posts/{removed}"), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");

    let (status, body) = app
        .send(Method::DELETE, &format!("/api/posts/{removed}"), Some(&ann), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = app
        .send(Method::GET, "/api/posts?country=zeal&author=AN", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["totalItems"], 1);
    assert_eq!(body["posts"][0]["id"], kept);
    assert_eq!(body["posts"][0]["author"]["username"], "ann");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/posts",
            Some(&ann),
            Some(json!({
                "title": "Time travel",
                "content": "A trip that has not happened yet.",
                "country": "Narnia",
                "visitDate": "2999-01-01",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidInput");

    let (status, _) = app
        .send(Method::GET, "/api/posts?limit=101", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn post_editing_over_http() {
    let app = TestApp::new();
    let (_, ann) = app.register("ann").await;
    let (_, bob) = app.register("bob").await;
    let post_id = app.publish(&ann, "Greece").await;
    let draft = app.publish(&ann, "Albania").await;
    app.store.set_post_published(draft.into(), false).await;
    let uri = format!("/api/posts/{post_id}");

    let edit = json!({
        "title": "Island hopping",
        "content": "Ferries every morning, octopus every night.",
        "country": "Greece",
        "visitDate": "2024-02-03",
        "images": ["https://img.example.com/naxos.jpg"],
    });

    let (status, body) = app
        .send(Method::PUT, &uri, Some(&bob), Some(edit.clone()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");

    let (status, _) = app.send(Method::PUT, &uri, None, Some(edit.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.send(Method::PUT, &uri, Some(&ann), Some(edit)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Island hopping");
    assert_eq!(body["images"], json!(["https://img.example.com/naxos.jpg"]));
    assert_eq!(body["tags"], json!([]));

    let (status, body) = app
        .send(
            Method::PUT,
            &uri,
            Some(&ann),
            Some(json!({
                "title": "Hi",
                "content": "Too short a title.",
                "country": "Greece",
                "visitDate": "2024-02-03",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidInput");

    let (status, body) = app
        .send(Method::GET, "/api/posts/user/me", Some(&ann), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["totalItems"], 2);
    assert_eq!(body["posts"][0]["id"], draft);
    assert_eq!(body["posts"][0]["isPublished"], false);

    let (_, body) = app
        .send(Method::GET, "/api/posts/user/me", Some(&bob), None)
        .await;
    assert_eq!(body["posts"], json!([]));

    let (status, _) = app.send(Method::GET, "/api/posts/user/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn search_and_profile_edits_over_http() {
    let app = TestApp::new();
    let (_, ann) = app.register("ann").await;
    app.register("joanna").await;
    let (hidden, _) = app.register("annette").await;
    let (_, dora) = app.register("dora").await;

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/auth/profile",
            Some(&dora),
            Some(json!({"lastName": " Annan ", "bio": "Sahel by bus"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["lastName"], "Annan");
    assert_eq!(body["user"]["bio"], "Sahel by bus");
    assert_eq!(body["user"]["email"], "dora@example.com");

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/auth/profile",
            Some(&ann),
            Some(json!({"firstName": "   "})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidInput");

    let (status, _) = app
        .send(Method::PUT, "/api/auth/profile", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.store.set_user_active(hidden.into(), false).await;
    let (status, body) = app
        .send(Method::GET, "/api/users/search/ANN?limit=2", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"][0]["username"], "ann");
    assert_eq!(body["users"][1]["username"], "dora");
    assert_eq!(body["pagination"]["totalItems"], 3);
    assert_eq!(body["pagination"]["hasNext"], true);

    let (status, body) = app
        .send(Method::GET, "/api/users/search/%20a%20", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidInput");
}
