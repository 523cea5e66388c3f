use crate::server::{ServerError, ServerRouter, json::Json};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(health)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/health", rejection(ServerError))]
struct HealthPath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct Health {
    status: &'static str,
    service: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

async fn health(HealthPath(): HealthPath) -> Json<Health> {
    Json(Health {
        status: "OK",
        service: "TravelTales API",
        timestamp: OffsetDateTime::now_utc(),
    })
}
