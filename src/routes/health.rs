//! Readiness probe for the search service.

use rocket::serde::json::Json;
use rocket::{State, get};
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::search::SearchConfig;

/// What the readiness probe reports.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    /// Always `"ok"` once the index fairing has ignited; a failed index
    /// build aborts launch, so an answering server is a ready server.
    pub status: String,
    /// Which relevance index variant is answering queries, `"lexical"` or
    /// `"semantic"`.
    pub mode: String,
}

/// Report readiness together with the active index variant.
#[openapi(tag = "Health")]
#[get("/health")]
pub fn health_check(config: &State<SearchConfig>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        mode: config.mode.to_string(),
    })
}
