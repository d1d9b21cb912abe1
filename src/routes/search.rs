use rocket::serde::json::Json;
use rocket::{State, post};
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::models::SearchHit;
use crate::search::{SearchConfig, SearchEngine};

/// Search request body. `k` falls back to the configured default when absent.
#[derive(Debug, Deserialize, JsonSchema, Default)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub k: Option<usize>,
}

/// Ranked search results, best thread first.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}

/// Rank threads against a free-text query and return the best-matching
/// message of each relevant thread.
#[openapi(tag = "Search")]
#[post("/search", data = "<request>")]
pub async fn search(
    request: Option<Json<SearchRequest>>,
    engine: &State<RwLock<SearchEngine>>,
    config: &State<SearchConfig>,
) -> Result<Json<SearchResponse>, ApiError> {
    let request = request.map(Json::into_inner).unwrap_or_default();

    let query = request
        .query
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query is required".to_string()));
    }

    let k = request.k.unwrap_or(config.top_k);

    let engine = engine.read().await;
    let results = engine
        .search(&query, k)
        .await
        .map_err(|err| ApiError::InternalError(err.to_string()))?;

    log::debug!("query '{}' produced {} results", query, results.len());

    Ok(Json(SearchResponse { results }))
}
