//! Feed, ad and search API endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{page_limit, session, success, ApiResult};
use crate::feed::{self, FeedItem};
use crate::models::{Ad, CreateAdRequest};
use crate::search::{self, SearchFilter, SearchResults, SearchSnapshot};
use crate::session::Identity;
use crate::AppState;

/// Feed query parameters.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<usize>,
    /// Organic posts between promoted items (default: configured interval).
    pub interval: Option<usize>,
}

/// GET /api/feed - Newest posts with promoted items interleaved.
pub async fn get_feed(
    State(state): State<AppState>,
    identity: Identity,
    Query(params): Query<FeedQuery>,
) -> ApiResult<Vec<FeedItem>> {
    let session = session(&state, identity)?;
    let interval = params.interval.unwrap_or(state.config.ad_interval);
    success(feed::assemble_feed(&session, page_limit(params.limit, &state), interval).await?)
}

/// POST /api/ads - Register a promoted item.
pub async fn create_ad(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<CreateAdRequest>,
) -> ApiResult<Ad> {
    let session = session(&state, identity)?;
    success(feed::create_ad(&session, request).await?)
}

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub filter: SearchFilter,
}

/// Search response; `superseded` is set when a newer query from the same
/// user arrived during the debounce delay.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(flatten)]
    pub results: SearchResults,
    pub superseded: bool,
}

/// GET /api/search - Search posts and users.
pub async fn search_feed(
    State(state): State<AppState>,
    identity: Identity,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let session = session(&state, identity)?;

    let debouncer = state.debouncers.for_user(session.uid());
    if debouncer.run(|| ()).await.is_none() {
        return success(SearchResponse {
            results: SearchResults {
                query: params.q.trim().to_string(),
                ..SearchResults::default()
            },
            superseded: true,
        });
    }

    let snapshot = SearchSnapshot::load(&session).await?;
    let results = search::search(&snapshot, &params.q, params.filter);
    tracing::debug!(query = %results.query, total = results.total, "Search completed");

    success(SearchResponse {
        results,
        superseded: false,
    })
}
