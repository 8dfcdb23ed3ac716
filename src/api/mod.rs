//! REST API module.
//!
//! Thin handlers: each one builds a [`Session`] from the forwarded identity
//! and delegates to the feed operations.

mod comments;
mod feed;
mod notifications;
mod posts;
mod profile;

pub use comments::*;
pub use feed::*;
pub use notifications::*;
pub use posts::*;
pub use profile::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::session::{Identity, Session};
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Maximum number of items a list endpoint returns.
const MAX_LIST_LIMIT: usize = 200;

/// `?limit=` query parameter shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    fn resolve(&self, state: &AppState) -> usize {
        page_limit(self.limit, state)
    }
}

/// Requested limit, defaulting to the configured page size.
fn page_limit(requested: Option<usize>, state: &AppState) -> usize {
    requested
        .unwrap_or(state.config.page_limit)
        .min(MAX_LIST_LIMIT)
}

fn session(state: &AppState, identity: Identity) -> Result<Session, AppError> {
    Session::new(state.store.clone(), identity)
}
