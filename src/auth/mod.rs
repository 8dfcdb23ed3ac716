//! Request authentication.
//!
//! Two independent checks: a pre-shared key guarding the whole API
//! (constant-time comparison), and the signed-in identity forwarded by the
//! upstream identity provider in `x-user-*` headers.

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use validator::ValidateEmail;

use crate::errors::AppError;
use crate::session::Identity;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";

/// PSK authentication layer function that takes the expected PSK as a parameter.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // If no PSK is configured, allow all requests (dev mode)
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    let provided = header_value(request.headers(), API_KEY_HEADER);

    match provided {
        Some(provided_key) => {
            if constant_time_compare(&provided_key, &expected) {
                next.run(request).await
            } else {
                unauthorized_response("Invalid API key")
            }
        }
        None => {
            // Also check Authorization header as bearer token
            let bearer = header_value(request.headers(), header::AUTHORIZATION.as_str())
                .and_then(|s| s.strip_prefix("Bearer ").map(str::to_string));

            match bearer {
                Some(bearer_key) if constant_time_compare(&bearer_key, &expected) => {
                    next.run(request).await
                }
                _ => unauthorized_response("Missing or invalid API key"),
            }
        }
    }
}

/// The signed-in user, as forwarded by the identity provider.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_headers(&parts.headers)
    }
}

fn identity_from_headers(headers: &HeaderMap) -> Result<Identity, AppError> {
    let uid = header_value(headers, USER_ID_HEADER)
        .map(|uid| uid.trim().to_string())
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| AppError::Unauthorized("A signed-in user is required".to_string()))?;

    let email = header_value(headers, USER_EMAIL_HEADER)
        .map(|email| email.trim().to_string())
        .unwrap_or_default();
    if !email.is_empty() && !email.validate_email() {
        return Err(AppError::Validation(format!(
            "Invalid {} header",
            USER_EMAIL_HEADER
        )));
    }

    let display_name = header_value(headers, USER_NAME_HEADER).filter(|n| !n.trim().is_empty());

    Ok(Identity::new(uid, email, display_name))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn unauthorized_response(message: &str) -> Response {
    AppError::Unauthorized(message.to_string()).into_response()
}
