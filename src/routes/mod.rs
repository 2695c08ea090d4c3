//! HTTP routes
//!
//! Each module exposes a `handle_*_request` entry point that the server's
//! dispatcher calls with the shared state. Response and error shapes are
//! uniform JSON; helpers here keep the handlers small.

pub mod auth_routes;
pub mod emails;
pub mod health;
pub mod projects;
pub mod stages;

pub use auth_routes::handle_auth_request;
pub use emails::handle_email_request;
pub use health::{health_check, version_info};
pub use projects::handle_project_request;
pub use stages::handle_stage_request;

use bson::oid::ObjectId;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::extract_token_from_header;
use crate::core::CallerContext;
use crate::server::AppState;
use crate::types::TrackError;

pub(crate) type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Uniform JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

// =============================================================================
// Response Helpers
// =============================================================================

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, PATCH, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

/// Map a service error onto its HTTP status and wire code
pub(crate) fn error_response(err: &TrackError) -> Response<BoxBody> {
    json_response(
        err.status(),
        &ErrorResponse {
            error: err.to_string(),
            code: Some(err.code().to_string()),
        },
    )
}

pub(crate) fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, PATCH, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub(crate) fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub(crate) fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

// =============================================================================
// Request Helpers
// =============================================================================

pub(crate) async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
) -> Result<T, TrackError> {
    let body = req
        .collect()
        .await
        .map_err(|e| TrackError::Validation(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > 10240 {
        return Err(TrackError::Validation("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| TrackError::Validation(format!("Invalid JSON: {}", e)))
}

pub(crate) fn get_auth_header(req: &Request<Incoming>) -> Option<String> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Authenticate the request and resolve the caller's context.
///
/// Verifies the bearer token, then walks the account's referral link so
/// every handler downstream works from an explicit scope.
pub(crate) async fn require_caller(
    auth_header: Option<&str>,
    state: &Arc<AppState>,
) -> Result<CallerContext, TrackError> {
    let token = extract_token_from_header(auth_header)
        .ok_or_else(|| TrackError::Auth("missing or malformed authorization header".into()))?;

    let jwt = state.jwt()?;
    let result = jwt.verify_token(token);
    if !result.valid {
        return Err(TrackError::Auth(
            result.error.unwrap_or_else(|| "invalid token".into()),
        ));
    }
    let claims = result
        .claims
        .ok_or_else(|| TrackError::Auth("invalid token".into()))?;

    state.accounts.resolve_caller(&claims).await
}

/// Parse a path segment as an ObjectId, mapping failures to NotFound so
/// malformed ids are indistinguishable from missing documents.
pub(crate) fn parse_object_id(segment: &str, what: &str) -> Result<ObjectId, TrackError> {
    ObjectId::parse_str(segment).map_err(|_| TrackError::NotFound(format!("{what} not found")))
}
