//! HTTP routes for authentication
//!
//! - POST /auth/register - Create an account (manager, or referred user)
//! - POST /auth/login    - Authenticate and get a JWT token
//! - GET  /auth/me       - Current account info from the token

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{Role, TokenInput};
use crate::db::schemas::AccountDoc;
use crate::routes::{
    cors_preflight, error_response, get_auth_header, json_response, parse_json_body,
    require_caller, BoxBody, ErrorResponse,
};
use crate::server::AppState;
use crate::types::TrackError;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub identifier: String,
    pub password: String,
    /// A manager's account id; when present the new account is a
    /// read-only user scoped to that manager
    #[serde(default)]
    pub referral_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub account_id: String,
    pub identifier: String,
    pub role: Role,
    pub expires_at: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub account_id: String,
    pub identifier: String,
    pub role: Role,
    /// Referring manager's id, for referred users
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
}

// =============================================================================
// Route Handlers
// =============================================================================

async fn handle_register(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let body: RegisterRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let account = match state
        .accounts
        .register(&body.identifier, &body.password, body.referral_code.as_deref())
        .await
    {
        Ok(a) => a,
        Err(e) => return error_response(&e),
    };

    match issue_token(&state, &account) {
        Ok(response) => json_response(StatusCode::CREATED, &response),
        Err(e) => error_response(&e),
    }
}

async fn handle_login(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let body: LoginRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let account = match state.accounts.login(&body.identifier, &body.password).await {
        Ok(a) => a,
        Err(e) => return error_response(&e),
    };

    info!(identifier = %body.identifier, "Login succeeded");

    match issue_token(&state, &account) {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => error_response(&e),
    }
}

async fn handle_me(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    let caller = match require_caller(auth_header.as_deref(), &state).await {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let account = match state.accounts.find_by_id(caller.account_id).await {
        Ok(a) => a,
        Err(e) => return error_response(&e),
    };

    json_response(
        StatusCode::OK,
        &MeResponse {
            account_id: caller.account_id.to_hex(),
            identifier: account.identifier,
            role: caller.role,
            managed_by: match caller.role {
                Role::Manager => None,
                Role::User => caller.scope.map(|id| id.to_hex()),
            },
        },
    )
}

fn issue_token(state: &Arc<AppState>, account: &AccountDoc) -> Result<AuthResponse, TrackError> {
    let account_id = account
        ._id
        .ok_or_else(|| TrackError::Internal("account missing id".into()))?;

    let jwt = state.jwt()?;
    let (token, expires_at) = jwt.generate_token(TokenInput {
        account_id: account_id.to_hex(),
        identifier: account.identifier.clone(),
        role: account.role,
        token_version: account.token_version,
    })?;

    Ok(AuthResponse {
        token,
        account_id: account_id.to_hex(),
        identifier: account.identifier.clone(),
        role: account.role,
        expires_at,
    })
}

// =============================================================================
// Dispatcher
// =============================================================================

pub async fn handle_auth_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    if !path.starts_with("/auth") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let path = path.split('?').next().unwrap_or(path);

    let response = match (method, path) {
        (&Method::POST, "/auth/register") => handle_register(req, state).await,
        (&Method::POST, "/auth/login") => handle_login(req, state).await,
        (&Method::GET, "/auth/me") => handle_me(req, state).await,

        (_, "/auth/register") | (_, "/auth/login") | (_, "/auth/me") => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
                code: None,
            },
        ),

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Auth endpoint not found".into(),
                code: None,
            },
        ),
    };

    Some(response)
}
