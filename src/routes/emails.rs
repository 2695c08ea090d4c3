//! HTTP routes for the email address book
//!
//! - /api/emails        - list, create
//! - /api/emails/{id}   - delete

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::CallerContext;
use crate::db::schemas::EmailDoc;
use crate::routes::{
    cors_preflight, error_response, get_auth_header, json_response, parse_json_body,
    parse_object_id, require_caller, BoxBody, ErrorResponse,
};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmailRequest {
    pub address: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailView {
    pub id: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl From<EmailDoc> for EmailView {
    fn from(doc: EmailDoc) -> Self {
        Self {
            id: doc._id.map(|id| id.to_hex()).unwrap_or_default(),
            address: doc.address,
            label: doc.label,
        }
    }
}

async fn list_emails(state: Arc<AppState>, ctx: &CallerContext) -> Response<BoxBody> {
    match state.emails.list(ctx).await {
        Ok(docs) => {
            let views: Vec<EmailView> = docs.into_iter().map(Into::into).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_response(&e),
    }
}

async fn create_email(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: &CallerContext,
) -> Response<BoxBody> {
    let body: CreateEmailRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };
    match state.emails.create(ctx, &body.address, body.label).await {
        Ok(doc) => json_response(StatusCode::CREATED, &EmailView::from(doc)),
        Err(e) => error_response(&e),
    }
}

async fn delete_email(state: Arc<AppState>, ctx: &CallerContext, id: &str) -> Response<BoxBody> {
    let id = match parse_object_id(id, "email address") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    match state.emails.delete(ctx, id).await {
        Ok(()) => json_response(StatusCode::OK, &serde_json::json!({ "deleted": true })),
        Err(e) => error_response(&e),
    }
}

pub async fn handle_email_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<BoxBody> {
    if req.method() == Method::OPTIONS {
        return cors_preflight();
    }

    let auth_header = get_auth_header(&req);
    let ctx = match require_caller(auth_header.as_deref(), &state).await {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let remainder = path.strip_prefix("/api/emails").unwrap_or("");
    let segments: Vec<&str> = remainder.split('/').filter(|s| !s.is_empty()).collect();
    let method = req.method().clone();

    match (&method, segments.as_slice()) {
        (&Method::GET, []) => list_emails(state, &ctx).await,
        (&Method::POST, []) => create_email(req, state, &ctx).await,
        (&Method::DELETE, [id]) => delete_email(state, &ctx, id).await,

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Email endpoint not found".into(),
                code: None,
            },
        ),
    }
}
