//! HTTP routes for the stage catalog
//!
//! - /api/stages        - list, create
//! - /api/stages/{id}   - get, patch, delete

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::CallerContext;
use crate::db::schemas::StageDoc;
use crate::routes::{
    cors_preflight, error_response, get_auth_header, json_response, parse_json_body,
    parse_object_id, require_caller, BoxBody, ErrorResponse,
};
use crate::server::AppState;
use crate::services::CreateStage;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStageRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// When set, creates a custom stage bound to this project
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStageRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_custom: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl From<StageDoc> for StageView {
    fn from(doc: StageDoc) -> Self {
        Self {
            id: doc._id.map(|id| id.to_hex()).unwrap_or_default(),
            name: doc.name,
            description: doc.description,
            is_custom: doc.is_custom,
            project_id: doc.project.map(|id| id.to_hex()),
        }
    }
}

async fn list_stages(state: Arc<AppState>, ctx: &CallerContext) -> Response<BoxBody> {
    match state.stages.list(ctx).await {
        Ok(docs) => {
            let views: Vec<StageView> = docs.into_iter().map(Into::into).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_response(&e),
    }
}

async fn create_stage(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: &CallerContext,
) -> Response<BoxBody> {
    let body: CreateStageRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let project_id = match body.project_id.as_deref() {
        Some(raw) => match parse_object_id(raw, "project") {
            Ok(id) => Some(id),
            Err(e) => return error_response(&e),
        },
        None => None,
    };

    let input = CreateStage {
        name: body.name,
        description: body.description,
        project_id,
    };

    match state.stages.create(ctx, input).await {
        Ok(doc) => json_response(StatusCode::CREATED, &StageView::from(doc)),
        Err(e) => error_response(&e),
    }
}

async fn get_stage(state: Arc<AppState>, ctx: &CallerContext, id: &str) -> Response<BoxBody> {
    let id = match parse_object_id(id, "stage") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    match state.stages.get(ctx, id).await {
        Ok(doc) => json_response(StatusCode::OK, &StageView::from(doc)),
        Err(e) => error_response(&e),
    }
}

async fn patch_stage(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: &CallerContext,
    id: &str,
) -> Response<BoxBody> {
    let id = match parse_object_id(id, "stage") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let body: UpdateStageRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };
    match state.stages.update(ctx, id, body.name, body.description).await {
        Ok(doc) => json_response(StatusCode::OK, &StageView::from(doc)),
        Err(e) => error_response(&e),
    }
}

async fn delete_stage(state: Arc<AppState>, ctx: &CallerContext, id: &str) -> Response<BoxBody> {
    let id = match parse_object_id(id, "stage") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    match state.stages.delete(ctx, id).await {
        Ok(()) => json_response(StatusCode::OK, &serde_json::json!({ "deleted": true })),
        Err(e) => error_response(&e),
    }
}

pub async fn handle_stage_request(
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

    let remainder = path.strip_prefix("/api/stages").unwrap_or("");
    let segments: Vec<&str> = remainder.split('/').filter(|s| !s.is_empty()).collect();
    let method = req.method().clone();

    match (&method, segments.as_slice()) {
        (&Method::GET, []) => list_stages(state, &ctx).await,
        (&Method::POST, []) => create_stage(req, state, &ctx).await,
        (&Method::GET, [id]) => get_stage(state, &ctx, id).await,
        (&Method::PUT, [id]) | (&Method::PATCH, [id]) => patch_stage(req, state, &ctx, id).await,
        (&Method::DELETE, [id]) => delete_stage(state, &ctx, id).await,

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Stage endpoint not found".into(),
                code: None,
            },
        ),
    }
}
