//! HTTP routes for projects and their nested resources
//!
//! - /api/projects                                  - list, create
//! - /api/projects/{id}                             - get, patch, delete
//! - /api/projects/{id}/stages                      - list, add instance
//! - /api/projects/{id}/stages/{instanceId}         - patch, delete
//! - /api/projects/{id}/connections                 - list, create
//! - /api/projects/{id}/connections/{connectionId}  - delete
//! - /api/projects/{id}/report                      - assembled report

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use std::str::FromStr;

use crate::core::{CallerContext, InstancePatch, InstanceStatus, ProjectPatch, ProjectStatus};
use crate::dates::BusinessDate;
use crate::db::schemas::{ConnectionDoc, ProjectDoc, StageInstanceDoc};
use crate::routes::{
    cors_preflight, error_response, get_auth_header, json_response, parse_json_body,
    parse_object_id, require_caller, BoxBody, ErrorResponse,
};
use crate::server::AppState;
use crate::services::{CreateInstance, CreateProject};
use crate::types::TrackError;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_on: Option<BusinessDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    pub stage_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_date: Option<BusinessDate>,
    #[serde(default)]
    pub completion_date: Option<BusinessDate>,
}

/// Partial project update as it arrives on the wire. Status comes in as a
/// string so an unknown value surfaces as a state conflict rather than a
/// malformed body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatchRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub created_on: Option<BusinessDate>,
}

impl ProjectPatchRequest {
    pub fn into_patch(self) -> Result<ProjectPatch, TrackError> {
        Ok(ProjectPatch {
            name: self.name,
            description: self.description,
            status: parse_status(self.status)?,
            created_on: self.created_on,
        })
    }
}

/// Partial stage instance update as it arrives on the wire
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancePatchRequest {
    pub status: Option<String>,
    pub start_date: Option<BusinessDate>,
    pub completion_date: Option<BusinessDate>,
}

impl InstancePatchRequest {
    pub fn into_patch(self) -> Result<InstancePatch, TrackError> {
        Ok(InstancePatch {
            status: parse_status(self.status)?,
            start_date: self.start_date,
            completion_date: self.completion_date,
        })
    }
}

fn parse_status<T>(raw: Option<String>) -> Result<Option<T>, TrackError>
where
    T: FromStr<Err = TrackError>,
{
    raw.as_deref().map(T::from_str).transpose()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnectionRequest {
    pub from_stage: String,
    pub to_stage: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub created_on: Option<BusinessDate>,
    pub stage_ids: Vec<String>,
}

impl From<ProjectDoc> for ProjectView {
    fn from(doc: ProjectDoc) -> Self {
        Self {
            id: doc._id.map(|id| id.to_hex()).unwrap_or_default(),
            name: doc.name,
            description: doc.description,
            status: doc.status,
            created_on: doc.created_on,
            stage_ids: doc.stages.iter().map(|id| id.to_hex()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceView {
    pub id: String,
    pub stage_id: String,
    pub status: InstanceStatus,
    pub start_date: Option<BusinessDate>,
    pub completion_date: Option<BusinessDate>,
    pub order: i64,
    pub connection_ids: Vec<String>,
}

impl From<StageInstanceDoc> for InstanceView {
    fn from(doc: StageInstanceDoc) -> Self {
        Self {
            id: doc._id.map(|id| id.to_hex()).unwrap_or_default(),
            stage_id: doc.stage.to_hex(),
            status: doc.status,
            start_date: doc.start_date,
            completion_date: doc.completion_date,
            order: doc.order,
            connection_ids: doc.connections.iter().map(|id| id.to_hex()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionView {
    pub id: String,
    pub from_stage: String,
    pub to_stage: String,
}

impl From<ConnectionDoc> for ConnectionView {
    fn from(doc: ConnectionDoc) -> Self {
        Self {
            id: doc._id.map(|id| id.to_hex()).unwrap_or_default(),
            from_stage: doc.from_stage.to_hex(),
            to_stage: doc.to_stage.to_hex(),
        }
    }
}

// =============================================================================
// Project Handlers
// =============================================================================

async fn list_projects(state: Arc<AppState>, ctx: &CallerContext) -> Response<BoxBody> {
    match state.projects.list(ctx).await {
        Ok(docs) => {
            let views: Vec<ProjectView> = docs.into_iter().map(Into::into).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_response(&e),
    }
}

async fn create_project(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: &CallerContext,
) -> Response<BoxBody> {
    let body: CreateProjectRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let input = CreateProject {
        name: body.name,
        description: body.description,
        created_on: body.created_on,
    };

    match state.projects.create(ctx, input).await {
        Ok(doc) => json_response(StatusCode::CREATED, &ProjectView::from(doc)),
        Err(e) => error_response(&e),
    }
}

async fn get_project(
    state: Arc<AppState>,
    ctx: &CallerContext,
    id: &str,
) -> Response<BoxBody> {
    let id = match parse_object_id(id, "project") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    match state.projects.get(ctx, id).await {
        Ok(doc) => json_response(StatusCode::OK, &ProjectView::from(doc)),
        Err(e) => error_response(&e),
    }
}

async fn patch_project(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: &CallerContext,
    id: &str,
) -> Response<BoxBody> {
    let id = match parse_object_id(id, "project") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let body: ProjectPatchRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };
    let patch = match body.into_patch() {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    match state.projects.update(ctx, id, patch).await {
        Ok(doc) => json_response(StatusCode::OK, &ProjectView::from(doc)),
        Err(e) => error_response(&e),
    }
}

async fn delete_project(
    state: Arc<AppState>,
    ctx: &CallerContext,
    id: &str,
) -> Response<BoxBody> {
    let id = match parse_object_id(id, "project") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    match state.projects.delete(ctx, id).await {
        Ok(()) => json_response(StatusCode::OK, &serde_json::json!({ "deleted": true })),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// Instance Handlers
// =============================================================================

async fn list_instances(
    state: Arc<AppState>,
    ctx: &CallerContext,
    project_id: &str,
) -> Response<BoxBody> {
    let project_id = match parse_object_id(project_id, "project") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    match state.instances.list(ctx, project_id).await {
        Ok(docs) => {
            let views: Vec<InstanceView> = docs.into_iter().map(Into::into).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_response(&e),
    }
}

async fn create_instance(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: &CallerContext,
    project_id: &str,
) -> Response<BoxBody> {
    let project_id = match parse_object_id(project_id, "project") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let body: CreateInstanceRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };
    let stage_id = match parse_object_id(&body.stage_id, "stage") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    let status = match parse_status::<InstanceStatus>(body.status) {
        Ok(s) => s.unwrap_or_default(),
        Err(e) => return error_response(&e),
    };

    let input = CreateInstance {
        stage_id,
        status,
        start_date: body.start_date,
        completion_date: body.completion_date,
    };

    match state.instances.create(ctx, project_id, input).await {
        Ok(doc) => json_response(StatusCode::CREATED, &InstanceView::from(doc)),
        Err(e) => error_response(&e),
    }
}

async fn patch_instance(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: &CallerContext,
    project_id: &str,
    instance_id: &str,
) -> Response<BoxBody> {
    let project_id = match parse_object_id(project_id, "project") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let instance_id = match parse_object_id(instance_id, "stage instance") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let body: InstancePatchRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };
    let patch = match body.into_patch() {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    match state.instances.update(ctx, project_id, instance_id, patch).await {
        Ok(doc) => json_response(StatusCode::OK, &InstanceView::from(doc)),
        Err(e) => error_response(&e),
    }
}

async fn delete_instance(
    state: Arc<AppState>,
    ctx: &CallerContext,
    project_id: &str,
    instance_id: &str,
) -> Response<BoxBody> {
    let project_id = match parse_object_id(project_id, "project") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let instance_id = match parse_object_id(instance_id, "stage instance") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    match state.instances.delete(ctx, project_id, instance_id).await {
        Ok(()) => json_response(StatusCode::OK, &serde_json::json!({ "deleted": true })),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// Connection Handlers
// =============================================================================

async fn list_connections(
    state: Arc<AppState>,
    ctx: &CallerContext,
    project_id: &str,
) -> Response<BoxBody> {
    let project_id = match parse_object_id(project_id, "project") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    match state.connections.list(ctx, project_id).await {
        Ok(docs) => {
            let views: Vec<ConnectionView> = docs.into_iter().map(Into::into).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_response(&e),
    }
}

async fn create_connection(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: &CallerContext,
    project_id: &str,
) -> Response<BoxBody> {
    let project_id = match parse_object_id(project_id, "project") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let body: CreateConnectionRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };
    let from = match parse_object_id(&body.from_stage, "stage instance") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let to = match parse_object_id(&body.to_stage, "stage instance") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    match state.connections.create(ctx, project_id, from, to).await {
        Ok(doc) => json_response(StatusCode::CREATED, &ConnectionView::from(doc)),
        Err(e) => error_response(&e),
    }
}

async fn delete_connection(
    state: Arc<AppState>,
    ctx: &CallerContext,
    project_id: &str,
    connection_id: &str,
) -> Response<BoxBody> {
    let project_id = match parse_object_id(project_id, "project") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    let connection_id = match parse_object_id(connection_id, "connection") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    match state.connections.delete(ctx, project_id, connection_id).await {
        Ok(()) => json_response(StatusCode::OK, &serde_json::json!({ "deleted": true })),
        Err(e) => error_response(&e),
    }
}

async fn get_report(
    state: Arc<AppState>,
    ctx: &CallerContext,
    project_id: &str,
) -> Response<BoxBody> {
    let project_id = match parse_object_id(project_id, "project") {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    match state.reports.build(ctx, project_id).await {
        Ok(report) => json_response(StatusCode::OK, &report),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

pub async fn handle_project_request(
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

    let remainder = path.strip_prefix("/api/projects").unwrap_or("");
    let segments: Vec<&str> = remainder.split('/').filter(|s| !s.is_empty()).collect();
    let method = req.method().clone();

    match (&method, segments.as_slice()) {
        (&Method::GET, []) => list_projects(state, &ctx).await,
        (&Method::POST, []) => create_project(req, state, &ctx).await,

        (&Method::GET, [id]) => get_project(state, &ctx, id).await,
        (&Method::PUT, [id]) | (&Method::PATCH, [id]) => {
            patch_project(req, state, &ctx, id).await
        }
        (&Method::DELETE, [id]) => delete_project(state, &ctx, id).await,

        (&Method::GET, [id, "stages"]) => list_instances(state, &ctx, id).await,
        (&Method::POST, [id, "stages"]) => create_instance(req, state, &ctx, id).await,
        (&Method::PUT, [id, "stages", instance_id])
        | (&Method::PATCH, [id, "stages", instance_id]) => {
            patch_instance(req, state, &ctx, id, instance_id).await
        }
        (&Method::DELETE, [id, "stages", instance_id]) => {
            delete_instance(state, &ctx, id, instance_id).await
        }

        (&Method::GET, [id, "connections"]) => list_connections(state, &ctx, id).await,
        (&Method::POST, [id, "connections"]) => create_connection(req, state, &ctx, id).await,
        (&Method::DELETE, [id, "connections", connection_id]) => {
            delete_connection(state, &ctx, id, connection_id).await
        }

        (&Method::GET, [id, "report"]) => get_report(state, &ctx, id).await,

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Project endpoint not found".into(),
                code: None,
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_in_patch_is_a_conflict() {
        let body: ProjectPatchRequest =
            serde_json::from_str(r#"{"status": "Done"}"#).unwrap();
        let err = body.into_patch().unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let body: InstancePatchRequest =
            serde_json::from_str(r#"{"status": "Paused"}"#).unwrap();
        let err = body.into_patch().unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_known_status_strings_parse() {
        let body: ProjectPatchRequest =
            serde_json::from_str(r#"{"status": "Archived", "name": "Relaunch"}"#).unwrap();
        let patch = body.into_patch().unwrap();
        assert_eq!(patch.status, Some(ProjectStatus::Archived));
        assert_eq!(patch.name.as_deref(), Some("Relaunch"));

        let body: InstancePatchRequest =
            serde_json::from_str(r#"{"status": "Completed"}"#).unwrap();
        let patch = body.into_patch().unwrap();
        assert_eq!(patch.status, Some(InstanceStatus::Completed));
    }

    #[test]
    fn test_absent_status_stays_unset() {
        let body: InstancePatchRequest =
            serde_json::from_str(r#"{"startDate": "2024-02-01"}"#).unwrap();
        let patch = body.into_patch().unwrap();
        assert!(patch.status.is_none());
        assert!(patch.start_date.is_some());
    }

    #[test]
    fn test_instance_create_status_defaults_to_ongoing() {
        let status = parse_status::<InstanceStatus>(None).unwrap().unwrap_or_default();
        assert_eq!(status, InstanceStatus::Ongoing);

        assert!(parse_status::<InstanceStatus>(Some("Done".into())).is_err());
    }
}
