//! HTTP server
//!
//! hyper http1 with TokioIo, one task per connection. Routing is a flat
//! match over method and path prefix; everything under /api/* and /auth/*
//! is JSON.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::db::MongoClient;
use crate::routes;
use crate::services::{
    AccountService, ConnectionService, EmailService, InstanceService, ProjectService,
    ReportService, StageService,
};
use crate::types::TrackError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: MongoClient,
    pub accounts: AccountService,
    pub projects: ProjectService,
    pub stages: StageService,
    pub instances: InstanceService,
    pub connections: ConnectionService,
    pub emails: EmailService,
    pub reports: ReportService,
}

impl AppState {
    pub fn new(args: Args, mongo: MongoClient) -> Self {
        Self {
            accounts: AccountService::new(mongo.clone()),
            projects: ProjectService::new(mongo.clone()),
            stages: StageService::new(mongo.clone()),
            instances: InstanceService::new(mongo.clone()),
            connections: ConnectionService::new(mongo.clone()),
            emails: EmailService::new(mongo.clone()),
            reports: ReportService::new(mongo.clone()),
            args,
            mongo,
        }
    }

    /// Build the JWT validator from config. Dev mode uses a fixed
    /// insecure secret; production requires JWT_SECRET.
    pub fn jwt(&self) -> Result<JwtValidator, TrackError> {
        if self.args.dev_mode {
            return Ok(JwtValidator::new_dev());
        }
        let secret = self
            .args
            .jwt_secret
            .clone()
            .ok_or_else(|| TrackError::Auth("JWT secret not configured".into()))?;
        JwtValidator::new(secret, self.args.jwt_expiry_seconds)
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), TrackError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Stagetrack listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - using insecure JWT secret");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().split('?').next().unwrap_or("").to_string();

    info!("[{}] {} {}", addr, method, path);

    // Auth routes consume the request
    if path.starts_with("/auth") {
        if let Some(response) = routes::handle_auth_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(to_boxed(not_found_response(&path)));
    }

    let response = match (method, path.as_str()) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(Arc::clone(&state)))
        }

        (Method::GET, "/version") => to_boxed(routes::version_info()),

        // CORS preflight for anything not handled by a sub-router
        (Method::OPTIONS, _) => to_boxed(preflight_response()),

        (_, p) if p == "/api/projects" || p.starts_with("/api/projects/") => {
            return Ok(routes::handle_project_request(req, Arc::clone(&state), &path).await);
        }

        (_, p) if p == "/api/stages" || p.starts_with("/api/stages/") => {
            return Ok(routes::handle_stage_request(req, Arc::clone(&state), &path).await);
        }

        (_, p) if p == "/api/emails" || p.starts_with("/api/emails/") => {
            return Ok(routes::handle_email_request(req, Arc::clone(&state), &path).await);
        }

        _ => to_boxed(not_found_response(&path)),
    };

    Ok(response)
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, PATCH, DELETE, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
