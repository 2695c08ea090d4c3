//! Stagetrack - project tracking API
//!
//! Managers own projects built from ordered stage instances with directed
//! connections between them; referred users get read-only visibility into
//! their manager's data. Project status is derived from instance statuses
//! after every instance mutation.

pub mod auth;
pub mod config;
pub mod core;
pub mod dates;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use types::{Result, TrackError};
