//! Service layer: one struct per aggregate, each holding a `MongoClient`
//! and enforcing the caller-context access rules before touching storage.

pub mod accounts;
pub mod connections;
pub mod emails;
pub mod instances;
pub mod projects;
pub mod reports;
pub mod stages;
pub mod status_engine;

pub use accounts::AccountService;
pub use connections::ConnectionService;
pub use emails::EmailService;
pub use instances::{CreateInstance, InstanceService};
pub use projects::{CreateProject, ProjectService};
pub use reports::{ProjectReport, ReportService};
pub use stages::{CreateStage, StageService};
pub use status_engine::StatusEngine;
