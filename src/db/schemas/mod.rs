//! Database schemas for Stagetrack
//!
//! Defines MongoDB document structures for accounts, catalog stages,
//! projects, stage instances, connections, and report recipients.

mod account;
mod connection;
mod email;
mod metadata;
mod project;
mod stage;
mod stage_instance;

pub use account::{AccountDoc, ACCOUNT_COLLECTION};
pub use connection::{ConnectionDoc, CONNECTION_COLLECTION};
pub use email::{EmailDoc, EMAIL_COLLECTION};
pub use metadata::Metadata;
pub use project::{ProjectDoc, PROJECT_COLLECTION};
pub use stage::{StageDoc, STAGE_COLLECTION};
pub use stage_instance::{StageInstanceDoc, STAGE_INSTANCE_COLLECTION};
