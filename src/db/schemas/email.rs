//! Email recipient document schema
//!
//! Recipient addresses a manager shares project reports with. Kept as a
//! plain per-owner list; delivery is the notification collaborator's
//! concern.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for report recipients
pub const EMAIL_COLLECTION: &str = "emails";

/// Report recipient document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct EmailDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning manager
    pub owner: ObjectId,

    /// Recipient address
    pub address: String,

    /// Optional display label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl EmailDoc {
    pub fn new(owner: ObjectId, address: String, label: Option<String>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            owner,
            address,
            label,
        }
    }
}

impl IntoIndexes for EmailDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            // One entry per address per owner
            doc! { "owner": 1, "address": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("email_owner_address_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for EmailDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
