//! Stage catalog document schema
//!
//! A catalog stage is a reusable named phase definition owned by one
//! manager. Custom stages are implicitly scoped to a single project via
//! the `project` back-reference.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for catalog stages
pub const STAGE_COLLECTION: &str = "stages";

/// Catalog stage document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StageDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning manager
    pub owner: ObjectId,

    /// Stage name
    pub name: String,

    /// Stage description
    #[serde(default)]
    pub description: String,

    /// Whether this stage is project-specific
    #[serde(default)]
    pub is_custom: bool,

    /// Project this custom stage belongs to; None for reusable stages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ObjectId>,
}

impl StageDoc {
    /// Create a globally reusable catalog stage
    pub fn new(owner: ObjectId, name: String, description: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            owner,
            name,
            description,
            is_custom: false,
            project: None,
        }
    }

    /// Create a stage scoped to a single project
    pub fn new_custom(
        owner: ObjectId,
        name: String,
        description: String,
        project_id: ObjectId,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            owner,
            name,
            description,
            is_custom: true,
            project: Some(project_id),
        }
    }
}

impl IntoIndexes for StageDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "owner": 1 },
            Some(
                IndexOptions::builder()
                    .name("stage_owner_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for StageDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reusable_stage_has_no_project() {
        let s = StageDoc::new(ObjectId::new(), "Design".into(), "UI design".into());
        assert!(!s.is_custom);
        assert!(s.project.is_none());
    }

    #[test]
    fn test_custom_stage_is_project_scoped() {
        let pid = ObjectId::new();
        let s = StageDoc::new_custom(ObjectId::new(), "Migration".into(), String::new(), pid);
        assert!(s.is_custom);
        assert_eq!(s.project, Some(pid));
    }
}
