//! Project document schema
//!
//! A project is a named container owned by one manager, holding an ordered
//! list of stage-instance references and an aggregate status. The `stages`
//! array is bookkeeping alongside the instances' own `project` field; the
//! instance collection filtered by project id is the source of truth for
//! adjacency queries.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::core::ProjectStatus;
use crate::dates::BusinessDate;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for projects
pub const PROJECT_COLLECTION: &str = "projects";

/// Project document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProjectDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning manager
    pub owner: ObjectId,

    /// Project name
    pub name: String,

    /// Project description
    #[serde(default)]
    pub description: String,

    /// Aggregate status; mutations only move this between Pending and
    /// Ongoing, Completed/Archived are operator-set
    #[serde(default)]
    pub status: ProjectStatus,

    /// Business creation date (calendar date, not the audit timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_on: Option<BusinessDate>,

    /// Ordered stage-instance references
    #[serde(default)]
    pub stages: Vec<ObjectId>,
}

impl ProjectDoc {
    /// Create a new project, defaulting to Pending with no stages
    pub fn new(
        owner: ObjectId,
        name: String,
        description: String,
        created_on: Option<BusinessDate>,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            owner,
            name,
            description,
            status: ProjectStatus::Pending,
            created_on: Some(created_on.unwrap_or_else(BusinessDate::today)),
            stages: Vec::new(),
        }
    }
}

impl IntoIndexes for ProjectDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "owner": 1 },
            Some(
                IndexOptions::builder()
                    .name("project_owner_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for ProjectDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project_defaults() {
        let p = ProjectDoc::new(ObjectId::new(), "Launch".into(), String::new(), None);
        assert_eq!(p.status, ProjectStatus::Pending);
        assert!(p.stages.is_empty());
        assert!(p.created_on.is_some());
    }

    #[test]
    fn test_explicit_creation_date_kept() {
        let date = BusinessDate::parse("2024-03-15").unwrap();
        let p = ProjectDoc::new(ObjectId::new(), "Launch".into(), String::new(), Some(date));
        assert_eq!(p.created_on, Some(date));
    }
}
