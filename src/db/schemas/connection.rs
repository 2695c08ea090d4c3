//! Stage connection document schema
//!
//! A directed edge between two stage instances of the same project. Used
//! for visualization; no acyclicity or order constraint is enforced. At
//! most one edge per ordered (from, to) pair within a project.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for stage connections
pub const CONNECTION_COLLECTION: &str = "stage_connections";

/// Stage connection document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ConnectionDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning project
    pub project: ObjectId,

    /// Source instance
    pub from_stage: ObjectId,

    /// Target instance
    pub to_stage: ObjectId,
}

impl ConnectionDoc {
    pub fn new(project: ObjectId, from_stage: ObjectId, to_stage: ObjectId) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            project,
            from_stage,
            to_stage,
        }
    }

    /// Filter matching this exact directed edge (duplicate detection)
    pub fn edge_filter(project: ObjectId, from_stage: ObjectId, to_stage: ObjectId) -> Document {
        doc! {
            "project": project,
            "from_stage": from_stage,
            "to_stage": to_stage,
        }
    }

    /// Filter matching every edge touching an instance (cascade delete)
    pub fn endpoint_filter(instance_id: ObjectId) -> Document {
        doc! {
            "$or": [
                { "from_stage": instance_id },
                { "to_stage": instance_id },
            ]
        }
    }
}

impl IntoIndexes for ConnectionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "project": 1 },
            Some(
                IndexOptions::builder()
                    .name("connection_project_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for ConnectionDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_filter_is_directed() {
        let p = ObjectId::new();
        let a = ObjectId::new();
        let b = ObjectId::new();

        let forward = ConnectionDoc::edge_filter(p, a, b);
        let reverse = ConnectionDoc::edge_filter(p, b, a);
        // (a→b) and (b→a) are distinct edges
        assert_ne!(forward, reverse);
        assert_eq!(forward.get_object_id("from_stage").unwrap(), a);
        assert_eq!(forward.get_object_id("to_stage").unwrap(), b);
    }

    #[test]
    fn test_self_loop_is_an_ordinary_edge() {
        // The graph is free-form annotation: an instance may point at
        // itself, and only an exact duplicate of that edge is filtered out.
        let p = ObjectId::new();
        let x = ObjectId::new();

        let edge = ConnectionDoc::new(p, x, x);
        assert_eq!(edge.from_stage, edge.to_stage);

        let filter = ConnectionDoc::edge_filter(p, x, x);
        assert_eq!(filter.get_object_id("from_stage").unwrap(), x);
        assert_eq!(filter.get_object_id("to_stage").unwrap(), x);
    }

    #[test]
    fn test_endpoint_filter_matches_either_side() {
        let id = ObjectId::new();
        let filter = ConnectionDoc::endpoint_filter(id);
        let arms = filter.get_array("$or").unwrap();
        assert_eq!(arms.len(), 2);
    }
}
