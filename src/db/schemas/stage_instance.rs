//! Stage instance document schema
//!
//! Binds a catalog stage into one project's ordered stage list, carrying
//! its own lifecycle status, calendar dates, insertion-sequence order, and
//! connection references.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::core::InstanceStatus;
use crate::dates::BusinessDate;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for stage instances
pub const STAGE_INSTANCE_COLLECTION: &str = "stage_instances";

/// Stage instance document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StageInstanceDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning project
    pub project: ObjectId,

    /// Catalog stage this instance binds
    pub stage: ObjectId,

    /// Lifecycle status
    #[serde(default)]
    pub status: InstanceStatus,

    /// When work on this stage started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<BusinessDate>,

    /// When this stage was completed; absent while Ongoing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<BusinessDate>,

    /// Insertion sequence within the project (max+1, starting at 1, never
    /// reassigned)
    pub order: i64,

    /// Connection references where this instance is an endpoint
    #[serde(default)]
    pub connections: Vec<ObjectId>,
}

impl StageInstanceDoc {
    /// Create an instance. An Ongoing instance never carries a completion
    /// date, whatever the caller submitted.
    pub fn new(
        project: ObjectId,
        stage: ObjectId,
        status: InstanceStatus,
        start_date: Option<BusinessDate>,
        completion_date: Option<BusinessDate>,
        order: i64,
    ) -> Self {
        let completion_date = match status {
            InstanceStatus::Ongoing => None,
            InstanceStatus::Completed => completion_date,
        };
        Self {
            _id: None,
            metadata: Metadata::new(),
            project,
            stage,
            status,
            start_date,
            completion_date,
            order,
            connections: Vec::new(),
        }
    }
}

impl IntoIndexes for StageInstanceDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "project": 1 },
            Some(
                IndexOptions::builder()
                    .name("instance_project_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for StageInstanceDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> BusinessDate {
        BusinessDate::parse(s).unwrap()
    }

    #[test]
    fn test_ongoing_instance_drops_completion_date() {
        let i = StageInstanceDoc::new(
            ObjectId::new(),
            ObjectId::new(),
            InstanceStatus::Ongoing,
            Some(date("2024-01-01")),
            Some(date("2024-01-10")),
            1,
        );
        assert_eq!(i.start_date, Some(date("2024-01-01")));
        assert!(i.completion_date.is_none());
    }

    #[test]
    fn test_completed_instance_keeps_both_dates() {
        let i = StageInstanceDoc::new(
            ObjectId::new(),
            ObjectId::new(),
            InstanceStatus::Completed,
            Some(date("2024-01-01")),
            Some(date("2024-01-10")),
            3,
        );
        assert_eq!(i.completion_date, Some(date("2024-01-10")));
        assert_eq!(i.order, 3);
    }
}
