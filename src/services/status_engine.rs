//! Status derivation engine
//!
//! `on_instance_changed` is the single hook every instance-mutating
//! operation invokes. It reloads the owning project and its instance
//! statuses, derives the aggregate status, and persists it only when it
//! differs from the stored value.
//!
//! Best-effort by contract: derivation failures are logged and swallowed
//! so the triggering mutation's success is never rolled back by a
//! re-derivation hiccup.

use bson::{doc, oid::ObjectId, DateTime};
use tracing::{debug, warn};

use crate::core::{derive_status, InstanceStatus};
use crate::db::schemas::{
    ProjectDoc, StageInstanceDoc, PROJECT_COLLECTION, STAGE_INSTANCE_COLLECTION,
};
use crate::db::MongoClient;
use crate::types::Result;

/// Recomputes project status after instance mutations
#[derive(Clone)]
pub struct StatusEngine {
    mongo: MongoClient,
}

impl StatusEngine {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }

    /// Recompute and persist the owning project's status. Never fails the
    /// caller; errors are logged.
    pub async fn on_instance_changed(&self, project_id: ObjectId) {
        if let Err(e) = self.rederive(project_id).await {
            warn!(project = %project_id, "Status re-derivation failed: {}", e);
        }
    }

    async fn rederive(&self, project_id: ObjectId) -> Result<()> {
        let projects = self.mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await?;
        let project = match projects.find_one(doc! { "_id": project_id }).await? {
            Some(p) => p,
            None => {
                // Project deleted underneath us (cascade in flight)
                debug!(project = %project_id, "Skipping re-derivation: project gone");
                return Ok(());
            }
        };

        let instances = self
            .mongo
            .collection::<StageInstanceDoc>(STAGE_INSTANCE_COLLECTION)
            .await?;
        let statuses: Vec<InstanceStatus> = instances
            .find_many(doc! { "project": project_id })
            .await?
            .into_iter()
            .map(|i| i.status)
            .collect();

        let derived = derive_status(project.status, &statuses);
        if derived == project.status {
            return Ok(());
        }

        debug!(
            project = %project_id,
            from = %project.status,
            to = %derived,
            "Project status derived"
        );

        projects
            .update_one(
                doc! { "_id": project_id },
                doc! {
                    "$set": {
                        "status": derived.to_string(),
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await?;

        Ok(())
    }
}
