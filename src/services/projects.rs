//! Project service
//!
//! CRUD over projects with the uniform access predicate applied to every
//! operation. Reads go through scoped lookups (misses are NotFound);
//! writes fetch unscoped and compare ownership (misses are Forbidden).
//! Deleting a project cascades to its instances and connections before
//! the project document itself is removed; the cascade is not compensated
//! on partial failure.

use bson::{doc, oid::ObjectId};
use tracing::info;

use crate::core::{CallerContext, ProjectPatch};
use crate::dates::BusinessDate;
use crate::db::schemas::{
    ConnectionDoc, ProjectDoc, StageInstanceDoc, CONNECTION_COLLECTION, PROJECT_COLLECTION,
    STAGE_INSTANCE_COLLECTION,
};
use crate::db::MongoClient;
use crate::types::{Result, TrackError};

/// Input for project creation
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: String,
    pub created_on: Option<BusinessDate>,
}

/// Project operations backed by MongoDB
#[derive(Clone)]
pub struct ProjectService {
    mongo: MongoClient,
}

impl ProjectService {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }

    /// List every project in the caller's scope, empty scope included
    pub async fn list(&self, ctx: &CallerContext) -> Result<Vec<ProjectDoc>> {
        let filter = match ctx.scope_filter() {
            Some(f) => f,
            None => return Ok(Vec::new()),
        };
        let collection = self.mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await?;
        collection
            .find_many_sorted(filter, Some(doc! { "metadata.created_at": -1 }))
            .await
    }

    /// Scoped single-project lookup; out-of-scope ids miss as NotFound
    pub async fn get(&self, ctx: &CallerContext, id: ObjectId) -> Result<ProjectDoc> {
        let mut filter = ctx
            .scope_filter()
            .ok_or_else(|| TrackError::NotFound("project not found".into()))?;
        filter.insert("_id", id);

        let collection = self.mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await?;
        collection
            .find_one(filter)
            .await?
            .ok_or_else(|| TrackError::NotFound("project not found".into()))
    }

    /// Create a project owned by the calling manager, defaulting Pending
    pub async fn create(&self, ctx: &CallerContext, input: CreateProject) -> Result<ProjectDoc> {
        ctx.authorize_write()?;
        if input.name.trim().is_empty() {
            return Err(TrackError::Validation("project name is required".into()));
        }

        let mut project = ProjectDoc::new(
            ctx.owner_id(),
            input.name,
            input.description,
            input.created_on,
        );

        let collection = self.mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await?;
        let id = collection.insert_one(project.clone()).await?;
        project._id = Some(id);

        info!(project = %id, owner = %ctx.owner_id(), "Project created");
        Ok(project)
    }

    /// Apply a partial update. Operator status changes (including
    /// Completed/Archived) go through here, never through derivation.
    pub async fn update(
        &self,
        ctx: &CallerContext,
        id: ObjectId,
        patch: ProjectPatch,
    ) -> Result<ProjectDoc> {
        let owner = self.fetch_owner_unscoped(id).await?;
        ctx.authorize_write_on(owner)?;

        let collection = self.mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await?;

        if let Some(update) = patch.into_update() {
            collection.update_one(doc! { "_id": id }, update).await?;
        }

        collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| TrackError::NotFound("project not found".into()))
    }

    /// Delete a project and cascade to its instances and connections.
    ///
    /// Sequence: connections → instances → project document. A failure
    /// partway surfaces as Database error and leaves the remainder in
    /// place (documented limitation, no compensating transaction).
    pub async fn delete(&self, ctx: &CallerContext, id: ObjectId) -> Result<()> {
        let owner = self.fetch_owner_unscoped(id).await?;
        ctx.authorize_write_on(owner)?;

        let connections = self.mongo.collection::<ConnectionDoc>(CONNECTION_COLLECTION).await?;
        connections.delete_many(doc! { "project": id }).await?;

        let instances = self
            .mongo
            .collection::<StageInstanceDoc>(STAGE_INSTANCE_COLLECTION)
            .await?;
        instances.delete_many(doc! { "project": id }).await?;

        let projects = self.mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await?;
        let result = projects.delete_one(doc! { "_id": id }).await?;
        if result.deleted_count == 0 {
            return Err(TrackError::NotFound("project not found".into()));
        }

        info!(project = %id, "Project deleted with cascade");
        Ok(())
    }

    /// Unscoped owner lookup for write paths. Missing documents are
    /// NotFound; existing ones feed the Forbidden-producing compare.
    async fn fetch_owner_unscoped(&self, id: ObjectId) -> Result<ObjectId> {
        let collection = self.mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await?;
        let project = collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| TrackError::NotFound("project not found".into()))?;
        Ok(project.owner)
    }
}
