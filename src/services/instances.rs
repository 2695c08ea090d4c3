//! Stage instance service
//!
//! Binds catalog stages into a project's ordered list and drives the
//! instance lifecycle. Every mutation here ends with the status engine's
//! `on_instance_changed` hook; deletion runs the connection cascade first.

use bson::{doc, oid::ObjectId, DateTime};
use tracing::info;

use crate::core::{next_order, CallerContext, InstancePatch, InstanceStatus};
use crate::dates::BusinessDate;
use crate::db::schemas::{
    ConnectionDoc, ProjectDoc, StageDoc, StageInstanceDoc, CONNECTION_COLLECTION,
    PROJECT_COLLECTION, STAGE_COLLECTION, STAGE_INSTANCE_COLLECTION,
};
use crate::db::MongoClient;
use crate::services::status_engine::StatusEngine;
use crate::types::{Result, TrackError};

/// Input for adding a stage to a project
#[derive(Debug, Clone)]
pub struct CreateInstance {
    pub stage_id: ObjectId,
    pub status: InstanceStatus,
    pub start_date: Option<BusinessDate>,
    pub completion_date: Option<BusinessDate>,
}

/// Stage instance operations backed by MongoDB
#[derive(Clone)]
pub struct InstanceService {
    mongo: MongoClient,
    status_engine: StatusEngine,
}

impl InstanceService {
    pub fn new(mongo: MongoClient) -> Self {
        let status_engine = StatusEngine::new(mongo.clone());
        Self {
            mongo,
            status_engine,
        }
    }

    /// List a project's instances in `order` ascending. The project
    /// itself must be visible to the caller (scoped lookup).
    pub async fn list(
        &self,
        ctx: &CallerContext,
        project_id: ObjectId,
    ) -> Result<Vec<StageInstanceDoc>> {
        self.require_visible_project(ctx, project_id).await?;

        let collection = self
            .mongo
            .collection::<StageInstanceDoc>(STAGE_INSTANCE_COLLECTION)
            .await?;
        collection
            .find_many_sorted(doc! { "project": project_id }, Some(doc! { "order": 1 }))
            .await
    }

    /// Add a stage to a project. Order is max of the project's existing
    /// orders plus one; the read-then-write is not atomic (accepted gap).
    pub async fn create(
        &self,
        ctx: &CallerContext,
        project_id: ObjectId,
        input: CreateInstance,
    ) -> Result<StageInstanceDoc> {
        let project = self.fetch_project_unscoped(project_id).await?;
        ctx.authorize_write_on(project.owner)?;

        // The bound catalog stage must exist in the caller's scope
        let stages = self.mongo.collection::<StageDoc>(STAGE_COLLECTION).await?;
        let stage = stages
            .find_one(doc! { "_id": input.stage_id })
            .await?
            .ok_or_else(|| TrackError::NotFound("stage not found".into()))?;
        ctx.authorize_read(stage.owner)?;

        let instances = self
            .mongo
            .collection::<StageInstanceDoc>(STAGE_INSTANCE_COLLECTION)
            .await?;
        let existing: Vec<i64> = instances
            .find_many(doc! { "project": project_id })
            .await?
            .into_iter()
            .map(|i| i.order)
            .collect();

        let mut instance = StageInstanceDoc::new(
            project_id,
            input.stage_id,
            input.status,
            input.start_date,
            input.completion_date,
            next_order(&existing),
        );
        let id = instances.insert_one(instance.clone()).await?;
        instance._id = Some(id);

        // Keep the project's ordered reference list in step
        let projects = self.mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await?;
        projects
            .update_one(
                doc! { "_id": project_id },
                doc! {
                    "$push": { "stages": id },
                    "$set": { "metadata.updated_at": DateTime::now() },
                },
            )
            .await?;

        info!(instance = %id, project = %project_id, order = instance.order, "Stage instance added");

        self.status_engine.on_instance_changed(project_id).await;
        Ok(instance)
    }

    /// Apply a lifecycle patch to an instance
    pub async fn update(
        &self,
        ctx: &CallerContext,
        project_id: ObjectId,
        instance_id: ObjectId,
        patch: InstancePatch,
    ) -> Result<StageInstanceDoc> {
        let project = self.fetch_project_unscoped(project_id).await?;
        ctx.authorize_write_on(project.owner)?;

        let instances = self
            .mongo
            .collection::<StageInstanceDoc>(STAGE_INSTANCE_COLLECTION)
            .await?;
        instances
            .find_one(doc! { "_id": instance_id, "project": project_id })
            .await?
            .ok_or_else(|| TrackError::NotFound("stage instance not found".into()))?;

        if let Some(update) = patch.into_update() {
            instances
                .update_one(doc! { "_id": instance_id }, update)
                .await?;
        }

        let updated = instances
            .find_one(doc! { "_id": instance_id })
            .await?
            .ok_or_else(|| TrackError::NotFound("stage instance not found".into()))?;

        self.status_engine.on_instance_changed(project_id).await;
        Ok(updated)
    }

    /// Delete an instance with its cascade: every connection touching it
    /// goes first (and is pulled from the surviving endpoints' lists),
    /// then the project's reference, then the instance itself, then
    /// status re-derivation. Not compensated on partial failure.
    pub async fn delete(
        &self,
        ctx: &CallerContext,
        project_id: ObjectId,
        instance_id: ObjectId,
    ) -> Result<()> {
        let project = self.fetch_project_unscoped(project_id).await?;
        ctx.authorize_write_on(project.owner)?;

        let instances = self
            .mongo
            .collection::<StageInstanceDoc>(STAGE_INSTANCE_COLLECTION)
            .await?;
        instances
            .find_one(doc! { "_id": instance_id, "project": project_id })
            .await?
            .ok_or_else(|| TrackError::NotFound("stage instance not found".into()))?;

        // 1. Connections where this instance is either endpoint
        let connections = self.mongo.collection::<ConnectionDoc>(CONNECTION_COLLECTION).await?;
        let touching = connections
            .find_many(ConnectionDoc::endpoint_filter(instance_id))
            .await?;
        let edge_ids: Vec<ObjectId> = touching.iter().filter_map(|c| c._id).collect();

        if !edge_ids.is_empty() {
            // Pull the doomed edge ids from every endpoint's list
            instances
                .update_many(
                    doc! { "connections": { "$in": edge_ids.clone() } },
                    doc! { "$pull": { "connections": { "$in": edge_ids.clone() } } },
                )
                .await?;
            connections
                .delete_many(doc! { "_id": { "$in": edge_ids } })
                .await?;
        }

        // 2. Unlink from the project's ordered list
        let projects = self.mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await?;
        projects
            .update_one(
                doc! { "_id": project_id },
                doc! {
                    "$pull": { "stages": instance_id },
                    "$set": { "metadata.updated_at": DateTime::now() },
                },
            )
            .await?;

        // 3. The instance itself
        instances.delete_one(doc! { "_id": instance_id }).await?;

        info!(
            instance = %instance_id,
            project = %project_id,
            connections = touching.len(),
            "Stage instance deleted with cascade"
        );

        // 4. Re-derive, best-effort
        self.status_engine.on_instance_changed(project_id).await;
        Ok(())
    }

    async fn fetch_project_unscoped(&self, project_id: ObjectId) -> Result<ProjectDoc> {
        let projects = self.mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await?;
        projects
            .find_one(doc! { "_id": project_id })
            .await?
            .ok_or_else(|| TrackError::NotFound("project not found".into()))
    }

    async fn require_visible_project(
        &self,
        ctx: &CallerContext,
        project_id: ObjectId,
    ) -> Result<()> {
        let mut filter = ctx
            .scope_filter()
            .ok_or_else(|| TrackError::NotFound("project not found".into()))?;
        filter.insert("_id", project_id);

        let projects = self.mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await?;
        projects
            .find_one(filter)
            .await?
            .map(|_| ())
            .ok_or_else(|| TrackError::NotFound("project not found".into()))
    }
}
