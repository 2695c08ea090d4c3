//! Stage connection service
//!
//! Directed edges between stage instances of the same project. Edges
//! carry direction: A→B and B→A are distinct. An exact duplicate of an
//! existing edge is rejected; nothing here checks for cycles, and a
//! self-loop is just the trivial cycle.

use bson::{doc, oid::ObjectId, DateTime};
use tracing::info;

use crate::core::CallerContext;
use crate::db::schemas::{
    ConnectionDoc, ProjectDoc, StageInstanceDoc, CONNECTION_COLLECTION, PROJECT_COLLECTION,
    STAGE_INSTANCE_COLLECTION,
};
use crate::db::MongoClient;
use crate::types::{Result, TrackError};

/// Connection operations backed by MongoDB
#[derive(Clone)]
pub struct ConnectionService {
    mongo: MongoClient,
}

impl ConnectionService {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }

    /// List a project's connections
    pub async fn list(
        &self,
        ctx: &CallerContext,
        project_id: ObjectId,
    ) -> Result<Vec<ConnectionDoc>> {
        self.require_visible_project(ctx, project_id).await?;

        let collection = self.mongo.collection::<ConnectionDoc>(CONNECTION_COLLECTION).await?;
        collection.find_many(doc! { "project": project_id }).await
    }

    /// Create a directed edge between two instances of the project.
    /// Both endpoints must belong to the project; an existing identical
    /// edge is a Conflict.
    pub async fn create(
        &self,
        ctx: &CallerContext,
        project_id: ObjectId,
        from: ObjectId,
        to: ObjectId,
    ) -> Result<ConnectionDoc> {
        let project = self.fetch_project_unscoped(project_id).await?;
        ctx.authorize_write_on(project.owner)?;

        let instances = self
            .mongo
            .collection::<StageInstanceDoc>(STAGE_INSTANCE_COLLECTION)
            .await?;
        for endpoint in [from, to] {
            instances
                .find_one(doc! { "_id": endpoint, "project": project_id })
                .await?
                .ok_or_else(|| TrackError::NotFound("stage instance not found".into()))?;
        }

        let connections = self.mongo.collection::<ConnectionDoc>(CONNECTION_COLLECTION).await?;
        if connections
            .find_one(ConnectionDoc::edge_filter(project_id, from, to))
            .await?
            .is_some()
        {
            return Err(TrackError::Conflict("connection already exists".into()));
        }

        let mut connection = ConnectionDoc::new(project_id, from, to);
        let id = connections.insert_one(connection.clone()).await?;
        connection._id = Some(id);

        // Both endpoints reference the edge
        instances
            .update_many(
                doc! { "_id": { "$in": [from, to] } },
                doc! {
                    "$push": { "connections": id },
                    "$set": { "metadata.updated_at": DateTime::now() },
                },
            )
            .await?;

        info!(connection = %id, from = %from, to = %to, "Connection created");
        Ok(connection)
    }

    /// Delete a connection and pull its id from both endpoints
    pub async fn delete(
        &self,
        ctx: &CallerContext,
        project_id: ObjectId,
        connection_id: ObjectId,
    ) -> Result<()> {
        let project = self.fetch_project_unscoped(project_id).await?;
        ctx.authorize_write_on(project.owner)?;

        let connections = self.mongo.collection::<ConnectionDoc>(CONNECTION_COLLECTION).await?;
        let connection = connections
            .find_one(doc! { "_id": connection_id, "project": project_id })
            .await?
            .ok_or_else(|| TrackError::NotFound("connection not found".into()))?;

        let instances = self
            .mongo
            .collection::<StageInstanceDoc>(STAGE_INSTANCE_COLLECTION)
            .await?;
        instances
            .update_many(
                doc! { "_id": { "$in": [connection.from_stage, connection.to_stage] } },
                doc! { "$pull": { "connections": connection_id } },
            )
            .await?;

        connections.delete_one(doc! { "_id": connection_id }).await?;

        info!(connection = %connection_id, project = %project_id, "Connection deleted");
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
