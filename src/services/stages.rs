//! Stage catalog service
//!
//! Reusable stages owned by a manager, plus project-scoped custom stages.
//! Same access discipline as projects: scoped reads, unscoped-compare
//! writes.

use bson::{doc, oid::ObjectId, DateTime};
use tracing::info;

use crate::core::CallerContext;
use crate::db::schemas::{ProjectDoc, StageDoc, PROJECT_COLLECTION, STAGE_COLLECTION};
use crate::db::MongoClient;
use crate::types::{Result, TrackError};

/// Input for catalog stage creation
#[derive(Debug, Clone)]
pub struct CreateStage {
    pub name: String,
    pub description: String,
    /// When set, the stage is custom to this project
    pub project_id: Option<ObjectId>,
}

/// Catalog stage operations backed by MongoDB
#[derive(Clone)]
pub struct StageService {
    mongo: MongoClient,
}

impl StageService {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }

    /// List catalog stages in the caller's scope
    pub async fn list(&self, ctx: &CallerContext) -> Result<Vec<StageDoc>> {
        let filter = match ctx.scope_filter() {
            Some(f) => f,
            None => return Ok(Vec::new()),
        };
        let collection = self.mongo.collection::<StageDoc>(STAGE_COLLECTION).await?;
        collection
            .find_many_sorted(filter, Some(doc! { "name": 1 }))
            .await
    }

    /// Scoped single-stage lookup
    pub async fn get(&self, ctx: &CallerContext, id: ObjectId) -> Result<StageDoc> {
        let mut filter = ctx
            .scope_filter()
            .ok_or_else(|| TrackError::NotFound("stage not found".into()))?;
        filter.insert("_id", id);

        let collection = self.mongo.collection::<StageDoc>(STAGE_COLLECTION).await?;
        collection
            .find_one(filter)
            .await?
            .ok_or_else(|| TrackError::NotFound("stage not found".into()))
    }

    /// Create a catalog stage; with a project id it becomes custom to
    /// that project (the project must be the caller's own).
    pub async fn create(&self, ctx: &CallerContext, input: CreateStage) -> Result<StageDoc> {
        ctx.authorize_write()?;
        if input.name.trim().is_empty() {
            return Err(TrackError::Validation("stage name is required".into()));
        }

        let mut stage = match input.project_id {
            Some(project_id) => {
                let projects = self.mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await?;
                let project = projects
                    .find_one(doc! { "_id": project_id })
                    .await?
                    .ok_or_else(|| TrackError::NotFound("project not found".into()))?;
                ctx.authorize_write_on(project.owner)?;
                StageDoc::new_custom(ctx.owner_id(), input.name, input.description, project_id)
            }
            None => StageDoc::new(ctx.owner_id(), input.name, input.description),
        };

        let collection = self.mongo.collection::<StageDoc>(STAGE_COLLECTION).await?;
        let id = collection.insert_one(stage.clone()).await?;
        stage._id = Some(id);

        info!(stage = %id, custom = stage.is_custom, "Catalog stage created");
        Ok(stage)
    }

    /// Rename or re-describe a catalog stage
    pub async fn update(
        &self,
        ctx: &CallerContext,
        id: ObjectId,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<StageDoc> {
        let collection = self.mongo.collection::<StageDoc>(STAGE_COLLECTION).await?;
        let stage = collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| TrackError::NotFound("stage not found".into()))?;
        ctx.authorize_write_on(stage.owner)?;

        let mut set = doc! { "metadata.updated_at": DateTime::now() };
        if let Some(name) = name {
            if name.trim().is_empty() {
                return Err(TrackError::Validation("stage name is required".into()));
            }
            set.insert("name", name);
        }
        if let Some(description) = description {
            set.insert("description", description);
        }

        collection
            .update_one(doc! { "_id": id }, doc! { "$set": set })
            .await?;

        collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| TrackError::NotFound("stage not found".into()))
    }

    /// Delete a catalog stage definition. Instances referencing it keep
    /// their binding id; the join simply comes back empty in reports.
    pub async fn delete(&self, ctx: &CallerContext, id: ObjectId) -> Result<()> {
        let collection = self.mongo.collection::<StageDoc>(STAGE_COLLECTION).await?;
        let stage = collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| TrackError::NotFound("stage not found".into()))?;
        ctx.authorize_write_on(stage.owner)?;

        collection.delete_one(doc! { "_id": id }).await?;
        info!(stage = %id, "Catalog stage deleted");
        Ok(())
    }
}
