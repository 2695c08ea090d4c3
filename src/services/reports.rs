//! Project report service
//!
//! Assembles the read-only report view of a project: its instances in
//! order, each joined with its catalog stage definition and outgoing
//! connections. A deleted catalog stage leaves the joined fields null
//! rather than failing the report.

use std::collections::HashMap;

use bson::{doc, oid::ObjectId};
use serde::Serialize;

use crate::core::{CallerContext, InstanceStatus, ProjectStatus};
use crate::dates::BusinessDate;
use crate::db::schemas::{
    ConnectionDoc, ProjectDoc, StageDoc, StageInstanceDoc, CONNECTION_COLLECTION,
    PROJECT_COLLECTION, STAGE_COLLECTION, STAGE_INSTANCE_COLLECTION,
};
use crate::db::MongoClient;
use crate::types::{Result, TrackError};

/// One stage row in the report, joined with its catalog definition
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStage {
    pub instance_id: String,
    pub stage_name: Option<String>,
    pub stage_description: Option<String>,
    pub status: InstanceStatus,
    pub start_date: Option<BusinessDate>,
    pub completion_date: Option<BusinessDate>,
    pub order: i64,
    /// Instance ids this stage points at
    pub leads_to: Vec<String>,
}

/// The assembled project report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReport {
    pub project_id: String,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub created_on: Option<BusinessDate>,
    pub stages: Vec<ReportStage>,
}

/// Builds project reports from their constituent documents
#[derive(Clone)]
pub struct ReportService {
    mongo: MongoClient,
}

impl ReportService {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }

    /// Assemble the report for a visible project
    pub async fn build(&self, ctx: &CallerContext, project_id: ObjectId) -> Result<ProjectReport> {
        let mut filter = ctx
            .scope_filter()
            .ok_or_else(|| TrackError::NotFound("project not found".into()))?;
        filter.insert("_id", project_id);

        let projects = self.mongo.collection::<ProjectDoc>(PROJECT_COLLECTION).await?;
        let project = projects
            .find_one(filter)
            .await?
            .ok_or_else(|| TrackError::NotFound("project not found".into()))?;

        let instances = self
            .mongo
            .collection::<StageInstanceDoc>(STAGE_INSTANCE_COLLECTION)
            .await?
            .find_many_sorted(doc! { "project": project_id }, Some(doc! { "order": 1 }))
            .await?;

        let stage_ids: Vec<ObjectId> = instances.iter().map(|i| i.stage).collect();
        let stages = self
            .mongo
            .collection::<StageDoc>(STAGE_COLLECTION)
            .await?
            .find_many(doc! { "_id": { "$in": stage_ids } })
            .await?;
        let stage_by_id: HashMap<ObjectId, &StageDoc> =
            stages.iter().filter_map(|s| s._id.map(|id| (id, s))).collect();

        let connections = self
            .mongo
            .collection::<ConnectionDoc>(CONNECTION_COLLECTION)
            .await?
            .find_many(doc! { "project": project_id })
            .await?;

        Ok(assemble(project, instances, &stage_by_id, &connections))
    }
}

/// Pure assembly of the report from already-loaded documents
fn assemble(
    project: ProjectDoc,
    instances: Vec<StageInstanceDoc>,
    stage_by_id: &HashMap<ObjectId, &StageDoc>,
    connections: &[ConnectionDoc],
) -> ProjectReport {
    let stages = instances
        .into_iter()
        .map(|instance| {
            let catalog = stage_by_id.get(&instance.stage);
            let instance_id = instance._id.map(|id| id.to_hex()).unwrap_or_default();
            let leads_to = connections
                .iter()
                .filter(|c| Some(c.from_stage) == instance._id)
                .map(|c| c.to_stage.to_hex())
                .collect();

            ReportStage {
                instance_id,
                stage_name: catalog.map(|s| s.name.clone()),
                stage_description: catalog.map(|s| s.description.clone()),
                status: instance.status,
                start_date: instance.start_date,
                completion_date: instance.completion_date,
                order: instance.order,
                leads_to,
            }
        })
        .collect();

    ProjectReport {
        project_id: project._id.map(|id| id.to_hex()).unwrap_or_default(),
        name: project.name,
        description: project.description,
        status: project.status,
        created_on: project.created_on,
        stages,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(byte: u8) -> ObjectId {
        ObjectId::from_bytes([byte; 12])
    }

    fn instance(id: u8, stage: u8, order: i64) -> StageInstanceDoc {
        let mut doc = StageInstanceDoc::new(
            oid(1),
            oid(stage),
            InstanceStatus::Ongoing,
            "2024-03-01".parse().ok(),
            None,
            order,
        );
        doc._id = Some(oid(id));
        doc
    }

    #[test]
    fn report_rows_follow_instance_order() {
        let project = ProjectDoc::new(oid(9), "Build".into(), "".into(), None);
        let instances = vec![instance(10, 20, 1), instance(11, 21, 2)];
        let stage_by_id = HashMap::new();

        let report = assemble(project, instances, &stage_by_id, &[]);
        assert_eq!(report.stages.len(), 2);
        assert_eq!(report.stages[0].order, 1);
        assert_eq!(report.stages[1].order, 2);
    }

    #[test]
    fn deleted_catalog_stage_yields_null_join() {
        let project = ProjectDoc::new(oid(9), "Build".into(), "".into(), None);
        let instances = vec![instance(10, 20, 1)];
        let stage_by_id = HashMap::new();

        let report = assemble(project, instances, &stage_by_id, &[]);
        assert!(report.stages[0].stage_name.is_none());
        assert!(report.stages[0].stage_description.is_none());
    }

    #[test]
    fn leads_to_lists_only_outgoing_edges() {
        let project = ProjectDoc::new(oid(9), "Build".into(), "".into(), None);
        let instances = vec![instance(10, 20, 1), instance(11, 21, 2)];

        let mut stage = StageDoc::new(oid(9), "Design".into(), "".into());
        stage._id = Some(oid(20));
        let mut stage_by_id: HashMap<ObjectId, &StageDoc> = HashMap::new();
        stage_by_id.insert(oid(20), &stage);

        let edge = ConnectionDoc::new(oid(1), oid(10), oid(11));
        let report = assemble(project, instances, &stage_by_id, &[edge]);

        assert_eq!(report.stages[0].leads_to, vec![oid(11).to_hex()]);
        assert!(report.stages[1].leads_to.is_empty());
        assert_eq!(report.stages[0].stage_name.as_deref(), Some("Design"));
    }
}
