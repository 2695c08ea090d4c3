//! Email address book service
//!
//! Per-owner list of contact addresses used by report distribution.
//! Duplicate addresses within one owner's scope are rejected.

use bson::{doc, oid::ObjectId};
use tracing::info;

use crate::core::CallerContext;
use crate::db::schemas::{EmailDoc, EMAIL_COLLECTION};
use crate::db::MongoClient;
use crate::types::{Result, TrackError};

/// Email address operations backed by MongoDB
#[derive(Clone)]
pub struct EmailService {
    mongo: MongoClient,
}

impl EmailService {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }

    /// List addresses in the caller's scope
    pub async fn list(&self, ctx: &CallerContext) -> Result<Vec<EmailDoc>> {
        let filter = match ctx.scope_filter() {
            Some(f) => f,
            None => return Ok(Vec::new()),
        };
        let collection = self.mongo.collection::<EmailDoc>(EMAIL_COLLECTION).await?;
        collection
            .find_many_sorted(filter, Some(doc! { "address": 1 }))
            .await
    }

    /// Add an address to the caller's scope
    pub async fn create(
        &self,
        ctx: &CallerContext,
        address: &str,
        label: Option<String>,
    ) -> Result<EmailDoc> {
        ctx.authorize_write()?;

        let address = address.trim().to_lowercase();
        if address.is_empty() || !address.contains('@') {
            return Err(TrackError::Validation("invalid email address".into()));
        }

        let collection = self.mongo.collection::<EmailDoc>(EMAIL_COLLECTION).await?;
        if collection
            .find_one(doc! { "owner": ctx.owner_id(), "address": &address })
            .await?
            .is_some()
        {
            return Err(TrackError::Conflict(format!(
                "address '{address}' is already saved"
            )));
        }

        let mut email = EmailDoc::new(ctx.owner_id(), address, label);
        let id = collection.insert_one(email.clone()).await?;
        email._id = Some(id);

        info!(email = %id, "Email address saved");
        Ok(email)
    }

    /// Remove an address
    pub async fn delete(&self, ctx: &CallerContext, id: ObjectId) -> Result<()> {
        let collection = self.mongo.collection::<EmailDoc>(EMAIL_COLLECTION).await?;
        let email = collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| TrackError::NotFound("email address not found".into()))?;
        ctx.authorize_write_on(email.owner)?;

        collection.delete_one(doc! { "_id": id }).await?;
        info!(email = %id, "Email address removed");
        Ok(())
    }
}
