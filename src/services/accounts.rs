//! Account service: registration, login, caller resolution
//!
//! Registration either creates a manager or, when a referral code naming
//! an existing manager is supplied, a read-only referred user. Caller
//! resolution turns verified JWT claims into the explicit `CallerContext`
//! every core operation takes; it is the only place the referral chain is
//! walked.

use bson::{doc, oid::ObjectId};
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, Claims, Role};
use crate::core::CallerContext;
use crate::db::schemas::{AccountDoc, ACCOUNT_COLLECTION};
use crate::db::MongoClient;
use crate::types::{Result, TrackError};

/// Account operations backed by MongoDB
#[derive(Clone)]
pub struct AccountService {
    mongo: MongoClient,
}

impl AccountService {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }

    /// Register an account. With a referral code (a manager's id) the new
    /// account is a referred user; without one it is a manager.
    pub async fn register(
        &self,
        identifier: &str,
        password: &str,
        referral_code: Option<&str>,
    ) -> Result<AccountDoc> {
        if identifier.trim().is_empty() {
            return Err(TrackError::Validation("identifier is required".into()));
        }
        if password.len() < 8 {
            return Err(TrackError::Validation(
                "password must be at least 8 characters".into(),
            ));
        }

        let collection = self.mongo.collection::<AccountDoc>(ACCOUNT_COLLECTION).await?;

        if collection
            .find_one(doc! { "identifier": identifier })
            .await?
            .is_some()
        {
            return Err(TrackError::Conflict(format!(
                "account '{identifier}' already exists"
            )));
        }

        let password_hash = hash_password(password)?;

        let mut account = match referral_code {
            Some(code) => {
                let manager_id = ObjectId::parse_str(code)
                    .map_err(|_| TrackError::Validation("invalid referral code".into()))?;
                let manager = collection
                    .find_one(doc! { "_id": manager_id })
                    .await?
                    .ok_or_else(|| TrackError::Validation("referring manager not found".into()))?;
                if manager.role != Role::Manager {
                    return Err(TrackError::Validation(
                        "referral code must name a manager account".into(),
                    ));
                }
                AccountDoc::new_referred_user(
                    identifier.to_string(),
                    password_hash,
                    manager_id,
                )
            }
            None => AccountDoc::new_manager(identifier.to_string(), password_hash),
        };

        let id = collection.insert_one(account.clone()).await?;
        account._id = Some(id);

        info!(identifier = %identifier, role = %account.role, "Account registered");
        Ok(account)
    }

    /// Verify credentials and return the account for token issuance
    pub async fn login(&self, identifier: &str, password: &str) -> Result<AccountDoc> {
        let collection = self.mongo.collection::<AccountDoc>(ACCOUNT_COLLECTION).await?;

        let account = collection
            .find_one(doc! { "identifier": identifier })
            .await?
            .ok_or_else(|| TrackError::Auth("invalid credentials".into()))?;

        if !verify_password(password, &account.password_hash)? {
            warn!(identifier = %identifier, "Login failed: bad password");
            return Err(TrackError::Auth("invalid credentials".into()));
        }

        if !account.is_active {
            return Err(TrackError::Auth("account is deactivated".into()));
        }

        Ok(account)
    }

    /// Fetch an account by id
    pub async fn find_by_id(&self, id: ObjectId) -> Result<AccountDoc> {
        let collection = self.mongo.collection::<AccountDoc>(ACCOUNT_COLLECTION).await?;
        collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| TrackError::NotFound("account not found".into()))
    }

    /// Build the caller context for verified claims.
    ///
    /// Managers scope to themselves. Users scope to their referring
    /// manager, validated to exist with the manager role; a missing or
    /// invalid referral leaves the user with an empty scope rather than
    /// failing the request.
    pub async fn resolve_caller(&self, claims: &Claims) -> Result<CallerContext> {
        let account_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| TrackError::Auth("malformed token subject".into()))?;

        let collection = self.mongo.collection::<AccountDoc>(ACCOUNT_COLLECTION).await?;
        let account = collection
            .find_one(doc! { "_id": account_id })
            .await?
            .ok_or_else(|| TrackError::Auth("account no longer exists".into()))?;

        if !account.is_active {
            return Err(TrackError::Auth("account is deactivated".into()));
        }
        if account.token_version != claims.token_version {
            return Err(TrackError::Auth("token has been invalidated".into()));
        }

        match account.role {
            Role::Manager => Ok(CallerContext::manager(account_id)),
            Role::User => match account.referred_by {
                Some(manager_id) => {
                    let manager = collection.find_one(doc! { "_id": manager_id }).await?;
                    match manager {
                        Some(m) if m.role == Role::Manager => {
                            Ok(CallerContext::referred_user(account_id, manager_id))
                        }
                        _ => {
                            warn!(
                                account = %account_id,
                                "Referral points at a missing or non-manager account"
                            );
                            Ok(CallerContext::unlinked_user(account_id))
                        }
                    }
                }
                None => Ok(CallerContext::unlinked_user(account_id)),
            },
        }
    }
}
