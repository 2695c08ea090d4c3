//! Account document schema
//!
//! Stores credentials, the role, and the referral back-reference that
//! defines a user's visibility scope. Invariant: `referred_by` is None for
//! managers and Some(manager id) for referred users; a user document with
//! no referral sees nothing.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for accounts
pub const ACCOUNT_COLLECTION: &str = "accounts";

/// Account document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AccountDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Login identifier (email or username)
    pub identifier: String,

    /// Argon2 password hash
    pub password_hash: String,

    /// Account role
    #[serde(default)]
    pub role: Role,

    /// Referring manager; None for managers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<ObjectId>,

    /// Token version for invalidation (increment to invalidate all tokens)
    #[serde(default)]
    pub token_version: i32,

    /// Whether the account is active
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl AccountDoc {
    /// Create a manager account
    pub fn new_manager(identifier: String, password_hash: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            identifier,
            password_hash,
            role: Role::Manager,
            referred_by: None,
            token_version: 1,
            is_active: true,
        }
    }

    /// Create a referred read-only user account
    pub fn new_referred_user(
        identifier: String,
        password_hash: String,
        manager_id: ObjectId,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            identifier,
            password_hash,
            role: Role::User,
            referred_by: Some(manager_id),
            token_version: 1,
            is_active: true,
        }
    }
}

impl IntoIndexes for AccountDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on identifier
            (
                doc! { "identifier": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("identifier_unique".to_string())
                        .build(),
                ),
            ),
            // Index on referred_by for scope resolution
            (
                doc! { "referred_by": 1 },
                Some(
                    IndexOptions::builder()
                        .name("referred_by_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for AccountDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_has_no_referral() {
        let m = AccountDoc::new_manager("m@example.com".into(), "hash".into());
        assert_eq!(m.role, Role::Manager);
        assert!(m.referred_by.is_none());
        assert!(m.is_active);
    }

    #[test]
    fn test_referred_user_points_at_manager() {
        let mid = ObjectId::new();
        let u = AccountDoc::new_referred_user("u@example.com".into(), "hash".into(), mid);
        assert_eq!(u.role, Role::User);
        assert_eq!(u.referred_by, Some(mid));
    }
}
