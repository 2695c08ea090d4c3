//! Access control predicate
//!
//! One uniform ownership/visibility check for every resource type. A
//! caller's visibility scope is a single manager id: managers see
//! themselves, referred users see their manager of record, and a user
//! with no referral sees nothing at all.
//!
//! Two failure surfaces, deliberately distinct:
//! - scoped lookups (query pre-filtered by owner) miss silently → NotFound,
//!   leaking no existence information;
//! - unscoped fetch-then-compare (write paths) → Forbidden when ownership
//!   or role fails on a resource known to exist.

use bson::{doc, oid::ObjectId, Document};

use crate::auth::Role;
use crate::types::{Result, TrackError};

/// Explicit caller identity passed into every service operation.
///
/// Built once per request from verified JWT claims plus an account lookup;
/// never ambient state.
#[derive(Debug, Clone)]
pub struct CallerContext {
    /// The caller's own account id
    pub account_id: ObjectId,
    /// The caller's role
    pub role: Role,
    /// The single owner id the caller may see, if any
    pub scope: Option<ObjectId>,
}

impl CallerContext {
    /// A manager's scope is itself
    pub fn manager(account_id: ObjectId) -> Self {
        CallerContext {
            account_id,
            role: Role::Manager,
            scope: Some(account_id),
        }
    }

    /// A referred user sees exactly its manager's resources
    pub fn referred_user(account_id: ObjectId, manager_id: ObjectId) -> Self {
        CallerContext {
            account_id,
            role: Role::User,
            scope: Some(manager_id),
        }
    }

    /// A user with no referral has an empty visibility scope
    pub fn unlinked_user(account_id: ObjectId) -> Self {
        CallerContext {
            account_id,
            role: Role::User,
            scope: None,
        }
    }

    /// Owner filter for list queries and scoped single-item lookups.
    ///
    /// `None` means the empty scope: list operations must return an empty
    /// result set without touching the store.
    pub fn scope_filter(&self) -> Option<Document> {
        self.scope.map(|owner| doc! { "owner": owner })
    }

    /// The owner id new resources created by this caller belong to.
    ///
    /// Only meaningful for managers; write authorization rejects everyone
    /// else before this is consulted.
    pub fn owner_id(&self) -> ObjectId {
        self.account_id
    }

    /// Check read access against a target fetched unscoped.
    ///
    /// Fails Forbidden: the caller addressed a resource that exists but is
    /// outside its scope.
    pub fn authorize_read(&self, target_owner: ObjectId) -> Result<()> {
        match self.scope {
            Some(owner) if owner == target_owner => Ok(()),
            _ => Err(TrackError::Forbidden(
                "resource belongs to another scope".to_string(),
            )),
        }
    }

    /// Check write access. Users are read-only everywhere, even inside
    /// their visible scope.
    pub fn authorize_write(&self) -> Result<()> {
        if !self.role.can_write() {
            return Err(TrackError::Forbidden(
                "write operations require the manager role".to_string(),
            ));
        }
        Ok(())
    }

    /// Combined gate for mutations on an existing resource: role first,
    /// then ownership of the unscoped-fetched target.
    pub fn authorize_write_on(&self, target_owner: ObjectId) -> Result<()> {
        self.authorize_write()?;
        self.authorize_read(target_owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(byte: u8) -> ObjectId {
        ObjectId::from_bytes([byte; 12])
    }

    #[test]
    fn test_manager_sees_only_itself() {
        let m = CallerContext::manager(oid(1));
        assert!(m.authorize_read(oid(1)).is_ok());
        assert!(matches!(
            m.authorize_read(oid(2)),
            Err(TrackError::Forbidden(_))
        ));
    }

    #[test]
    fn test_referred_user_sees_managers_scope() {
        let u = CallerContext::referred_user(oid(9), oid(1));
        assert!(u.authorize_read(oid(1)).is_ok());
        // Not even its own account id grants ownership
        assert!(u.authorize_read(oid(9)).is_err());
        assert!(u.authorize_read(oid(2)).is_err());
    }

    #[test]
    fn test_unlinked_user_sees_nothing() {
        let u = CallerContext::unlinked_user(oid(9));
        assert!(u.scope_filter().is_none());
        assert!(u.authorize_read(oid(1)).is_err());
        assert!(u.authorize_read(oid(9)).is_err());
    }

    #[test]
    fn test_users_are_read_only() {
        let u = CallerContext::referred_user(oid(9), oid(1));
        // Ownership would pass, role still denies
        assert!(u.authorize_read(oid(1)).is_ok());
        assert!(matches!(
            u.authorize_write(),
            Err(TrackError::Forbidden(_))
        ));
        assert!(u.authorize_write_on(oid(1)).is_err());
    }

    #[test]
    fn test_manager_write_gate() {
        let m = CallerContext::manager(oid(1));
        assert!(m.authorize_write().is_ok());
        assert!(m.authorize_write_on(oid(1)).is_ok());
        // Another manager's resource: Forbidden, not NotFound
        assert!(matches!(
            m.authorize_write_on(oid(2)),
            Err(TrackError::Forbidden(_))
        ));
    }

    #[test]
    fn test_scope_filter_targets_owner() {
        let m = CallerContext::manager(oid(1));
        let filter = m.scope_filter().unwrap();
        assert_eq!(filter.get_object_id("owner").unwrap(), oid(1));

        let u = CallerContext::referred_user(oid(9), oid(1));
        let filter = u.scope_filter().unwrap();
        assert_eq!(filter.get_object_id("owner").unwrap(), oid(1));
    }
}
