//! Account roles
//!
//! Two roles gate every operation: managers own projects, stages, and
//! recipient lists and have full write access within their own scope;
//! referred users get read-only visibility into exactly one manager's
//! scope. Writes are rejected for users before any ownership check runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::TrackError;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Owns resources, full write access within its own scope
    Manager,
    /// Read-only visibility into the referring manager's scope
    #[default]
    User,
}

impl Role {
    /// Whether this role may create, update, or delete resources
    pub fn can_write(&self) -> bool {
        matches!(self, Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Manager => write!(f, "manager"),
            Role::User => write!(f, "user"),
        }
    }
}

impl FromStr for Role {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manager" => Ok(Role::Manager),
            "user" => Ok(Role::User),
            other => Err(TrackError::Validation(format!("unknown role '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_gate() {
        assert!(Role::Manager.can_write());
        assert!(!Role::User.can_write());
    }

    #[test]
    fn test_parse_round_trip() {
        assert_eq!("manager".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(Role::Manager.to_string(), "manager");
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), "\"manager\"");
        let r: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(r, Role::User);
    }
}
