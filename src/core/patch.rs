//! Partial-update payloads
//!
//! Requests update resources field-by-field; each patch type mirrors that
//! with per-field `Option` semantics and a pure merge into a MongoDB
//! update document, independently testable without a request in flight.
//!
//! The instance patch also encodes the lifecycle date rules: moving a
//! stage back to Ongoing discards its completion date unconditionally,
//! while completing a stage never clears a previously recorded start date.

use bson::{doc, DateTime, Document};

use crate::core::status::{InstanceStatus, ProjectStatus};
use crate::dates::BusinessDate;

/// Partial update for a project
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Operator-driven status change; Completed and Archived are only
    /// reachable through this path, never through derivation.
    pub status: Option<ProjectStatus>,
    pub created_on: Option<BusinessDate>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.created_on.is_none()
    }

    /// Build the `$set` update document, or None when nothing changes
    pub fn into_update(self) -> Option<Document> {
        if self.is_empty() {
            return None;
        }

        let mut set = doc! { "metadata.updated_at": DateTime::now() };
        if let Some(name) = self.name {
            set.insert("name", name);
        }
        if let Some(description) = self.description {
            set.insert("description", description);
        }
        if let Some(status) = self.status {
            set.insert("status", status.to_string());
        }
        if let Some(created_on) = self.created_on {
            set.insert("created_on", created_on.to_string());
        }

        Some(doc! { "$set": set })
    }
}

/// Partial update for a stage instance
#[derive(Debug, Clone, Default)]
pub struct InstancePatch {
    pub status: Option<InstanceStatus>,
    pub start_date: Option<BusinessDate>,
    pub completion_date: Option<BusinessDate>,
}

impl InstancePatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.start_date.is_none() && self.completion_date.is_none()
    }

    /// Build the update document, applying the lifecycle date rules
    pub fn into_update(self) -> Option<Document> {
        if self.is_empty() {
            return None;
        }

        let mut set = doc! { "metadata.updated_at": DateTime::now() };
        let mut unset = Document::new();

        if let Some(start) = self.start_date {
            set.insert("start_date", start.to_string());
        }

        match self.status {
            Some(InstanceStatus::Ongoing) => {
                set.insert("status", InstanceStatus::Ongoing.to_string());
                // Back to ongoing: the completion date no longer holds
                unset.insert("completion_date", "");
            }
            Some(InstanceStatus::Completed) => {
                set.insert("status", InstanceStatus::Completed.to_string());
                if let Some(completion) = self.completion_date {
                    set.insert("completion_date", completion.to_string());
                }
            }
            None => {
                if let Some(completion) = self.completion_date {
                    set.insert("completion_date", completion.to_string());
                }
            }
        }

        let mut update = doc! { "$set": set };
        if !unset.is_empty() {
            update.insert("$unset", unset);
        }
        Some(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> BusinessDate {
        BusinessDate::parse(s).unwrap()
    }

    #[test]
    fn test_empty_project_patch_is_noop() {
        assert!(ProjectPatch::default().into_update().is_none());
    }

    #[test]
    fn test_project_patch_sets_only_present_fields() {
        let patch = ProjectPatch {
            name: Some("Relaunch".to_string()),
            status: Some(ProjectStatus::Archived),
            ..Default::default()
        };
        let update = patch.into_update().unwrap();
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("name").unwrap(), "Relaunch");
        assert_eq!(set.get_str("status").unwrap(), "Archived");
        assert!(set.get("description").is_none());
        assert!(set.get("created_on").is_none());
        assert!(set.get("metadata.updated_at").is_some());
    }

    #[test]
    fn test_move_to_ongoing_clears_completion_date() {
        let patch = InstancePatch {
            status: Some(InstanceStatus::Ongoing),
            start_date: Some(date("2024-02-01")),
            completion_date: None,
        };
        let update = patch.into_update().unwrap();
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "Ongoing");
        assert_eq!(set.get_str("start_date").unwrap(), "2024-02-01");

        let unset = update.get_document("$unset").unwrap();
        assert!(unset.get("completion_date").is_some());
    }

    #[test]
    fn test_move_to_ongoing_ignores_submitted_completion_date() {
        // Even if the request carries one, ongoing stages have no
        // completion date.
        let patch = InstancePatch {
            status: Some(InstanceStatus::Ongoing),
            start_date: None,
            completion_date: Some(date("2024-03-01")),
        };
        let update = patch.into_update().unwrap();
        let set = update.get_document("$set").unwrap();
        assert!(set.get("completion_date").is_none());
        assert!(update.get_document("$unset").unwrap().get("completion_date").is_some());
    }

    #[test]
    fn test_complete_keeps_prior_start_date() {
        let patch = InstancePatch {
            status: Some(InstanceStatus::Completed),
            start_date: None,
            completion_date: Some(date("2024-01-10")),
        };
        let update = patch.into_update().unwrap();
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "Completed");
        assert_eq!(set.get_str("completion_date").unwrap(), "2024-01-10");
        // start_date untouched: not set, not unset
        assert!(set.get("start_date").is_none());
        assert!(update.get_document("$unset").is_err());
    }

    #[test]
    fn test_dates_only_patch() {
        let patch = InstancePatch {
            status: None,
            start_date: Some(date("2024-01-01")),
            completion_date: Some(date("2024-01-05")),
        };
        let update = patch.into_update().unwrap();
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("start_date").unwrap(), "2024-01-01");
        assert_eq!(set.get_str("completion_date").unwrap(), "2024-01-05");
        assert!(set.get("status").is_none());
    }

    #[test]
    fn test_empty_instance_patch_is_noop() {
        assert!(InstancePatch::default().into_update().is_none());
    }
}
