//! Project status derivation
//!
//! A project's aggregate status is recomputed from its stage instances
//! after every instance mutation. The derivation only ever produces
//! Pending or Ongoing; Completed and Archived are operator decisions that
//! the engine must not override. In particular, a project whose stages are
//! all Completed keeps its current status: stage completion is necessary
//! but not sufficient for project completion, since stages may still be
//! added.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::TrackError;

/// Aggregate project status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProjectStatus {
    #[default]
    Pending,
    Ongoing,
    Completed,
    Archived,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectStatus::Pending => write!(f, "Pending"),
            ProjectStatus::Ongoing => write!(f, "Ongoing"),
            ProjectStatus::Completed => write!(f, "Completed"),
            ProjectStatus::Archived => write!(f, "Archived"),
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ProjectStatus::Pending),
            "Ongoing" => Ok(ProjectStatus::Ongoing),
            "Completed" => Ok(ProjectStatus::Completed),
            "Archived" => Ok(ProjectStatus::Archived),
            other => Err(TrackError::Conflict(format!(
                "invalid project status '{other}'"
            ))),
        }
    }
}

/// Per-instance lifecycle status
///
/// No "not started" state exists: a stage only enters a project once it is
/// at least Ongoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InstanceStatus {
    #[default]
    Ongoing,
    Completed,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceStatus::Ongoing => write!(f, "Ongoing"),
            InstanceStatus::Completed => write!(f, "Completed"),
        }
    }
}

impl FromStr for InstanceStatus {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ongoing" => Ok(InstanceStatus::Ongoing),
            "Completed" => Ok(InstanceStatus::Completed),
            other => Err(TrackError::Conflict(format!(
                "invalid stage status '{other}'"
            ))),
        }
    }
}

/// Derive a project's status from its instance statuses.
///
/// Pure function of the instance-status multiset and the current stored
/// status. Precedence, in order:
/// 1. zero instances → Pending
/// 2. any Ongoing → Ongoing
/// 3. all Completed → current status unchanged (no auto-promote)
/// 4. anything else → Pending
pub fn derive_status(current: ProjectStatus, instances: &[InstanceStatus]) -> ProjectStatus {
    if instances.is_empty() {
        return ProjectStatus::Pending;
    }
    if instances.iter().any(|s| *s == InstanceStatus::Ongoing) {
        return ProjectStatus::Ongoing;
    }
    if instances.iter().all(|s| *s == InstanceStatus::Completed) {
        return current;
    }
    ProjectStatus::Pending
}

#[cfg(test)]
mod tests {
    use super::InstanceStatus::{Completed, Ongoing};
    use super::ProjectStatus;
    use super::*;

    #[test]
    fn test_empty_project_is_pending() {
        assert_eq!(
            derive_status(ProjectStatus::Ongoing, &[]),
            ProjectStatus::Pending
        );
        assert_eq!(
            derive_status(ProjectStatus::Archived, &[]),
            ProjectStatus::Pending
        );
    }

    #[test]
    fn test_any_ongoing_wins() {
        assert_eq!(
            derive_status(ProjectStatus::Pending, &[Ongoing]),
            ProjectStatus::Ongoing
        );
        assert_eq!(
            derive_status(ProjectStatus::Pending, &[Completed, Ongoing, Completed]),
            ProjectStatus::Ongoing
        );
    }

    #[test]
    fn test_all_completed_keeps_current() {
        // No auto-promote: completion of every stage is not project completion.
        assert_eq!(
            derive_status(ProjectStatus::Ongoing, &[Completed, Completed]),
            ProjectStatus::Ongoing
        );
        assert_eq!(
            derive_status(ProjectStatus::Archived, &[Completed, Completed]),
            ProjectStatus::Archived
        );
        assert_eq!(
            derive_status(ProjectStatus::Completed, &[Completed]),
            ProjectStatus::Completed
        );
        assert_eq!(
            derive_status(ProjectStatus::Pending, &[Completed]),
            ProjectStatus::Pending
        );
    }

    #[test]
    fn test_idempotent() {
        let cases: &[(ProjectStatus, &[InstanceStatus])] = &[
            (ProjectStatus::Pending, &[]),
            (ProjectStatus::Ongoing, &[Completed, Completed]),
            (ProjectStatus::Archived, &[Completed]),
            (ProjectStatus::Pending, &[Ongoing, Completed]),
        ];
        for (current, instances) in cases {
            let once = derive_status(*current, instances);
            let twice = derive_status(once, instances);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_never_produces_archived_as_transition() {
        // Archived only survives via the keep-current rule, never as a
        // computed transition target.
        assert_eq!(
            derive_status(ProjectStatus::Archived, &[Ongoing]),
            ProjectStatus::Ongoing
        );
        assert_eq!(
            derive_status(ProjectStatus::Archived, &[]),
            ProjectStatus::Pending
        );
    }

    #[test]
    fn test_lifecycle_scenario() {
        // Add S1 ongoing → Ongoing
        let mut status = ProjectStatus::Pending;
        status = derive_status(status, &[Ongoing]);
        assert_eq!(status, ProjectStatus::Ongoing);

        // Complete S1 → single instance all-Completed, stays Ongoing
        status = derive_status(status, &[Completed]);
        assert_eq!(status, ProjectStatus::Ongoing);

        // Delete S1 → zero instances, back to Pending
        status = derive_status(status, &[]);
        assert_eq!(status, ProjectStatus::Pending);
    }

    #[test]
    fn test_status_parse_round_trip() {
        for s in ["Pending", "Ongoing", "Completed", "Archived"] {
            let parsed: ProjectStatus = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
        assert!("pending".parse::<ProjectStatus>().is_err());
        assert!("Done".parse::<InstanceStatus>().is_err());
    }
}
