use serde::{Deserialize, Serialize};

use crate::models::stack::StackName;

wire_enum! {
    /// Rolled-up drift status of a whole stack.
    pub enum StackDriftStatus {
        InSync => "IN_SYNC",
        Drifted => "DRIFTED",
        NotChecked => "NOT_CHECKED",
        Unknown => "UNKNOWN",
    }
}

wire_enum! {
    /// Drift status of a single stack resource.
    pub enum ResourceDriftStatus {
        InSync => "IN_SYNC",
        Modified => "MODIFIED",
        Deleted => "DELETED",
        NotChecked => "NOT_CHECKED",
        Unknown => "UNKNOWN",
    }
}

impl ResourceDriftStatus {
    /// Statuses requested from `DescribeStackResourceDrifts`.
    pub const REPORTABLE: [ResourceDriftStatus; 3] =
        [Self::Modified, Self::Deleted, Self::NotChecked];

    /// Whether a resource with this status belongs in a drift report.
    pub fn is_reportable(&self) -> bool {
        matches!(self, Self::Modified | Self::Deleted | Self::NotChecked)
    }
}

wire_enum! {
    pub enum DifferenceType {
        Add => "ADD",
        Remove => "REMOVE",
        NotEqual => "NOT_EQUAL",
    }
}

/// State of a drift detection job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DriftDetectionStatus {
    InProgress,
    Complete,
    Failed { reason: String },
}

impl DriftDetectionStatus {
    /// Build from the wire status and the optional `DetectionStatusReason`.
    ///
    /// Anything other than the two terminal values counts as in progress.
    pub fn from_wire(status: &str, reason: Option<&str>) -> Self {
        match status {
            "DETECTION_COMPLETE" => Self::Complete,
            "DETECTION_FAILED" => Self::Failed {
                reason: reason.unwrap_or("no reason given").to_string(),
            },
            _ => Self::InProgress,
        }
    }
}

/// A drift detection job started against one stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftDetectionJob {
    pub stack: StackName,
    /// `StackDriftDetectionId`, distinct from the stack ARN.
    pub detection_id: String,
    pub status: DriftDetectionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDiff {
    /// e.g. `/Properties/Timeout` or `Properties.Tags[0].Value`
    pub property_path: String,
    pub expected_value: String,
    pub actual_value: String,
    pub difference_type: DifferenceType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftedResource {
    pub logical_id: String,
    /// Empty when CloudFormation reports none, e.g. for deleted resources.
    pub physical_id: String,
    pub resource_type: String,
    pub drift_status: ResourceDriftStatus,
    pub property_diffs: Vec<PropertyDiff>,
}

/// Drift report for one stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftOutcome {
    pub stack: StackName,
    pub drift_status: StackDriftStatus,
    /// Only modified, deleted, or not-checked resources, in reported order.
    pub drifted_resources: Vec<DriftedResource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reportable_matches_filter_set() {
        for status in ResourceDriftStatus::REPORTABLE {
            assert!(status.is_reportable());
        }
        assert!(!ResourceDriftStatus::InSync.is_reportable());
        assert!(!ResourceDriftStatus::Unknown.is_reportable());
        assert!(!ResourceDriftStatus::Other("FUTURE".into()).is_reportable());
    }

    #[test]
    fn detection_status_carries_reason_only_when_failed() {
        assert_eq!(
            DriftDetectionStatus::from_wire("DETECTION_IN_PROGRESS", Some("ignored")),
            DriftDetectionStatus::InProgress
        );
        assert_eq!(
            DriftDetectionStatus::from_wire("DETECTION_FAILED", Some("throttled")),
            DriftDetectionStatus::Failed {
                reason: "throttled".into()
            }
        );
    }
}
