//! GkeCluster Custom Resource Definition

use std::fmt;

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// GkeCluster resource specification
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "cloudcontroller.io",
    version = "v1alpha1",
    kind = "GkeCluster",
    plural = "gkeclusters",
    singular = "gkecluster",
    shortname = "gkec",
    namespaced,
    status = "GkeClusterStatus",
    printcolumn = r#"{"name": "Phase", "type": "string", "jsonPath": ".status.phase"}"#,
    printcolumn = r#"{"name": "Zone", "type": "string", "jsonPath": ".spec.zone"}"#,
    printcolumn = r#"{"name": "Cluster", "type": "string", "jsonPath": ".spec.clusterName"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GkeClusterSpec {
    /// GCP zone hosting the cluster (e.g. us-central1-a)
    #[schemars(length(min = 1))]
    pub zone: String,

    /// Cluster name on the GKE side
    #[schemars(length(min = 1))]
    pub cluster_name: String,

    /// Number of nodes the default pool is created with
    #[schemars(range(min = 1))]
    pub initial_node_count: i32,
}

/// Lifecycle phase of a GkeCluster as last observed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ClusterPhase {
    #[default]
    Unspecified,
    Provisioning,
    Running,
    Degraded,
    Error,
}

impl fmt::Display for ClusterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClusterPhase::Unspecified => "Unspecified",
            ClusterPhase::Provisioning => "Provisioning",
            ClusterPhase::Running => "Running",
            ClusterPhase::Degraded => "Degraded",
            ClusterPhase::Error => "Error",
        };
        f.write_str(s)
    }
}

/// GkeCluster status
///
/// Written as a whole on every reconciliation pass. Absent fields serialize
/// as `null` so a merge patch clears whatever the previous pass recorded.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GkeClusterStatus {
    /// Current phase
    #[serde(default)]
    pub phase: ClusterPhase,

    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,

    /// Status string reported by GKE on the last observation
    #[serde(default)]
    pub provider_status: Option<String>,

    /// Name of the GKE operation that created the cluster
    #[serde(default)]
    pub operation: Option<String>,

    /// When the cloud state was last observed
    #[serde(default)]
    pub last_observed_time: Option<DateTime<Utc>>,

    /// Generation of the spec this status was derived from
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

impl GkeClusterStatus {
    /// Build a status for `phase` observed now
    pub fn observed(phase: ClusterPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: Some(message.into()),
            last_observed_time: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn with_provider_status(mut self, status: impl Into<String>) -> Self {
        self.provider_status = Some(status.into());
        self
    }

    pub fn with_operation(mut self, operation: Option<String>) -> Self {
        self.operation = operation;
        self
    }

    pub fn with_generation(mut self, generation: Option<i64>) -> Self {
        self.observed_generation = generation;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_serializes_as_pascal_case() {
        let json = serde_json::to_value(ClusterPhase::Provisioning).unwrap();
        assert_eq!(json, serde_json::json!("Provisioning"));
        assert_eq!(ClusterPhase::Error.to_string(), "Error");
    }

    #[test]
    fn status_serializes_absent_fields_as_null() {
        let status = GkeClusterStatus::observed(ClusterPhase::Running, "found");
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["phase"], "Running");
        assert_eq!(json["message"], "found");
        assert!(json["operation"].is_null());
        assert!(json.as_object().unwrap().contains_key("providerStatus"));
    }

    #[test]
    fn spec_uses_camel_case_fields() {
        let spec: GkeClusterSpec = serde_json::from_value(serde_json::json!({
            "zone": "us-central1-a",
            "clusterName": "demo",
            "initialNodeCount": 3
        }))
        .unwrap();

        assert_eq!(spec.cluster_name, "demo");
        assert_eq!(spec.initial_node_count, 3);
    }
}
