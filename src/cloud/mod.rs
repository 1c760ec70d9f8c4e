//! Cloud provider capability
//!
//! The reconciler only needs two calls from the provider: look up a cluster
//! and request its creation. [`CloudClient`] is that seam; [`GkeClient`]
//! implements it against the Container Engine REST API.

pub mod gke;

pub use gke::GkeClient;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a [`CloudClient`]
#[derive(Error, Debug)]
pub enum CloudError {
    /// The provider has no cluster with this zone and name
    #[error("cluster {name} not found in zone {zone}")]
    NotFound { zone: String, name: String },

    /// The provider rejected the request
    #[error("provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never produced a provider response
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a body that is not the expected resource
    #[error("malformed provider response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl CloudError {
    /// Whether this is the not-found precondition that triggers creation
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound { .. })
    }
}

/// Cluster status as reported by GKE
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderStatus {
    Unspecified,
    Provisioning,
    Running,
    Reconciling,
    Stopping,
    Error,
    Degraded,
    Other(String),
}

impl ProviderStatus {
    /// Parse the status string used by the Container Engine API
    pub fn parse(s: &str) -> Self {
        match s {
            "" | "STATUS_UNSPECIFIED" => ProviderStatus::Unspecified,
            "PROVISIONING" => ProviderStatus::Provisioning,
            "RUNNING" => ProviderStatus::Running,
            "RECONCILING" => ProviderStatus::Reconciling,
            "STOPPING" => ProviderStatus::Stopping,
            "ERROR" => ProviderStatus::Error,
            "DEGRADED" => ProviderStatus::Degraded,
            other => ProviderStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderStatus::Unspecified => "STATUS_UNSPECIFIED",
            ProviderStatus::Provisioning => "PROVISIONING",
            ProviderStatus::Running => "RUNNING",
            ProviderStatus::Reconciling => "RECONCILING",
            ProviderStatus::Stopping => "STOPPING",
            ProviderStatus::Error => "ERROR",
            ProviderStatus::Degraded => "DEGRADED",
            ProviderStatus::Other(s) => s,
        };
        f.write_str(s)
    }
}

/// The provider's view of a cluster
#[derive(Clone, Debug)]
pub struct ExternalCluster {
    pub name: String,
    pub zone: String,
    pub status: ProviderStatus,
    pub node_count: i32,
}

/// Parameters for a cluster creation call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateClusterRequest {
    pub name: String,
    pub initial_node_count: i32,
}

/// Opaque handle of a provider-side create operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationHandle(pub String);

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cloud provider operations used by the reconciler
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Fetch the current state of a cluster
    ///
    /// Returns [`CloudError::NotFound`] when the cluster does not exist.
    async fn get_cluster(&self, zone: &str, name: &str) -> Result<ExternalCluster, CloudError>;

    /// Start creating a cluster
    async fn create_cluster(
        &self,
        zone: &str,
        request: &CreateClusterRequest,
    ) -> Result<OperationHandle, CloudError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_statuses() {
        assert_eq!(ProviderStatus::parse("RUNNING"), ProviderStatus::Running);
        assert_eq!(ProviderStatus::parse("DEGRADED"), ProviderStatus::Degraded);
        assert_eq!(ProviderStatus::parse(""), ProviderStatus::Unspecified);
        assert_eq!(
            ProviderStatus::parse("STATUS_UNSPECIFIED"),
            ProviderStatus::Unspecified
        );
    }

    #[test]
    fn unknown_status_round_trips_its_text() {
        let status = ProviderStatus::parse("SUSPENDED");
        assert_eq!(status, ProviderStatus::Other("SUSPENDED".to_string()));
        assert_eq!(status.to_string(), "SUSPENDED");
    }

    #[test]
    fn only_not_found_variant_is_not_found() {
        let not_found = CloudError::NotFound {
            zone: "us-central1-a".to_string(),
            name: "demo".to_string(),
        };
        assert!(not_found.is_not_found());

        // A message shaped like the classic "googleapi: Error 404" text is
        // still an API error unless the client classified it as not-found.
        let api = CloudError::Api {
            status: 500,
            message: "googleapi: Error 404: backend unavailable".to_string(),
        };
        assert!(!api.is_not_found());
    }
}
