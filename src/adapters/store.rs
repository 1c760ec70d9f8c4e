//! GkeCluster resource store backed by the Kubernetes API

use std::fmt;

use async_trait::async_trait;
use kube::{
    api::{Patch, PatchParams},
    Api, Client, ResourceExt,
};
use serde_json::json;

use crate::crd::{GkeCluster, GkeClusterStatus};
use crate::error::Result;

/// Field manager used for status patches
pub const FIELD_MANAGER: &str = "gke-cluster-operator";

/// Namespaced name of a GkeCluster
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId {
    pub namespace: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identify an existing object, defaulting the namespace like the controllers do
    pub fn of(cluster: &GkeCluster) -> Self {
        Self::new(
            cluster.namespace().unwrap_or_else(|| "default".to_string()),
            cluster.name_any(),
        )
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Desired-state storage for GkeCluster resources
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Read the resource, `None` if it no longer exists
    async fn get(&self, id: &ResourceId) -> Result<Option<GkeCluster>>;

    /// Replace the resource's status
    async fn persist_status(&self, id: &ResourceId, status: &GkeClusterStatus) -> Result<()>;
}

/// [`ClusterStore`] over the Kubernetes API server
pub struct KubeClusterStore {
    client: Client,
}

impl KubeClusterStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<GkeCluster> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterStore for KubeClusterStore {
    async fn get(&self, id: &ResourceId) -> Result<Option<GkeCluster>> {
        Ok(self.api(&id.namespace).get_opt(&id.name).await?)
    }

    async fn persist_status(&self, id: &ResourceId, status: &GkeClusterStatus) -> Result<()> {
        let patch = json!({ "status": status });
        self.api(&id.namespace)
            .patch_status(&id.name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::GkeClusterSpec;

    #[test]
    fn resource_id_defaults_namespace() {
        let cluster = GkeCluster::new(
            "demo",
            GkeClusterSpec {
                zone: "us-central1-a".to_string(),
                cluster_name: "demo".to_string(),
                initial_node_count: 3,
            },
        );
        let id = ResourceId::of(&cluster);
        assert_eq!(id, ResourceId::new("default", "demo"));
        assert_eq!(id.to_string(), "default/demo");
    }
}
