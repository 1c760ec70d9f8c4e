//! Custom Resource Definitions for the GKE Cluster Operator

mod gke_cluster;

pub use gke_cluster::*;

use kube::CustomResourceExt;

/// Generate all CRD YAML manifests
pub fn generate_crds() -> Result<Vec<String>, serde_yaml::Error> {
    Ok(vec![serde_yaml::to_string(&GkeCluster::crd())?])
}
