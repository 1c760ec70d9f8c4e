//! Kubernetes controllers for the GKE Cluster Operator
//!
//! This module contains the controller that watches GkeCluster changes
//! and triggers reconciliation.

mod gke_cluster_controller;

pub use gke_cluster_controller::run as run_gke_cluster_controller;
pub use gke_cluster_controller::{retry_after, to_action};

use std::sync::Arc;
use std::time::Duration;

use kube::Client;
use tokio_util::sync::CancellationToken;

use crate::adapters::{KubeClusterStore, KubeEventSink};
use crate::cloud::CloudClient;
use crate::reconcilers::Reconciler;

/// Shared context for all controllers
pub struct Context {
    /// GkeCluster reconciler
    pub reconciler: Reconciler,
    /// Cancelled when the operator shuts down; aborts in-flight waits
    pub shutdown: CancellationToken,
}

impl Context {
    pub fn new(reconciler: Reconciler, shutdown: CancellationToken) -> Self {
        Self {
            reconciler,
            shutdown,
        }
    }

    /// Wire a reconciler backed by the Kubernetes API and `cloud`
    pub fn for_cluster(
        client: Client,
        cloud: Arc<dyn CloudClient>,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        let reconciler = Reconciler::new(
            Arc::new(KubeClusterStore::new(client.clone())),
            cloud,
            Arc::new(KubeEventSink::new(client)),
        )
        .with_poll_interval(poll_interval);
        Self::new(reconciler, shutdown)
    }
}
