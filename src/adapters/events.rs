//! Kubernetes Event publishing for GkeCluster resources
//!
//! Events are fire-and-forget: a failed publish is logged and never fails
//! the reconciliation that produced it.

use async_trait::async_trait;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource};
use tracing::warn;

use crate::crd::GkeCluster;

/// Reporting component shown on published Events
pub const REPORTER: &str = "gke-cluster-operator";

/// Event severity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Normal,
    Warning,
}

/// Well-known event reasons
pub mod reasons {
    pub const CLUSTER_CREATION: &str = "ClusterCreation";
    pub const CLUSTER_PROVISIONING: &str = "ClusterProvisioning";
    pub const CLUSTER_RUNNING: &str = "ClusterRunning";
    pub const CLUSTER_NOT_RUNNING: &str = "ClusterNotRunning";
    pub const CLUSTER_DETECTION: &str = "ClusterDetection";
}

/// A notification about a GkeCluster
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterEvent {
    pub kind: EventKind,
    pub reason: &'static str,
    pub message: String,
}

impl ClusterEvent {
    pub fn normal(reason: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Normal,
            reason,
            message: message.into(),
        }
    }

    pub fn warning(reason: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Warning,
            reason,
            message: message.into(),
        }
    }
}

/// Notification sink
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, cluster: &GkeCluster, event: ClusterEvent);
}

/// [`EventSink`] publishing Kubernetes Events through `Recorder`
pub struct KubeEventSink {
    client: Client,
    reporter: Reporter,
}

impl KubeEventSink {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            reporter: Reporter {
                controller: REPORTER.to_string(),
                instance: std::env::var("POD_NAME").ok(),
            },
        }
    }
}

#[async_trait]
impl EventSink for KubeEventSink {
    async fn emit(&self, cluster: &GkeCluster, event: ClusterEvent) {
        let recorder = Recorder::new(
            self.client.clone(),
            self.reporter.clone(),
            cluster.object_ref(&()),
        );
        let type_ = match event.kind {
            EventKind::Normal => EventType::Normal,
            EventKind::Warning => EventType::Warning,
        };
        let result = recorder
            .publish(Event {
                type_,
                reason: event.reason.to_string(),
                note: Some(event.message),
                action: "Reconcile".to_string(),
                secondary: None,
            })
            .await;
        if let Err(e) = result {
            warn!(reason = event.reason, error = %e, "Failed to publish Kubernetes event");
        }
    }
}
