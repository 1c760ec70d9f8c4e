//! GkeCluster reconciler
//!
//! Drives a GkeCluster toward the cluster hosted on GKE:
//! - creates the cluster when GKE has none with that zone and name
//! - polls a freshly created cluster until GKE reports a terminal status
//! - records every observed phase on the resource status
//! - requeues already existing clusters for periodic re-checks

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::adapters::events::reasons;
use crate::adapters::{ClusterEvent, ClusterStore, EventSink, ResourceId};
use crate::cloud::{
    CloudClient, CreateClusterRequest, ExternalCluster, OperationHandle, ProviderStatus,
};
use crate::crd::{ClusterPhase, GkeCluster, GkeClusterStatus};
use crate::error::{Error, Result};
use crate::metrics;

/// Interval between status checks while a new cluster provisions
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Re-check interval for clusters found already existing
pub const RESYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Phase a provider status settles the creation wait on, if any
///
/// `RUNNING` ends the wait successfully; `ERROR`, `DEGRADED` and an
/// unspecified status end it as an error. Anything else keeps polling.
pub fn terminal_phase(status: &ProviderStatus) -> Option<ClusterPhase> {
    match status {
        ProviderStatus::Running => Some(ClusterPhase::Running),
        ProviderStatus::Error | ProviderStatus::Degraded | ProviderStatus::Unspecified => {
            Some(ClusterPhase::Error)
        }
        _ => None,
    }
}

/// Reconciles GkeCluster resources against GKE
pub struct Reconciler {
    store: Arc<dyn ClusterStore>,
    cloud: Arc<dyn CloudClient>,
    events: Arc<dyn EventSink>,
    poll_interval: Duration,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ClusterStore>,
        cloud: Arc<dyn CloudClient>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            cloud,
            events,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the interval between status checks while provisioning
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Reconcile one GkeCluster
    ///
    /// Returns the delay after which the resource should be reconciled
    /// again, or `None` when only a change to the resource should trigger
    /// the next pass. Cancelling `cancel` while waiting for a new cluster
    /// aborts with [`Error::Cancelled`] and leaves the last written status.
    #[instrument(skip(self, id, cancel), fields(resource = %id))]
    pub async fn reconcile(
        &self,
        id: &ResourceId,
        cancel: &CancellationToken,
    ) -> Result<Option<Duration>> {
        let cluster = match self.store.get(id).await {
            Ok(Some(cluster)) => cluster,
            Ok(None) => {
                info!("GkeCluster not found, nothing to reconcile");
                return Ok(None);
            }
            Err(e) => {
                error!(error = %e, "Failed to read GkeCluster");
                return Err(e);
            }
        };

        let spec = &cluster.spec;
        match self.cloud.get_cluster(&spec.zone, &spec.cluster_name).await {
            Ok(external) => self.synchronize(id, &cluster, external).await,
            Err(e) if e.is_not_found() => self.create(id, &cluster, cancel).await,
            Err(e) => {
                error!(
                    error = %e,
                    zone = %spec.zone,
                    cluster = %spec.cluster_name,
                    "Failed to get GKE cluster"
                );
                Err(e.into())
            }
        }
    }

    /// Existing cluster: record it as running and schedule the next check
    async fn synchronize(
        &self,
        id: &ResourceId,
        cluster: &GkeCluster,
        external: ExternalCluster,
    ) -> Result<Option<Duration>> {
        // The provider's status is recorded but does not drive the phase here.
        let status = GkeClusterStatus::observed(ClusterPhase::Running, "GKE cluster found")
            .with_provider_status(external.status.to_string())
            .with_generation(cluster.metadata.generation);
        self.transition(
            id,
            cluster,
            status,
            ClusterEvent::normal(reasons::CLUSTER_DETECTION, "GKE cluster found"),
        )
        .await?;

        info!(
            cluster = %external.name,
            zone = %external.zone,
            provider_status = %external.status,
            node_count = external.node_count,
            "GKE cluster found, synchronized"
        );
        Ok(Some(RESYNC_INTERVAL))
    }

    /// Missing cluster: create it and wait for a terminal status
    async fn create(
        &self,
        id: &ResourceId,
        cluster: &GkeCluster,
        cancel: &CancellationToken,
    ) -> Result<Option<Duration>> {
        let spec = &cluster.spec;
        let request = CreateClusterRequest {
            name: spec.cluster_name.clone(),
            initial_node_count: spec.initial_node_count,
        };
        info!(
            cluster = %request.name,
            zone = %spec.zone,
            "GKE cluster not found, creating cluster"
        );

        let operation = match self.cloud.create_cluster(&spec.zone, &request).await {
            Ok(operation) => operation,
            Err(e) => {
                error!(error = %e, cluster = %request.name, "Error creating GKE cluster");
                metrics::CLUSTER_CREATIONS.with_label_values(&["error"]).inc();
                return Err(e.into());
            }
        };
        info!(operation = %operation, "GKE cluster creation started");
        metrics::CLUSTER_CREATIONS.with_label_values(&["started"]).inc();

        let status = self.creation_status(
            cluster,
            &operation,
            ClusterPhase::Provisioning,
            "GKE cluster creating",
        );
        self.transition(
            id,
            cluster,
            status,
            ClusterEvent::normal(reasons::CLUSTER_CREATION, "GKE cluster creating"),
        )
        .await?;

        self.wait_for_cluster(id, cluster, &operation, cancel).await
    }

    async fn wait_for_cluster(
        &self,
        id: &ResourceId,
        cluster: &GkeCluster,
        operation: &OperationHandle,
        cancel: &CancellationToken,
    ) -> Result<Option<Duration>> {
        let spec = &cluster.spec;
        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(operation = %operation, "Cancelled while waiting for GKE cluster");
                    return Err(Error::Cancelled(id.to_string()));
                }
                _ = ticker.tick() => {}
            }

            metrics::PROVISIONING_POLLS.inc();
            // A hung provider call must not outlive cancellation
            let lookup = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(operation = %operation, "Cancelled while querying GKE cluster");
                    return Err(Error::Cancelled(id.to_string()));
                }
                lookup = self.cloud.get_cluster(&spec.zone, &spec.cluster_name) => lookup,
            };
            let external = match lookup {
                Ok(external) => external,
                Err(e) => {
                    error!(
                        error = %e,
                        cluster = %spec.cluster_name,
                        "Error verifying GKE cluster status"
                    );
                    return Err(e.into());
                }
            };
            let provider_status = external.status.to_string();

            match terminal_phase(&external.status) {
                Some(ClusterPhase::Running) => {
                    let status = self
                        .creation_status(
                            cluster,
                            operation,
                            ClusterPhase::Running,
                            "GKE cluster running",
                        )
                        .with_provider_status(provider_status);
                    self.transition(
                        id,
                        cluster,
                        status,
                        ClusterEvent::normal(reasons::CLUSTER_RUNNING, "GKE cluster running"),
                    )
                    .await?;
                    metrics::CLUSTER_CREATIONS.with_label_values(&["running"]).inc();
                    info!(cluster = %external.name, "GKE cluster running");
                    return Ok(None);
                }
                Some(phase) => {
                    let message =
                        format!("GKE cluster status is not running: {}", provider_status);
                    let status = self
                        .creation_status(cluster, operation, phase, message.clone())
                        .with_provider_status(provider_status.clone());
                    self.transition(
                        id,
                        cluster,
                        status,
                        ClusterEvent::warning(reasons::CLUSTER_NOT_RUNNING, message),
                    )
                    .await?;
                    metrics::CLUSTER_CREATIONS.with_label_values(&["failed"]).inc();
                    warn!(
                        cluster = %external.name,
                        status = %provider_status,
                        "GKE cluster not running"
                    );
                    return Ok(None);
                }
                None => {
                    let status = self
                        .creation_status(
                            cluster,
                            operation,
                            ClusterPhase::Provisioning,
                            "GKE cluster provisioning",
                        )
                        .with_provider_status(provider_status);
                    self.transition(
                        id,
                        cluster,
                        status,
                        ClusterEvent::normal(
                            reasons::CLUSTER_PROVISIONING,
                            "GKE cluster provisioning",
                        ),
                    )
                    .await?;
                }
            }
        }
    }

    fn creation_status(
        &self,
        cluster: &GkeCluster,
        operation: &OperationHandle,
        phase: ClusterPhase,
        message: impl Into<String>,
    ) -> GkeClusterStatus {
        GkeClusterStatus::observed(phase, message)
            .with_operation(Some(operation.to_string()))
            .with_generation(cluster.metadata.generation)
    }

    /// Emit the event for a transition, then write the status it produced
    async fn transition(
        &self,
        id: &ResourceId,
        cluster: &GkeCluster,
        status: GkeClusterStatus,
        event: ClusterEvent,
    ) -> Result<()> {
        self.events.emit(cluster, event).await;

        if let Err(e) = self.store.persist_status(id, &status).await {
            error!(error = %e, phase = %status.phase, "Error updating GkeCluster status");
            return Err(e);
        }
        let phase = status.phase.to_string();
        metrics::PHASE_TRANSITIONS
            .with_label_values(&[phase.as_str()])
            .inc();
        Ok(())
    }
}
