//! GkeCluster controller
//!
//! Watches GkeCluster resources and triggers reconciliation.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::{
    api::ListParams,
    runtime::{
        controller::{Action, Controller},
        watcher::Config as WatcherConfig,
    },
    Api, Client, ResourceExt,
};
use tracing::{error, info, instrument, warn};

use crate::adapters::ResourceId;
use crate::controllers::Context;
use crate::crd::GkeCluster;
use crate::error::{Error, Result};
use crate::metrics;

const KIND: &str = "GkeCluster";

/// Run the GkeCluster controller
pub async fn run(client: Client, context: Arc<Context>) {
    let api: Api<GkeCluster> = Api::all(client);

    // Verify CRD is installed
    if let Err(e) = api.list(&ListParams::default().limit(1)).await {
        error!("GkeCluster CRD not installed: {}", e);
        return;
    }

    info!("Starting GkeCluster controller");

    // Stop watching on cancellation and let running reconciles finish
    let shutdown = context.shutdown.clone().cancelled_owned();

    Controller::new(api, WatcherConfig::default())
        .graceful_shutdown_on(shutdown)
        .run(reconcile, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((obj, action)) => {
                    info!(
                        name = %obj.name,
                        namespace = obj.namespace.as_deref().unwrap_or("default"),
                        action = ?action,
                        "Reconciled GkeCluster"
                    );
                }
                Err(e) => {
                    error!(error = %e, "Reconciliation error");
                    metrics::RECONCILIATION_ERRORS.with_label_values(&[KIND]).inc();
                }
            }
        })
        .await;
}

/// Main reconciliation function
#[instrument(skip(obj, ctx), fields(name = %obj.name_any(), namespace = obj.namespace()))]
async fn reconcile(obj: Arc<GkeCluster>, ctx: Arc<Context>) -> Result<Action> {
    let _timer = metrics::RECONCILE_DURATION
        .with_label_values(&[KIND])
        .start_timer();
    metrics::RECONCILIATIONS.with_label_values(&[KIND]).inc();

    // The watched object only names the resource; the reconciler re-reads it.
    let id = ResourceId::of(&obj);
    let requeue = ctx.reconciler.reconcile(&id, &ctx.shutdown).await?;

    Ok(to_action(requeue))
}

/// Translate the reconciler's scheduling directive
pub fn to_action(requeue: Option<Duration>) -> Action {
    match requeue {
        Some(after) => Action::requeue(after),
        None => Action::await_change(),
    }
}

/// Requeue delay after a failed pass
pub fn retry_after(error: &Error) -> Duration {
    match error {
        Error::Cancelled(_) => Duration::from_secs(5),
        Error::Kube(_) | Error::Cloud(_) => Duration::from_secs(30),
        Error::Config(_) => Duration::from_secs(300),
    }
}

/// Error policy for the controller
fn error_policy(obj: Arc<GkeCluster>, error: &Error, _ctx: Arc<Context>) -> Action {
    let name = obj.name_any();
    if error.is_cancelled() {
        warn!(name = %name, "Reconciliation cancelled, resource will be picked up again");
    } else {
        error!(
            name = %name,
            error = %error,
            "Reconciliation failed, scheduling retry"
        );
    }

    Action::requeue(retry_after(error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::CloudError;

    #[test]
    fn retry_delay_depends_on_error_kind() {
        let cloud = Error::Cloud(CloudError::Api {
            status: 503,
            message: "unavailable".to_string(),
        });
        assert_eq!(retry_after(&cloud), Duration::from_secs(30));
        assert_eq!(
            retry_after(&Error::Cancelled("default/demo".to_string())),
            Duration::from_secs(5)
        );
        assert_eq!(retry_after(&Error::config("bad")), Duration::from_secs(300));
    }

    #[test]
    fn directive_maps_to_action() {
        assert_eq!(
            to_action(Some(Duration::from_secs(60))),
            Action::requeue(Duration::from_secs(60))
        );
        assert_eq!(to_action(None), Action::await_change());
    }
}
