//! Create a pod and wait for it to start, cleaning up if it never does.

use std::time::Duration;

use api_types::Pod;
use api_types::PodExt;
use error_stack::ResultExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::client::KubeClient;
use crate::error::KubeError;
use crate::error::KubeResult;
use crate::resource::cancellable;

impl KubeClient {
    /// Create `pod` in the configured namespace and return it once it has
    /// left the `Pending` phase.
    ///
    /// The wait is bounded by [`crate::ClientConfig::run_timeout`] (2 minutes
    /// by default) and by `cancel`. If the pod was created but does not leave
    /// pending in time, it is deleted before the error is returned. That
    /// delete runs under its own scope, independent of `cancel`, and its
    /// failure is only logged.
    ///
    /// # Errors
    ///
    /// - any error of the create call, unchanged; nothing is cleaned up
    /// - [`KubeError::PodNotReady`] once the pod was created, with the
    ///   original failure ([`KubeError::Cancelled`] on timeout) beneath it
    #[tracing::instrument(skip_all, fields(pod = pod.name()))]
    pub async fn run_pod(&self, cancel: &CancellationToken, pod: &Pod) -> KubeResult<Pod> {
        let created: Pod = cancellable(cancel, self.resources.create(&self.pods_path(), pod)).await?;
        let pod_name = created.name().to_string();
        info!(pod_name = %pod_name, resource_version = created.resource_version(), "pod created");

        let scope = cancel.child_token();
        let _guard = scope.clone().drop_guard();
        cancel_after(scope.clone(), self.config.run_timeout);

        match self
            .await_pod_not_pending(&scope, &pod_name, created.resource_version())
            .await
        {
            Ok(ready) => {
                info!(pod_name = %pod_name, phase = %ready.phase(), "pod is no longer pending");
                Ok(ready)
            }
            Err(report) => {
                warn!(
                    pod_name = %pod_name,
                    error = %report.current_context(),
                    "pod did not leave pending state, deleting it"
                );
                self.delete_abandoned_pod(&pod_name).await;
                Err(report.change_context(KubeError::PodNotReady { pod_name }))
            }
        }
    }

    /// Best-effort delete of a pod that never became ready.
    async fn delete_abandoned_pod(&self, pod_name: &str) {
        if pod_name.is_empty() {
            warn!("created pod has no name, nothing to delete");
            return;
        }

        // Never the caller's scope: it may be the one that just expired.
        let fresh = CancellationToken::new();
        match self.delete_pod(&fresh, pod_name).await {
            Ok(()) => debug!(pod_name = %pod_name, "abandoned pod deleted"),
            Err(report) => {
                let report = report.change_context(KubeError::CompensationFailed {
                    pod_name: pod_name.to_string(),
                });
                error!("{report:?}");
            }
        }
    }
}

/// Cancel `scope` once `after` has elapsed, unless it is cancelled first.
fn cancel_after(scope: CancellationToken, after: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            () = scope.cancelled() => {}
            () = tokio::time::sleep(after) => {
                debug!(timeout = ?after, "deadline exceeded");
                scope.cancel();
            }
        }
    });
}
