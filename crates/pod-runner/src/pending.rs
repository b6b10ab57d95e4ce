//! Waiting for a pod to leave the `Pending` phase.

use api_types::Pod;
use api_types::PodExt;
use api_types::PodPhase;
use error_stack::Report;
use futures::Stream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;

use crate::client::KubeClient;
use crate::error::KubeError;
use crate::error::KubeResult;
use crate::watch::require_resource_version;
use crate::watch::WatchResult;

impl KubeClient {
    /// Block until the pod's phase is anything but `Pending`.
    ///
    /// The watch is opened under a child of `cancel` that is cancelled on
    /// every return path, so the watch task and its connection never outlive
    /// this call. There is no timeout here; bound the wait by cancelling
    /// `cancel`.
    ///
    /// # Errors
    ///
    /// - [`KubeError::Configuration`] if `resource_version` is empty
    /// - [`KubeError::Cancelled`] if `cancel` fires first
    /// - [`KubeError::Transport`] if the server ends the watch before the pod
    ///   left pending
    /// - any error published by the watch stream, unchanged
    pub async fn await_pod_not_pending(
        &self,
        cancel: &CancellationToken,
        pod_name: &str,
        resource_version: &str,
    ) -> KubeResult<Pod> {
        require_resource_version(pod_name, resource_version)?;

        let scope = cancel.child_token();
        let _guard = scope.clone().drop_guard();

        let events = self.watch_pod(&scope, pod_name, resource_version)?;
        first_not_pending(events, &scope, pod_name).await
    }
}

/// Consume `events` until one reports a non-pending pod.
pub(crate) async fn first_not_pending<S>(
    mut events: S,
    scope: &CancellationToken,
    pod_name: &str,
) -> KubeResult<Pod>
where
    S: Stream<Item = WatchResult> + Unpin,
{
    while let Some(event) = events.next().await {
        let event = event?;
        if event.pod.phase() == PodPhase::Pending {
            trace!(pod = %pod_name, event_type = ?event.event_type, "pod still pending");
            continue;
        }
        debug!(pod = %pod_name, phase = %event.pod.phase(), "pod left pending state");
        return Ok(event.pod);
    }

    if scope.is_cancelled() {
        return Err(Report::new(KubeError::Cancelled));
    }
    Err(Report::new(KubeError::transport(format!(
        "watch for pod {pod_name:?} ended before it left pending state"
    ))))
}
