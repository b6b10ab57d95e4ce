//! Streaming pod status updates from the watch API.
//!
//! A watch is one long-lived `GET` whose body is a sequence of
//! newline-delimited `{"type": ..., "object": ...}` records. One background
//! task owns the connection, decodes each record and hands it over a channel
//! with room for a single in-flight event. The task publishes at most one
//! terminal error, then drops its sender so the stream ends. `BOOKMARK`
//! records only advance the server's resource version and are not published.

use std::io;

use api_types::Pod;
use api_types::PodExt;
use api_types::Status;
use api_types::WatchEvent;
use error_stack::Report;
use error_stack::ResultExt;
use futures::TryStreamExt;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info_span;
use tracing::trace;
use tracing::Instrument;

use crate::client::KubeClient;
use crate::error::KubeError;
use crate::error::KubeResult;
use crate::resource::ResourceClient;

/// Kind of change a [`PodStatusEvent`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
}

/// One decoded watch record.
#[derive(Debug, Clone, PartialEq)]
pub struct PodStatusEvent {
    pub event_type: WatchEventType,
    pub pod: Pod,
}

/// Item of a [`PodWatch`]: an event, or the terminal error.
pub type WatchResult = KubeResult<PodStatusEvent>;

/// Event stream returned by [`KubeClient::watch_pod`].
///
/// Yields events in the order the server sent them; an `Err` item is always
/// the last one.
pub type PodWatch = ReceiverStream<WatchResult>;

impl KubeClient {
    /// Watch a single pod for status changes, starting after `resource_version`.
    ///
    /// The resource version is required so that the pod's entire history is
    /// not replayed when the watch starts. The watch runs until `cancel` is
    /// cancelled, the server ends the stream, or an error occurs; in the
    /// error and cancellation cases the error is the last item of the stream.
    ///
    /// # Errors
    ///
    /// - [`KubeError::Configuration`] if `resource_version` is empty. No
    ///   request is made in that case.
    pub fn watch_pod(
        &self,
        cancel: &CancellationToken,
        pod_name: &str,
        resource_version: &str,
    ) -> KubeResult<PodWatch> {
        require_resource_version(pod_name, resource_version)?;

        let (sender, receiver) = mpsc::channel(1);
        let span = info_span!("watch_pod", pod = %pod_name, resource_version = %resource_version);
        tokio::spawn(
            stream_events(
                self.resources.clone(),
                self.watch_pod_path(pod_name),
                resource_version.to_string(),
                cancel.clone(),
                sender,
            )
            .instrument(span),
        );

        Ok(ReceiverStream::new(receiver))
    }
}

pub(crate) fn require_resource_version(pod_name: &str, resource_version: &str) -> KubeResult<()> {
    if resource_version.is_empty() {
        return Err(Report::new(KubeError::configuration(format!(
            "resourceVersion for pod {pod_name:?} must be provided"
        ))));
    }
    Ok(())
}

async fn stream_events(
    resources: ResourceClient,
    path: String,
    resource_version: String,
    cancel: CancellationToken,
    sender: mpsc::Sender<WatchResult>,
) {
    let query = [("resourceVersion", resource_version.as_str())];
    let opened = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Report::new(KubeError::Cancelled)),
        response = resources.open_stream(&path, &query) => response,
    };

    let response = match opened {
        Ok(response) => response,
        Err(report) => {
            publish_terminal(&sender, Err(report)).await;
            return;
        }
    };

    let body = response.bytes_stream().map_err(io::Error::other);
    pump_events(StreamReader::new(Box::pin(body)), cancel, sender).await;
}

/// Read newline-delimited watch records from `reader` and publish them.
///
/// Owns `reader` for its whole life: it is dropped exactly once, either when
/// the stream ends or as soon as `cancel` fires, which for a network body
/// closes the connection and unblocks any outstanding read.
pub(crate) async fn pump_events<R>(
    reader: R,
    cancel: CancellationToken,
    sender: mpsc::Sender<WatchResult>,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    let terminal = loop {
        let line = tokio::select! {
            biased;
            () = cancel.cancelled() => break Some(cancelled()),
            line = lines.next_line() => line,
        };
        // A read can complete in the same instant the scope expires.
        if cancel.is_cancelled() {
            break Some(cancelled());
        }

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("watch stream ended by server");
                break None;
            }
            Err(err) => {
                break Some(Err(Report::new(err).change_context(KubeError::Read {
                    message: "error reading streaming response body".to_string(),
                })));
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let event = match decode_watch_line(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(report) => break Some(Err(report)),
        };
        trace!(event_type = ?event.event_type, phase = %event.pod.phase(), "watch event");

        tokio::select! {
            biased;
            sent = sender.send(Ok(event)) => {
                if sent.is_err() {
                    debug!("watch consumer went away");
                    return;
                }
            }
            () = cancel.cancelled() => break Some(cancelled()),
        }
    };

    drop(lines);

    if let Some(item) = terminal {
        publish_terminal(&sender, item).await;
    }
}

async fn publish_terminal(sender: &mpsc::Sender<WatchResult>, item: WatchResult) {
    if sender.send(item).await.is_err() {
        debug!("watch consumer went away before the terminal item");
    }
}

fn cancelled() -> WatchResult {
    Err(Report::new(KubeError::Cancelled))
}

/// Decode one watch record.
///
/// Returns `None` for a `BOOKMARK` record, which carries no pod. An `ERROR`
/// record carries an API `Status` instead of a pod and becomes a
/// [`KubeError::Api`] error.
pub fn decode_watch_line(line: &str) -> KubeResult<Option<PodStatusEvent>> {
    let event: WatchEvent<Pod> =
        serde_json::from_str(line).change_context_lazy(|| KubeError::Decoding {
            what: "watch pod status".to_string(),
        })?;

    let (event_type, pod) = match event {
        WatchEvent::Added(pod) => (WatchEventType::Added, pod),
        WatchEvent::Modified(pod) => (WatchEventType::Modified, pod),
        WatchEvent::Deleted(pod) => (WatchEventType::Deleted, pod),
        WatchEvent::Bookmark {
            resource_version, ..
        } => {
            trace!(resource_version = %resource_version, "watch bookmark");
            return Ok(None);
        }
        WatchEvent::ErrorStatus(status) => return Err(Report::new(api_error(status))),
        WatchEvent::ErrorOther(object) => {
            return Err(Report::new(KubeError::Decoding {
                what: "watch error status".to_string(),
            })
            .attach_printable(format!("{object:?}")));
        }
    };
    Ok(Some(PodStatusEvent { event_type, pod }))
}

fn api_error(status: Status) -> KubeError {
    KubeError::Api {
        status: status
            .code
            .and_then(|code| u16::try_from(code).ok())
            .unwrap_or_default(),
        body: status.message.unwrap_or_default(),
    }
}
