//! Error types for the pod runner.

use error_stack::Report;
use thiserror::Error;

/// Result type for pod runner operations.
pub type KubeResult<T> = Result<T, Report<KubeError>>;

/// Errors that can occur while talking to the Kubernetes API.
///
/// Used as the context of an [`error_stack::Report`]; the underlying cause
/// (reqwest, serde, io) is kept as a lower frame of the report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KubeError {
    /// Malformed server address or a missing required value. No I/O was done.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Request body could not be serialized
    #[error("failed to encode {what} as JSON")]
    Encoding { what: String },

    /// Connection or request failure
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Response body could not be read
    #[error("failed to read response body: {message}")]
    Read { message: String },

    /// Unexpected status code, with the raw response body for diagnostics
    #[error("http error {status}: {body:?}")]
    Api { status: u16, body: String },

    /// Malformed response body or stream record
    #[error("failed to decode {what}")]
    Decoding { what: String },

    /// The caller's scope was cancelled or its deadline expired
    #[error("operation cancelled")]
    Cancelled,

    /// A created pod did not leave the pending phase
    #[error("timed out waiting for pod {pod_name:?} to leave pending state")]
    PodNotReady { pod_name: String },

    /// Best-effort cleanup of a half-created pod failed
    #[error("failed to delete pod {pod_name:?} after it did not become ready")]
    CompensationFailed { pod_name: String },
}

impl KubeError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Find the first [`KubeError`] in a report's frames that matches `predicate`.
///
/// [`Report::current_context`] only yields the outermost context; this walks
/// the whole chain, which is how callers of [`crate::KubeClient::run_pod`]
/// recover the failure that triggered cleanup.
pub fn find_error<'a>(
    report: &'a Report<KubeError>,
    predicate: impl Fn(&KubeError) -> bool,
) -> Option<&'a KubeError> {
    report
        .frames()
        .filter_map(|frame| frame.downcast_ref::<KubeError>())
        .find(|err| predicate(*err))
}
