//! client config

use std::time::Duration;

/// Base path of the core/v1 API.
pub const API_ENDPOINT: &str = "/api/v1";

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Ceiling for [`crate::KubeClient::run_pod`] to see a pod leave the pending phase.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(2 * 60);

/// Kubernetes client config.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API server url (`scheme://host[:port]`, no path)
    pub server_url: String,
    /// namespace pods are created in and looked up from
    pub namespace: String,
    /// timeout for each non-streaming request
    pub request_timeout: Duration,
    /// how long `run_pod` waits for a pod to leave pending
    pub run_timeout: Duration,
}

impl ClientConfig {
    /// create new client config with default parameters.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            request_timeout: Duration::from_secs(30),
            run_timeout: DEFAULT_RUN_TIMEOUT,
        }
    }

    /// set namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// set request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// set run timeout.
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }
}
