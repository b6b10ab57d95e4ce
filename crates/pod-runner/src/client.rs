//! Kubernetes client facade.
//!
//! [`KubeClient`] owns the validated configuration and the resource client.
//! The lifecycle operations (`watch_pod`, `await_pod_not_pending`,
//! `run_pod`) live next to their machinery in [`crate::watch`],
//! [`crate::pending`] and [`crate::runner`]; the calls here are plain
//! request/response pass-throughs.

use api_types::List;
use api_types::Node;
use api_types::Pod;
use api_types::PodStatus;
use error_stack::ResultExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::KubeError;
use crate::error::KubeResult;
use crate::resource::cancellable;
use crate::resource::ResourceClient;

/// A minimal client for the Kubernetes API server, scoped to one namespace.
#[derive(Debug, Clone)]
pub struct KubeClient {
    pub(crate) config: ClientConfig,
    pub(crate) resources: ResourceClient,
}

impl KubeClient {
    /// Create a client with a default `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// - [`KubeError::Configuration`] if the server url is malformed or the
    ///   HTTP client cannot be built
    pub fn new(config: ClientConfig) -> KubeResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .change_context(KubeError::configuration("failed to create HTTP client"))?;
        Self::with_http_client(config, http)
    }

    /// Create a client on top of an already authorized `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// - [`KubeError::Configuration`] if the server url is malformed
    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> KubeResult<Self> {
        let resources = ResourceClient::new(&config, http)?;
        info!(server_url = %config.server_url, namespace = %config.namespace, "Kubernetes client created");
        Ok(Self { config, resources })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn pods_path(&self) -> String {
        format!("/namespaces/{}/pods", self.config.namespace)
    }

    pub(crate) fn pod_path(&self, pod_name: &str) -> String {
        format!("{}/{pod_name}", self.pods_path())
    }

    pub(crate) fn watch_pod_path(&self, pod_name: &str) -> String {
        format!("/watch/namespaces/{}/pods/{pod_name}", self.config.namespace)
    }

    /// Fetch a pod by name.
    pub async fn get_pod(&self, cancel: &CancellationToken, pod_name: &str) -> KubeResult<Pod> {
        cancellable(cancel, self.resources.get(&self.pod_path(pod_name))).await
    }

    /// Point-in-time status of a pod; empty if the server has not reported one yet.
    pub async fn pod_status(
        &self,
        cancel: &CancellationToken,
        pod_name: &str,
    ) -> KubeResult<PodStatus> {
        Ok(self.get_pod(cancel, pod_name).await?.status.unwrap_or_default())
    }

    /// All pods in the namespace, regardless of phase.
    pub async fn list_pods(&self, cancel: &CancellationToken) -> KubeResult<Vec<Pod>> {
        let list: List<Pod> = cancellable(cancel, self.resources.list(&self.pods_path())).await?;
        Ok(list.items)
    }

    /// Delete a pod.
    pub async fn delete_pod(&self, cancel: &CancellationToken, pod_name: &str) -> KubeResult<()> {
        cancellable(cancel, self.resources.delete(&self.pod_path(pod_name))).await
    }

    /// Log of the pod's first container.
    // TODO: take a container name once pods with sidecars are run through here.
    pub async fn pod_log(&self, cancel: &CancellationToken, pod_name: &str) -> KubeResult<String> {
        let path = format!("{}/log", self.pod_path(pod_name));
        cancellable(cancel, self.resources.get_text(&path)).await
    }

    /// Nodes that make up the cluster.
    pub async fn list_nodes(&self, cancel: &CancellationToken) -> KubeResult<Vec<Node>> {
        let list: List<Node> = cancellable(cancel, self.resources.list("/nodes")).await?;
        Ok(list.items)
    }
}
