//! Minimal Kubernetes client for running pods.
//!
//! The interesting part is [`KubeClient::run_pod`]: it creates a pod, watches
//! it until it leaves the `Pending` phase under a bounded deadline, and deletes
//! it again if that never happens. The remaining operations are plain
//! request/response calls against the core/v1 API.
//!
//! # Examples
//!
//! ```no_run
//! # use api_types::PodExt;
//! # use pod_runner::{ClientConfig, KubeClient};
//! # use tokio_util::sync::CancellationToken;
//! # async fn example(pod: api_types::Pod) -> pod_runner::KubeResult<()> {
//! let client = KubeClient::new(ClientConfig::new("http://127.0.0.1:8001"))?;
//! let running = client.run_pod(&CancellationToken::new(), &pod).await?;
//! println!("{} is {}", running.name(), running.phase());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod pending;
pub mod resource;
pub mod runner;
pub mod watch;

pub use client::KubeClient;
pub use config::ClientConfig;
pub use error::find_error;
pub use error::KubeError;
pub use error::KubeResult;
pub use resource::ResourceClient;
pub use watch::decode_watch_line;
pub use watch::PodStatusEvent;
pub use watch::WatchEventType;
pub use watch::PodWatch;
pub use watch::WatchResult;
