//! Shared API type definitions
//!
//! The Kubernetes object model comes from `k8s-openapi`; this crate pins the
//! API version the workspace builds against, re-exports the types the pod
//! runner touches and adds the accessors it needs on top of them.

use std::fmt;

pub use k8s_openapi::api::core::v1::Container;
pub use k8s_openapi::api::core::v1::EnvVar;
pub use k8s_openapi::api::core::v1::Node;
pub use k8s_openapi::api::core::v1::Pod;
pub use k8s_openapi::api::core::v1::PodSpec;
pub use k8s_openapi::api::core::v1::PodStatus;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ListMeta;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::WatchEvent;
pub use k8s_openapi::List;

/// Coarse lifecycle state of a pod.
///
/// The API server reports the phase as a free-form string; values not listed
/// here, or a missing status, map to [`PodPhase::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl PodPhase {
    pub fn parse(phase: Option<&str>) -> Self {
        match phase {
            Some("Pending") => Self::Pending,
            Some("Running") => Self::Running,
            Some("Succeeded") => Self::Succeeded,
            Some("Failed") => Self::Failed,
            _ => Self::Unknown,
        }
    }

    /// Wire spelling of the phase.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accessors for the pod fields the runner reads.
pub trait PodExt {
    /// Pod name, empty when unset.
    fn name(&self) -> &str;

    /// Resource version, empty when unset.
    fn resource_version(&self) -> &str;

    fn phase(&self) -> PodPhase;
}

impl PodExt for Pod {
    fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    fn resource_version(&self) -> &str {
        self.metadata.resource_version.as_deref().unwrap_or_default()
    }

    fn phase(&self) -> PodPhase {
        PodPhase::parse(
            self.status
                .as_ref()
                .and_then(|status| status.phase.as_deref()),
        )
    }
}
