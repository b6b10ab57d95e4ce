use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use pod_runner::ClientConfig;

#[derive(Parser)]
#[command(about, long_about, version)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Log filter overriding RUST_LOG, e.g. `pod_runner=debug`
    #[arg(long, global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct ConnectionArgs {
    /// API server url, without path
    #[arg(long, global = true, env = "POD_RUNNER_SERVER", default_value = "http://127.0.0.1:8001")]
    pub server: String,

    /// Namespace to operate in
    #[arg(long, global = true, env = "POD_RUNNER_NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Seconds to wait for a created pod to leave pending
    #[arg(long, global = true, default_value_t = 120)]
    pub run_timeout: u64,

    /// Seconds allowed for each non-streaming request
    #[arg(long, global = true, default_value_t = 30)]
    pub request_timeout: u64,
}

impl ConnectionArgs {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.server)
            .with_namespace(&self.namespace)
            .with_run_timeout(std::time::Duration::from_secs(self.run_timeout))
            .with_request_timeout(std::time::Duration::from_secs(self.request_timeout))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a pod from a JSON or YAML manifest and wait until it is no longer pending
    Run {
        manifest: PathBuf,
    },
    /// Print a pod's status as JSON
    Status {
        pod: String,
    },
    /// Delete a pod
    Delete {
        pod: String,
    },
    /// List pods and their phases
    List,
    /// Print the log of a pod's first container
    Logs {
        pod: String,
    },
    /// List cluster nodes
    Nodes,
}
