mod cli;

use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use api_types::Pod;
use api_types::PodExt;
use clap::Parser;
use pod_runner::KubeClient;
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::cli::Commands;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();
    match &cli.log {
        Some(directive) => {
            utils::logging::try_init_with(directive);
        }
        None => utils::logging::init(),
    }

    let client = KubeClient::new(cli.connection.client_config()).map_err(report)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    run_command(&client, &cancel, cli.command).await
}

async fn run_command(
    client: &KubeClient,
    cancel: &CancellationToken,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Run { manifest } => {
            let pod = read_manifest(&manifest)?;
            let pod = client.run_pod(cancel, &pod).await.map_err(report)?;
            println!("{}\t{}", pod.name(), pod.phase());
        }
        Commands::Status { pod } => {
            let status = client.pod_status(cancel, &pod).await.map_err(report)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Delete { pod } => {
            client.delete_pod(cancel, &pod).await.map_err(report)?;
            tracing::info!(pod = %pod, "pod deleted");
        }
        Commands::List => {
            for pod in client.list_pods(cancel).await.map_err(report)? {
                println!("{}\t{}", pod.name(), pod.phase());
            }
        }
        Commands::Logs { pod } => {
            print!("{}", client.pod_log(cancel, &pod).await.map_err(report)?);
        }
        Commands::Nodes => {
            for node in client.list_nodes(cancel).await.map_err(report)? {
                println!("{}", node.metadata.name.unwrap_or_default());
            }
        }
    }
    Ok(())
}

/// error-stack reports carry their whole chain in the debug output.
fn report(report: error_stack::Report<pod_runner::KubeError>) -> anyhow::Error {
    anyhow::anyhow!("{report:?}")
}

/// Read a pod manifest; `.json` files are parsed as JSON, anything else as YAML.
fn read_manifest(path: &Path) -> Result<Pod> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read manifest {}", path.display()))?;

    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&raw).with_context(|| format!("parse {} as JSON", path.display()))
    } else {
        serde_yaml::from_str(&raw).with_context(|| format!("parse {} as YAML", path.display()))
    }
}
