// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Plan Dry Run
//!
//! Builds the provisioning plan for a cluster (or the single-container or
//! single-VM variant), realizes it against the in-memory engine and prints the
//! exported identifiers as JSON.
//!
//! Run with: cargo run --bin provision-plan
//!
//! Environment:
//! - `PROXMOX_USERNAME` / `PROXMOX_PASSWORD` (required, `.env` is read)
//! - `PROXMOX_ENDPOINT`, `PROXMOX_INSECURE` (optional)
//! - `CLUSTER_CONFIG` - YAML cluster description; defaults to the built-in
//!   control + worker table rendering `cloud-init/cloud-init.yml`
//! - `PROVISION_WORKLOAD=container` - provision the LXC container instead
//!   (needs `CONTAINER_PASSWORD`)
//! - `PROVISION_WORKLOAD=vm` - provision one VM straight from the cloud image

use anyhow::{Context, Result};
use proxmox_provisioning::{
    ClusterConfig, ContainerConfig, ContainerOrchestrator, InMemoryEngine, Orchestrator,
    ProvisioningOutcome, SessionConfig, SingleVmConfig, SingleVmOrchestrator,
};
use tracing::info;

const DEFAULT_TEMPLATE: &str = "cloud-init/cloud-init.yml";

/// Which workload the run provisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Workload {
    Cluster,
    Container,
    Vm,
}

impl Workload {
    fn from_env() -> Result<Self> {
        match std::env::var("PROVISION_WORKLOAD").ok().as_deref() {
            None | Some("") | Some("cluster") => Ok(Workload::Cluster),
            Some("container") => Ok(Workload::Container),
            Some("vm") => Ok(Workload::Vm),
            Some(other) => anyhow::bail!(
                "PROVISION_WORKLOAD must be 'cluster', 'container' or 'vm', got '{}'",
                other
            ),
        }
    }
}

fn cluster_config() -> Result<ClusterConfig> {
    match std::env::var("CLUSTER_CONFIG") {
        Ok(path) if !path.trim().is_empty() => ClusterConfig::from_yaml_file(&path)
            .with_context(|| format!("Failed to load cluster config from {}", path)),
        _ => ClusterConfig::kubernetes(DEFAULT_TEMPLATE)
            .context("Failed to build default cluster config"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let session = SessionConfig::from_env().context("Failed to load hypervisor credentials")?;
    let workload = Workload::from_env()?;
    info!(endpoint = %session.endpoint, ?workload, "Starting dry run");

    let outcome: ProvisioningOutcome = match workload {
        Workload::Cluster => {
            let config = cluster_config()?;
            info!(
                cluster = %config.name,
                nodes = config.nodes.len(),
                template = %config.template_path.display(),
                "Cluster configuration loaded"
            );
            Orchestrator::new(config, InMemoryEngine::new())
                .provision(&session)
                .await?
        }
        Workload::Container => {
            ContainerOrchestrator::new(ContainerConfig::default(), InMemoryEngine::new())
                .provision(&session)
                .await?
        }
        Workload::Vm => {
            SingleVmOrchestrator::new(SingleVmConfig::default(), InMemoryEngine::new())
                .provision(&session)
                .await?
        }
    };

    info!(
        resources = outcome.plan.len(),
        completed_at = %outcome.completed_at,
        "Dry run complete"
    );
    println!("{}", serde_json::to_string_pretty(&outcome.exports)?);
    Ok(())
}
