//! Proxmox VE provisioning
//!
//! Builds a dependency-ordered provisioning plan for a small cluster: one
//! shared cloud image, one rendered cloud-init snippet per node and one VM
//! per node, then hands the plan to a reconciliation engine and reports
//! the identifiers it assigned.

pub mod cloud_init;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod orchestrator;
pub mod plan;

// Re-export commonly used types
pub use cloud_init::{CloudInitDocument, CloudInitTemplate, PlaceholderPolicy, Substitutions};
pub use config::{
    ClusterConfig, ContainerConfig, ImageSource, Password, SessionConfig, SingleVmConfig,
};
pub use domain::{Hostname, MacAddress, MacStrategy, NodeRole, NodeSpec};
pub use engine::{InMemoryEngine, ReconciliationEngine, SessionHandle};
pub use errors::{Phase, ProvisioningError, ProvisioningResult};
pub use orchestrator::{
    ContainerOrchestrator, ExportedResult, Orchestrator, ProvisioningOutcome, SingleVmOrchestrator,
};
pub use plan::{ProvisioningPlan, ResourceKind, ResourceRef, ResourceSpec};
