// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Orchestrators
//!
//! Build a [`ProvisioningPlan`] through a [`ReconciliationEngine`], ask the
//! engine to realize it, and read back one [`ExportedResult`] per compute
//! resource.
//!
//! # Transaction Semantics
//!
//! A run is sequential plan construction:
//! 1. Connect a session
//! 2. Declare shared artifacts once
//! 3. Declare per-node artifacts and compute resources
//! 4. Validate the plan
//! 5. Resolve and export
//!
//! The first failure aborts the run. Resources already declared for
//! earlier nodes stay declared; rolling them back is the engine's call.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use crate::engine::{ReconciliationEngine, RealizedResource, SessionHandle};
use crate::errors::{Phase, ProvisioningError, ProvisioningResult};
use crate::plan::{ProvisioningPlan, ResourceRef, ResourceSpec};

pub mod cluster;
pub mod container;
pub mod single_vm;

pub use cluster::Orchestrator;
pub use container::ContainerOrchestrator;
pub use single_vm::SingleVmOrchestrator;

/// Identifier (and addresses) of one provisioned node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedResult {
    pub node_name: String,
    pub resource_id: String,
    /// Populated only when the guest agent reported addresses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_addresses: Option<Vec<Ipv4Addr>>,
}

/// Result of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct ProvisioningOutcome {
    pub plan: ProvisioningPlan,
    /// Keyed by logical node name
    pub exports: BTreeMap<String, ExportedResult>,
    pub completed_at: DateTime<Utc>,
}

/// Check a declaration against the plan, hand it to the engine, then
/// record it. The plan only ever holds declarations the engine accepted.
pub(crate) async fn declare<E: ReconciliationEngine + ?Sized>(
    engine: &E,
    session: &SessionHandle,
    plan: &mut ProvisioningPlan,
    name: impl Into<ResourceRef>,
    spec: ResourceSpec,
    depends_on: Vec<ResourceRef>,
) -> ProvisioningResult<ResourceRef> {
    let resource = plan.check(name.into(), spec, depends_on)?;
    engine.declare(session, &resource).await?;
    Ok(plan.insert(resource)?)
}

/// Match realized resources back to the nodes that declared them
pub(crate) fn collect_exports(
    compute: Vec<(String, ResourceRef)>,
    realized: &BTreeMap<ResourceRef, RealizedResource>,
) -> ProvisioningResult<BTreeMap<String, ExportedResult>> {
    let mut exports = BTreeMap::new();

    for (node_name, resource) in compute {
        let entry = match realized.get(&resource) {
            Some(r) if !r.id.is_empty() => r,
            _ => {
                return Err(ProvisioningError::ResourceDeclaration(format!(
                    "engine reported no identifier for {}",
                    resource
                ))
                .for_node(node_name, Phase::Export))
            }
        };

        exports.insert(
            node_name.clone(),
            ExportedResult {
                node_name,
                resource_id: entry.id.clone(),
                ipv4_addresses: entry.ipv4_addresses.clone(),
            },
        );
    }

    Ok(exports)
}
