// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Provisioning Plan Shape
//!
//! Whatever the node table, a run declares one image, one snippet per node
//! and one VM per node, and every VM depends on artifacts only.

use proptest::prelude::*;
use std::collections::HashSet;

use crate::fixtures::{session, template_dir, TEMPLATE};
use proxmox_provisioning::{
    ClusterConfig, InMemoryEngine, NodeRole, NodeSpec, Orchestrator, ResourceKind, ResourceRef,
};

// ============================================================================
// Strategies
// ============================================================================

/// Node tables with unique names and sizing in realistic ranges
fn node_table() -> impl Strategy<Value = Vec<NodeSpec>> {
    prop::collection::vec((1u32..16, 512u32..65536, 8u32..500, any::<bool>()), 1..8).prop_map(
        |rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (cores, mem, disk, control))| {
                    let role = if control { NodeRole::Control } else { NodeRole::Worker };
                    NodeSpec::new(format!("node{}", i), role, cores, mem, disk).unwrap()
                })
                .collect()
        },
    )
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: N nodes give N VMs, N snippets and exactly one image
    #[test]
    fn prop_resource_counts(nodes in node_table()) {
        let (_dir, path) = template_dir(TEMPLATE);
        let n = nodes.len();
        let orchestrator = Orchestrator::new(ClusterConfig::new(path, nodes), InMemoryEngine::new());

        let outcome = tokio_test::block_on(orchestrator.provision(&session())).unwrap();

        prop_assert_eq!(outcome.plan.count_of(ResourceKind::Compute), n);
        prop_assert_eq!(outcome.plan.count_of(ResourceKind::CloudInitArtifact), n);
        prop_assert_eq!(outcome.plan.count_of(ResourceKind::DiskImage), 1);
        prop_assert_eq!(outcome.exports.len(), n);
    }

    /// Property: VMs depend on the shared image and their own snippet, never on a VM
    #[test]
    fn prop_dependency_ordering(nodes in node_table()) {
        let (_dir, path) = template_dir(TEMPLATE);
        let orchestrator = Orchestrator::new(ClusterConfig::new(path, nodes), InMemoryEngine::new());

        let outcome = tokio_test::block_on(orchestrator.provision(&session())).unwrap();
        let plan = &outcome.plan;
        let image = ResourceRef::new("download-image");

        for vm in plan.of_kind(ResourceKind::Compute) {
            let snippet = ResourceRef::new(format!("{}-cloud-init", vm.name));
            prop_assert!(vm.depends_on.contains(&image));
            prop_assert!(vm.depends_on.contains(&snippet));
            for dep in &vm.depends_on {
                prop_assert_ne!(plan.get(dep).unwrap().kind(), ResourceKind::Compute);
            }
        }

        let order: Vec<&ResourceRef> = plan
            .topological_order()
            .unwrap()
            .into_iter()
            .map(|r| &r.name)
            .collect();
        prop_assert_eq!(order[0], &image);
    }

    /// Property: Derived MACs are unique across the table and stable across runs
    #[test]
    fn prop_derived_macs_unique_and_stable(nodes in node_table()) {
        let (_dir, path) = template_dir(TEMPLATE);
        let config = ClusterConfig::new(path, nodes);

        let macs = |config: ClusterConfig| {
            let outcome = tokio_test::block_on(
                Orchestrator::new(config, InMemoryEngine::new()).provision(&session()),
            )
            .unwrap();
            outcome
                .plan
                .of_kind(ResourceKind::Compute)
                .map(|r| match &r.spec {
                    proxmox_provisioning::ResourceSpec::VirtualMachine(vm) => {
                        vm.network_devices[0].mac_address.unwrap()
                    }
                    _ => unreachable!(),
                })
                .collect::<Vec<_>>()
        };

        let first = macs(config.clone());
        let second = macs(config);

        prop_assert_eq!(first.iter().collect::<HashSet<_>>().len(), first.len());
        prop_assert_eq!(first, second);
    }
}
