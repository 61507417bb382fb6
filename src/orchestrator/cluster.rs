// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cluster Provisioning
//!
//! Control-plane / worker VMs booted from one shared cloud image, each with
//! its own cloud-init snippet.

use chrono::Utc;
use tracing::{debug, info};

use super::{collect_exports, declare, ProvisioningOutcome};
use crate::cloud_init::{CloudInitTemplate, Substitutions};
use crate::config::{ClusterConfig, SessionConfig};
use crate::domain::{MacAddress, NodeSpec};
use crate::engine::{ReconciliationEngine, SessionHandle};
use crate::errors::{Phase, ProvisioningError, ProvisioningResult};
use crate::plan::{
    DownloadFileSpec, NetworkDevice, ProvisioningPlan, ResourceRef, ResourceSpec,
    SnippetFileSpec, VirtualMachineSpec, VmDisk, VmInitialization, VmMemory,
};

/// Builds and resolves the plan for a [`ClusterConfig`]
pub struct Orchestrator<E> {
    config: ClusterConfig,
    engine: E,
}

impl<E: ReconciliationEngine> Orchestrator<E> {
    pub fn new(config: ClusterConfig, engine: E) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Run one provisioning pass over the node table
    pub async fn provision(&self, session: &SessionConfig) -> ProvisioningResult<ProvisioningOutcome> {
        self.config.validate()?;

        let template = CloudInitTemplate::load(&self.config.template_path)?;
        let handle = self.engine.connect(session).await?;
        info!(
            cluster = %self.config.name,
            endpoint = %handle.endpoint,
            nodes = self.config.nodes.len(),
            "Building provisioning plan"
        );

        let mut plan = ProvisioningPlan::new();
        let image = self.declare_image(&handle, &mut plan).await?;

        let mut compute = Vec::with_capacity(self.config.nodes.len());
        for node in &self.config.nodes {
            let vm = self
                .provision_node(&handle, &mut plan, &template, &image, node)
                .await?;
            compute.push((node.name().to_string(), vm));
        }

        plan.validate()?;
        info!(resources = plan.len(), "Plan complete, resolving");

        let realized = self.engine.resolve(&handle, &plan).await?;
        let exports = collect_exports(compute, &realized)?;

        for export in exports.values() {
            info!(
                node = %export.node_name,
                id = %export.resource_id,
                addresses = ?export.ipv4_addresses,
                "Node provisioned"
            );
        }

        Ok(ProvisioningOutcome {
            plan,
            exports,
            completed_at: Utc::now(),
        })
    }

    /// Shared cloud image, declared exactly once per run
    async fn declare_image(
        &self,
        handle: &SessionHandle,
        plan: &mut ProvisioningPlan,
    ) -> ProvisioningResult<ResourceRef> {
        let image = &self.config.image;
        info!(url = %image.url, datastore = %image.datastore_id, "Declaring cloud image");

        declare(
            &self.engine,
            handle,
            plan,
            image.logical_name.as_str(),
            ResourceSpec::DownloadFile(DownloadFileSpec {
                content_type: image.content_type,
                datastore_id: image.datastore_id.clone(),
                node_name: self.config.hypervisor_node.clone(),
                url: image.url.clone(),
            }),
            vec![],
        )
        .await
    }

    /// Identity, cloud-init, snippet and VM for one node
    async fn provision_node(
        &self,
        handle: &SessionHandle,
        plan: &mut ProvisioningPlan,
        template: &CloudInitTemplate,
        image: &ResourceRef,
        node: &NodeSpec,
    ) -> ProvisioningResult<ResourceRef> {
        let fail = |phase: Phase| move |e: ProvisioningError| e.for_node(node.name(), phase);

        let mac = self.assign_mac(node).map_err(fail(Phase::Identity))?;
        debug!(
            node = node.name(),
            hostname = %node.hostname(),
            mac = ?mac.map(|m| m.to_string()),
            role = %node.role(),
            "Assigned node identity"
        );

        let document = template
            .render(
                &Substitutions::for_node(node.hostname(), mac.as_ref()),
                self.config.placeholder_policy,
            )
            .map_err(|e| ProvisioningError::from(e).for_node(node.name(), Phase::CloudInit))?;

        let snippet = declare(
            &self.engine,
            handle,
            plan,
            node.cloud_init_resource_name(),
            ResourceSpec::SnippetFile(SnippetFileSpec {
                node_name: self.config.hypervisor_node.clone(),
                datastore_id: self.config.snippets_datastore.clone(),
                content_type: SnippetFileSpec::CONTENT_TYPE.to_string(),
                file_mode: SnippetFileSpec::DEFAULT_FILE_MODE.to_string(),
                overwrite: true,
                raw_content: document.into_content(),
                file_name: node.cloud_init_file_name(),
            }),
            vec![],
        )
        .await
        .map_err(fail(Phase::Artifact))?;

        let vm = declare(
            &self.engine,
            handle,
            plan,
            node.name(),
            ResourceSpec::VirtualMachine(self.vm_spec(node, mac, image, &snippet)),
            vec![image.clone(), snippet.clone()],
        )
        .await
        .map_err(fail(Phase::Compute))?;

        info!(node = node.name(), snippet = %snippet, "Declared node");
        Ok(vm)
    }

    fn assign_mac(&self, node: &NodeSpec) -> ProvisioningResult<Option<MacAddress>> {
        if !node.pins_mac() {
            return Ok(None);
        }
        let seed = format!("{}/{}", self.config.name, node.name());
        Ok(Some(self.config.mac_strategy.assign(&seed)?))
    }

    fn vm_spec(
        &self,
        node: &NodeSpec,
        mac: Option<MacAddress>,
        image: &ResourceRef,
        snippet: &ResourceRef,
    ) -> VirtualMachineSpec {
        VirtualMachineSpec {
            node_name: self.config.hypervisor_node.clone(),
            display_name: node.name().to_string(),
            cpu_cores: node.cpu_cores(),
            memory: VmMemory {
                dedicated_mib: Some(node.memory_mib()),
                floating_mib: node.memory_mib(),
            },
            disks: vec![VmDisk {
                size_gib: node.disk_size_gib(),
                interface: "scsi0".to_string(),
                iothread: true,
                file_format: "raw".to_string(),
                source_file: image.clone(),
            }],
            boot_order: vec!["scsi0".to_string(), "net0".to_string()],
            scsi_hardware: Some("virtio-scsi-single".to_string()),
            network_devices: vec![NetworkDevice {
                model: "virtio".to_string(),
                bridge: self.config.bridge.clone(),
                mac_address: mac,
            }],
            os_type: "l26".to_string(),
            on_boot: true,
            agent_enabled: true,
            initialization: VmInitialization {
                datastore_id: Some(self.config.vm_datastore.clone()),
                user_data_file: Some(snippet.clone()),
                user_account: None,
            },
        }
    }
}
