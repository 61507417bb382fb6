// Copyright (c) 2025 - Cowboy AI, Inc.
//! Single VM booted from a downloaded cloud image
//!
//! No user-data snippet is rendered; the guest login comes from the
//! configured user account.

use chrono::Utc;
use tracing::info;

use super::{collect_exports, declare, ProvisioningOutcome};
use crate::config::{SessionConfig, SingleVmConfig};
use crate::engine::ReconciliationEngine;
use crate::errors::{Phase, ProvisioningResult};
use crate::plan::{
    DownloadFileSpec, NetworkDevice, ProvisioningPlan, ResourceRef, ResourceSpec,
    VirtualMachineSpec, VmDisk, VmInitialization, VmMemory,
};

pub struct SingleVmOrchestrator<E> {
    config: SingleVmConfig,
    engine: E,
}

impl<E: ReconciliationEngine> SingleVmOrchestrator<E> {
    pub fn new(config: SingleVmConfig, engine: E) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &SingleVmConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub async fn provision(&self, session: &SessionConfig) -> ProvisioningResult<ProvisioningOutcome> {
        let config = &self.config;
        config.validate()?;

        let handle = self.engine.connect(session).await?;
        info!(vm = %config.resource_name, endpoint = %handle.endpoint, "Building VM plan");

        let mut plan = ProvisioningPlan::new();
        let image = declare(
            &self.engine,
            &handle,
            &mut plan,
            config.image.logical_name.as_str(),
            ResourceSpec::DownloadFile(DownloadFileSpec {
                content_type: config.image.content_type,
                datastore_id: config.image.datastore_id.clone(),
                node_name: config.hypervisor_node.clone(),
                url: config.image.url.clone(),
            }),
            vec![],
        )
        .await?;

        let vm = declare(
            &self.engine,
            &handle,
            &mut plan,
            config.resource_name.as_str(),
            ResourceSpec::VirtualMachine(self.vm_spec(&image)),
            vec![image],
        )
        .await
        .map_err(|e| e.for_node(&config.resource_name, Phase::Compute))?;

        plan.validate()?;

        let realized = self.engine.resolve(&handle, &plan).await?;
        let exports = collect_exports(vec![(config.resource_name.clone(), vm)], &realized)?;
        if let Some(export) = exports.get(&config.resource_name) {
            info!(vm = %config.resource_name, id = %export.resource_id, "VM provisioned");
        }

        Ok(ProvisioningOutcome {
            plan,
            exports,
            completed_at: Utc::now(),
        })
    }

    fn vm_spec(&self, image: &ResourceRef) -> VirtualMachineSpec {
        let config = &self.config;
        VirtualMachineSpec {
            node_name: config.hypervisor_node.clone(),
            display_name: config.display_name.clone(),
            cpu_cores: config.cpu_cores,
            memory: VmMemory {
                dedicated_mib: None,
                floating_mib: config.floating_memory_mib,
            },
            disks: vec![VmDisk {
                size_gib: config.disk_size_gib,
                interface: config.disk_interface.clone(),
                iothread: false,
                file_format: "raw".to_string(),
                source_file: image.clone(),
            }],
            boot_order: vec![],
            scsi_hardware: None,
            network_devices: vec![NetworkDevice {
                model: "virtio".to_string(),
                bridge: config.bridge.clone(),
                mac_address: None,
            }],
            os_type: "l26".to_string(),
            on_boot: true,
            agent_enabled: false,
            initialization: VmInitialization {
                user_account: Some(config.user_account.clone()),
                ..VmInitialization::default()
            },
        }
    }
}
