// Copyright (c) 2025 - Cowboy AI, Inc.
//! Single LXC container from a downloaded template

use chrono::Utc;
use tracing::info;

use super::{collect_exports, declare, ProvisioningOutcome};
use crate::config::{ContainerConfig, SessionConfig};
use crate::engine::ReconciliationEngine;
use crate::errors::{Phase, ProvisioningResult};
use crate::plan::{
    ContainerDisk, ContainerInterface, ContainerMemory, ContainerSpec, DownloadFileSpec,
    ProvisioningPlan, ResourceSpec,
};

pub struct ContainerOrchestrator<E> {
    config: ContainerConfig,
    engine: E,
}

impl<E: ReconciliationEngine> ContainerOrchestrator<E> {
    pub fn new(config: ContainerConfig, engine: E) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub async fn provision(&self, session: &SessionConfig) -> ProvisioningResult<ProvisioningOutcome> {
        let config = &self.config;
        config.validate()?;
        let root_password = session.require_container_password()?.clone();

        let handle = self.engine.connect(session).await?;
        info!(container = %config.name, endpoint = %handle.endpoint, "Building container plan");

        let mut plan = ProvisioningPlan::new();
        let template = declare(
            &self.engine,
            &handle,
            &mut plan,
            config.template.logical_name.as_str(),
            ResourceSpec::DownloadFile(DownloadFileSpec {
                content_type: config.template.content_type,
                datastore_id: config.template.datastore_id.clone(),
                node_name: config.hypervisor_node.clone(),
                url: config.template.url.clone(),
            }),
            vec![],
        )
        .await?;

        let spec = ContainerSpec {
            node_name: config.hypervisor_node.clone(),
            vm_id: config.vm_id,
            template_file: template.clone(),
            os_type: config.os_type.clone(),
            cpu_cores: config.cpu_cores,
            memory: ContainerMemory {
                dedicated_mib: config.memory_mib,
                swap_mib: config.swap_mib,
            },
            disk: ContainerDisk {
                datastore_id: config.disk_datastore.clone(),
                size_gib: config.disk_size_gib,
            },
            network_interfaces: vec![ContainerInterface {
                name: config.interface_name.clone(),
                bridge: config.bridge.clone(),
                enabled: true,
            }],
            root_password,
            started: config.started,
        };

        let container = declare(
            &self.engine,
            &handle,
            &mut plan,
            config.name.as_str(),
            ResourceSpec::Container(spec),
            vec![template],
        )
        .await
        .map_err(|e| e.for_node(&config.name, Phase::Compute))?;

        plan.validate()?;

        let realized = self.engine.resolve(&handle, &plan).await?;
        let exports = collect_exports(vec![(config.name.clone(), container)], &realized)?;
        info!(container = %config.name, vm_id = ?config.vm_id, "Container provisioned");

        Ok(ProvisioningOutcome {
            plan,
            exports,
            completed_at: Utc::now(),
        })
    }
}
