// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Memory Reconciliation Engine
//!
//! Dry-run engine: records declarations, realizes a plan in dependency
//! order and hands out provider-shaped identifiers without contacting a
//! hypervisor. Rejections and guest-agent addresses can be scripted.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::Ipv4Addr;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{
    EngineError, EngineResult, PendingResource, RealizedResource, ReconciliationEngine,
    SessionHandle,
};
use crate::config::SessionConfig;
use crate::plan::{DeclaredResource, ProvisioningPlan, ResourceRef, ResourceSpec};

/// First identifier handed to compute resources without a pinned id
pub const FIRST_VM_ID: u32 = 100;

#[derive(Debug, Default)]
struct EngineState {
    sessions: HashSet<Uuid>,
    declared: Vec<DeclaredResource>,
    names: HashSet<ResourceRef>,
}

/// Fake engine for dry runs and tests
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    state: Mutex<EngineState>,
    rejections: HashMap<ResourceRef, String>,
    addresses: HashMap<ResourceRef, Vec<Ipv4Addr>>,
    refuse_connection: Option<String>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the declaration of `resource` with `message`
    pub fn reject(mut self, resource: impl Into<ResourceRef>, message: impl Into<String>) -> Self {
        self.rejections.insert(resource.into(), message.into());
        self
    }

    /// Report `addresses` for `resource` as if its guest agent did
    pub fn with_addresses(
        mut self,
        resource: impl Into<ResourceRef>,
        addresses: Vec<Ipv4Addr>,
    ) -> Self {
        self.addresses.insert(resource.into(), addresses);
        self
    }

    /// Fail every `connect` call
    pub fn refuse_connections(mut self, message: impl Into<String>) -> Self {
        self.refuse_connection = Some(message.into());
        self
    }

    /// Everything declared so far, in declaration order
    pub async fn declarations(&self) -> Vec<DeclaredResource> {
        self.state.lock().await.declared.clone()
    }

    fn identifier(spec: &ResourceSpec, next_vm_id: &mut u32) -> String {
        match spec {
            ResourceSpec::DownloadFile(file) => format!(
                "{}:{}/{}",
                file.datastore_id,
                file.content_type,
                file.file_name()
            ),
            ResourceSpec::SnippetFile(file) => {
                format!("{}:{}/{}", file.datastore_id, file.content_type, file.file_name)
            }
            ResourceSpec::VirtualMachine(_) => {
                let id = *next_vm_id;
                *next_vm_id += 1;
                id.to_string()
            }
            ResourceSpec::Container(ct) => match ct.vm_id {
                Some(id) => id.to_string(),
                None => {
                    let id = *next_vm_id;
                    *next_vm_id += 1;
                    id.to_string()
                }
            },
        }
    }
}

#[async_trait]
impl ReconciliationEngine for InMemoryEngine {
    async fn connect(&self, session: &SessionConfig) -> EngineResult<SessionHandle> {
        if let Some(message) = &self.refuse_connection {
            return Err(EngineError::Connection(message.clone()));
        }
        let handle = SessionHandle::new(session);
        self.state.lock().await.sessions.insert(handle.id);
        debug!(endpoint = %handle.endpoint, session = %handle.id, "Opened session");
        Ok(handle)
    }

    async fn declare(
        &self,
        session: &SessionHandle,
        resource: &DeclaredResource,
    ) -> EngineResult<PendingResource> {
        let mut state = self.state.lock().await;

        if !state.sessions.contains(&session.id) {
            return Err(EngineError::Connection(format!(
                "unknown session {}",
                session.id
            )));
        }
        if let Some(message) = self.rejections.get(&resource.name) {
            return Err(EngineError::Rejected {
                resource: resource.name.clone(),
                message: message.clone(),
            });
        }
        if !state.names.insert(resource.name.clone()) {
            return Err(EngineError::Rejected {
                resource: resource.name.clone(),
                message: "a resource with this name is already declared".to_string(),
            });
        }

        state.declared.push(resource.clone());
        debug!(resource = %resource.name, kind = ?resource.kind(), "Recorded declaration");

        Ok(PendingResource {
            name: resource.name.clone(),
            session: session.id,
        })
    }

    async fn resolve(
        &self,
        session: &SessionHandle,
        plan: &ProvisioningPlan,
    ) -> EngineResult<BTreeMap<ResourceRef, RealizedResource>> {
        let state = self.state.lock().await;

        if !state.sessions.contains(&session.id) {
            return Err(EngineError::Connection(format!(
                "unknown session {}",
                session.id
            )));
        }

        let order = plan
            .topological_order()
            .map_err(|e| EngineError::Unresolved(e.to_string()))?;

        let mut next_vm_id = FIRST_VM_ID;
        let mut realized: BTreeMap<ResourceRef, RealizedResource> = BTreeMap::new();

        for resource in order {
            if !state.names.contains(&resource.name) {
                return Err(EngineError::Unresolved(format!(
                    "{} is in the plan but was never declared",
                    resource.name
                )));
            }
            if let Some(missing) = resource
                .depends_on
                .iter()
                .find(|dep| !realized.contains_key(*dep))
            {
                return Err(EngineError::Unresolved(format!(
                    "{} would be created before its dependency {}",
                    resource.name, missing
                )));
            }

            let ipv4_addresses = if resource.spec.is_compute() {
                self.addresses.get(&resource.name).cloned()
            } else {
                None
            };

            realized.insert(
                resource.name.clone(),
                RealizedResource {
                    id: Self::identifier(&resource.spec, &mut next_vm_id),
                    ipv4_addresses,
                    realized_at: Utc::now(),
                },
            );
        }

        Ok(realized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Password;
    use crate::plan::{ContentType, DownloadFileSpec, SnippetFileSpec};

    fn session() -> SessionConfig {
        SessionConfig {
            endpoint: "https://pve.test:8006/".to_string(),
            username: "root@pam".to_string(),
            password: Password::new("pw"),
            insecure: true,
            container_password: None,
        }
    }

    fn plan_with_image_and_snippet() -> ProvisioningPlan {
        let mut plan = ProvisioningPlan::new();
        let image = plan
            .declare(
                "image",
                ResourceSpec::DownloadFile(DownloadFileSpec {
                    content_type: ContentType::Iso,
                    datastore_id: "local".into(),
                    node_name: "pve".into(),
                    url: "https://example.com/images/base.img".into(),
                }),
                vec![],
            )
            .unwrap();
        plan.declare(
            "ctrl-cloud-init",
            ResourceSpec::SnippetFile(SnippetFileSpec {
                node_name: "pve".into(),
                datastore_id: "local".into(),
                content_type: SnippetFileSpec::CONTENT_TYPE.into(),
                file_mode: SnippetFileSpec::DEFAULT_FILE_MODE.into(),
                overwrite: true,
                raw_content: "#cloud-config\n".into(),
                file_name: "ctrl.yml".into(),
            }),
            vec![image],
        )
        .unwrap();
        plan
    }

    #[test]
    fn test_declare_and_resolve() {
        tokio_test::block_on(async {
            let engine = InMemoryEngine::new();
            let handle = engine.connect(&session()).await.unwrap();
            let plan = plan_with_image_and_snippet();

            for resource in plan.resources() {
                engine.declare(&handle, resource).await.unwrap();
            }
            let realized = engine.resolve(&handle, &plan).await.unwrap();

            assert_eq!(realized[&ResourceRef::new("image")].id, "local:iso/base.img");
            assert_eq!(
                realized[&ResourceRef::new("ctrl-cloud-init")].id,
                "local:snippets/ctrl.yml"
            );
            assert_eq!(engine.declarations().await.len(), 2);
        });
    }

    #[test]
    fn test_duplicate_declaration_is_rejected() {
        tokio_test::block_on(async {
            let engine = InMemoryEngine::new();
            let handle = engine.connect(&session()).await.unwrap();
            let plan = plan_with_image_and_snippet();
            let image = &plan.resources()[0];

            engine.declare(&handle, image).await.unwrap();
            assert!(matches!(
                engine.declare(&handle, image).await,
                Err(EngineError::Rejected { .. })
            ));
        });
    }

    #[test]
    fn test_scripted_rejection() {
        tokio_test::block_on(async {
            let engine = InMemoryEngine::new().reject("image", "datastore full");
            let handle = engine.connect(&session()).await.unwrap();
            let plan = plan_with_image_and_snippet();

            let err = engine.declare(&handle, &plan.resources()[0]).await.unwrap_err();
            assert_eq!(
                err,
                EngineError::Rejected {
                    resource: "image".into(),
                    message: "datastore full".to_string()
                }
            );
        });
    }

    #[test]
    fn test_unknown_session_and_undeclared_resources() {
        tokio_test::block_on(async {
            let engine = InMemoryEngine::new();
            let stranger = SessionHandle::new(&session());
            let plan = plan_with_image_and_snippet();
            assert!(matches!(
                engine.declare(&stranger, &plan.resources()[0]).await,
                Err(EngineError::Connection(_))
            ));

            let handle = engine.connect(&session()).await.unwrap();
            assert!(matches!(
                engine.resolve(&handle, &plan).await,
                Err(EngineError::Unresolved(_))
            ));
        });
    }

    #[test]
    fn test_refused_connection() {
        tokio_test::block_on(async {
            let engine = InMemoryEngine::new().refuse_connections("401 Unauthorized");
            assert_eq!(
                engine.connect(&session()).await.unwrap_err(),
                EngineError::Connection("401 Unauthorized".to_string())
            );
        });
    }
}
