// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reconciliation Engine Abstraction
//!
//! The declarative engine that diffs desired against actual state, talks to
//! the hypervisor provider and reports identifiers back is external. This
//! module defines the narrow interface the orchestrator drives it through.
//!
//! # Flow
//!
//! ```text
//! connect(session) ──> SessionHandle
//!        │
//!        ▼
//! declare(handle, resource) ──> PendingResource    (once per resource)
//!        │
//!        ▼
//! resolve(handle, plan) ──> ResourceRef → RealizedResource
//! ```
//!
//! Retries against the hypervisor belong to the engine; the orchestrator
//! never retries a failed call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use thiserror::Error;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::plan::{DeclaredResource, ProvisioningPlan, ResourceRef};

pub mod memory;

pub use memory::InMemoryEngine;

/// Errors surfaced by the engine or the provider behind it
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Could not open a session against the hypervisor
    #[error("Engine connection error: {0}")]
    Connection(String),

    /// The engine or provider refused a declaration
    #[error("Declaration of {resource} rejected: {message}")]
    Rejected { resource: ResourceRef, message: String },

    /// The plan could not be realized
    #[error("Failed to resolve plan: {0}")]
    Unresolved(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Scope of one hypervisor connection; every declaration carries it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle {
    pub id: Uuid,
    pub endpoint: String,
    pub username: String,
}

impl SessionHandle {
    pub fn new(session: &SessionConfig) -> Self {
        Self {
            id: Uuid::now_v7(),
            endpoint: session.endpoint.clone(),
            username: session.username.clone(),
        }
    }
}

/// Accepted declaration whose identifier is not known yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingResource {
    pub name: ResourceRef,
    pub session: Uuid,
}

/// Resource as created by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealizedResource {
    /// Identifier assigned by the provider
    pub id: String,
    /// Addresses reported by the guest agent, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_addresses: Option<Vec<Ipv4Addr>>,
    pub realized_at: DateTime<Utc>,
}

/// External reconciliation engine
#[async_trait]
pub trait ReconciliationEngine: Send + Sync {
    /// Open a session scoping all following declarations
    async fn connect(&self, session: &SessionConfig) -> EngineResult<SessionHandle>;

    /// Register desired state for one resource
    ///
    /// Dependencies are listed on the resource itself; the engine must not
    /// realize it before them.
    async fn declare(
        &self,
        session: &SessionHandle,
        resource: &DeclaredResource,
    ) -> EngineResult<PendingResource>;

    /// Apply the plan and report what each declared resource became
    async fn resolve(
        &self,
        session: &SessionHandle,
        plan: &ProvisioningPlan,
    ) -> EngineResult<BTreeMap<ResourceRef, RealizedResource>>;
}
