// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Plan
//!
//! Resource declarations and the depends-on graph between them.
//!
//! ```text
//! DownloadFile (shared image, once)
//!      ▲               ▲
//!      │               │
//!  VM ctrl ──> Snippet ctrl-cloud-init
//!  VM w1   ──> Snippet w1-cloud-init
//! ```
//!
//! Compute resources depend on artifacts only, never on each other.

pub mod graph;
pub mod resources;

pub use graph::{DeclaredResource, PlanError, ProvisioningPlan};
pub use resources::{
    ContainerDisk, ContainerInterface, ContainerMemory, ContainerSpec, ContentType,
    DownloadFileSpec, NetworkDevice, ResourceKind, ResourceRef, ResourceSpec, SnippetFileSpec,
    UserAccount, VirtualMachineSpec, VmDisk, VmInitialization, VmMemory,
};
