// Copyright (c) 2025 - Cowboy AI, Inc.
//! Node Specification
//!
//! One entry of the cluster node table: a logical guest with its role and
//! sizing. Entries are immutable once built and parameterize every later
//! provisioning step for that node.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::{Hostname, HostnameError};

/// Node specification error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("Node name is empty")]
    EmptyName,

    #[error("Node {node}: {field} must be a positive integer")]
    ZeroSizing { node: String, field: &'static str },

    #[error("Node {node}: invalid hostname: {source}")]
    InvalidHostname {
        node: String,
        #[source]
        source: HostnameError,
    },
}

/// Role of a node in the cluster topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Control-plane node
    Control,
    /// Worker node
    Worker,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Control => f.write_str("control"),
            NodeRole::Worker => f.write_str("worker"),
        }
    }
}

/// A single entry of the node table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNodeSpec")]
pub struct NodeSpec {
    name: String,
    hostname: Hostname,
    role: NodeRole,
    cpu_cores: u32,
    memory_mib: u32,
    disk_size_gib: u32,
    pin_mac: bool,
}

impl NodeSpec {
    /// Build a node whose guest hostname equals its name
    pub fn new(
        name: impl Into<String>,
        role: NodeRole,
        cpu_cores: u32,
        memory_mib: u32,
        disk_size_gib: u32,
    ) -> Result<Self, NodeError> {
        let name = name.into();
        let hostname = Hostname::new(&name).map_err(|source| NodeError::InvalidHostname {
            node: name.clone(),
            source,
        })?;
        Self::build(name, hostname, role, cpu_cores, memory_mib, disk_size_gib, true)
    }

    /// Shorthand for a control-plane node
    pub fn control(
        name: impl Into<String>,
        cpu_cores: u32,
        memory_mib: u32,
        disk_size_gib: u32,
    ) -> Result<Self, NodeError> {
        Self::new(name, NodeRole::Control, cpu_cores, memory_mib, disk_size_gib)
    }

    /// Shorthand for a worker node
    pub fn worker(
        name: impl Into<String>,
        cpu_cores: u32,
        memory_mib: u32,
        disk_size_gib: u32,
    ) -> Result<Self, NodeError> {
        Self::new(name, NodeRole::Worker, cpu_cores, memory_mib, disk_size_gib)
    }

    /// Use a guest hostname that differs from the node name
    pub fn with_hostname(mut self, hostname: Hostname) -> Self {
        self.hostname = hostname;
        self
    }

    /// Leave the network device without a pinned MAC
    pub fn without_pinned_mac(mut self) -> Self {
        self.pin_mac = false;
        self
    }

    fn build(
        name: String,
        hostname: Hostname,
        role: NodeRole,
        cpu_cores: u32,
        memory_mib: u32,
        disk_size_gib: u32,
        pin_mac: bool,
    ) -> Result<Self, NodeError> {
        if name.trim().is_empty() {
            return Err(NodeError::EmptyName);
        }
        for (field, value) in [
            ("cpu_cores", cpu_cores),
            ("memory_mib", memory_mib),
            ("disk_size_gib", disk_size_gib),
        ] {
            if value == 0 {
                return Err(NodeError::ZeroSizing { node: name, field });
            }
        }

        Ok(Self {
            name,
            hostname,
            role,
            cpu_cores,
            memory_mib,
            disk_size_gib,
            pin_mac,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hostname(&self) -> &Hostname {
        &self.hostname
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn cpu_cores(&self) -> u32 {
        self.cpu_cores
    }

    pub fn memory_mib(&self) -> u32 {
        self.memory_mib
    }

    pub fn disk_size_gib(&self) -> u32 {
        self.disk_size_gib
    }

    /// Whether the node's network device gets a pinned MAC
    pub fn pins_mac(&self) -> bool {
        self.pin_mac
    }

    /// Snippet file name for this node's cloud-init document
    pub fn cloud_init_file_name(&self) -> String {
        format!("{}.yml", self.hostname.short_name())
    }

    /// Logical resource name of this node's cloud-init artifact
    ///
    /// Derived only from the hostname, so repeated runs target the same
    /// artifact.
    pub fn cloud_init_resource_name(&self) -> String {
        format!("{}-cloud-init", self.hostname.short_name())
    }
}

/// Wire form of [`NodeSpec`]; `hostname` defaults to `name`
#[derive(Debug, Deserialize)]
struct RawNodeSpec {
    name: String,
    #[serde(default)]
    hostname: Option<String>,
    role: NodeRole,
    cpu_cores: u32,
    memory_mib: u32,
    disk_size_gib: u32,
    #[serde(default = "default_pin_mac")]
    pin_mac: bool,
}

fn default_pin_mac() -> bool {
    true
}

impl TryFrom<RawNodeSpec> for NodeSpec {
    type Error = NodeError;

    fn try_from(raw: RawNodeSpec) -> Result<Self, Self::Error> {
        let hostname_source = raw.hostname.as_deref().unwrap_or(&raw.name);
        let hostname =
            Hostname::new(hostname_source).map_err(|source| NodeError::InvalidHostname {
                node: raw.name.clone(),
                source,
            })?;
        Self::build(
            raw.name,
            hostname,
            raw.role,
            raw.cpu_cores,
            raw.memory_mib,
            raw.disk_size_gib,
            raw.pin_mac,
        )
    }
}
