// Copyright (c) 2025 - Cowboy AI, Inc.
//! Declared Resource Specifications
//!
//! Arguments for each kind of resource the hypervisor provider accepts.
//! References to other resources are carried as [`ResourceRef`] so the
//! plan can check them against the explicit dependency list.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Password;
use crate::domain::MacAddress;

/// Logical name of a declared resource, unique within a plan
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceRef(String);

impl ResourceRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ResourceRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Datastore content type of a downloaded artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Disk / ISO image for virtual machines
    Iso,
    /// Container root filesystem template
    Vztmpl,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Iso => "iso",
            ContentType::Vztmpl => "vztmpl",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad role a resource plays in the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Shared base image or container template
    DiskImage,
    /// Per-node cloud-init snippet
    CloudInitArtifact,
    /// Virtual machine or container
    Compute,
}

/// Image or template fetched onto a datastore by URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadFileSpec {
    pub content_type: ContentType,
    pub datastore_id: String,
    pub node_name: String,
    pub url: String,
}

impl DownloadFileSpec {
    /// File name the datastore will store the download under
    pub fn file_name(&self) -> &str {
        let path = self.url.split(['?', '#']).next().unwrap_or(&self.url);
        path.rsplit('/').next().unwrap_or(path)
    }
}

/// Raw snippet uploaded to a datastore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetFileSpec {
    pub node_name: String,
    pub datastore_id: String,
    /// Always `snippets`
    pub content_type: String,
    pub file_mode: String,
    pub overwrite: bool,
    pub raw_content: String,
    pub file_name: String,
}

impl SnippetFileSpec {
    pub const CONTENT_TYPE: &'static str = "snippets";
    pub const DEFAULT_FILE_MODE: &'static str = "0755";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmMemory {
    /// Unset leaves the provider default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedicated_mib: Option<u32>,
    /// Balloon target
    pub floating_mib: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmDisk {
    pub size_gib: u32,
    pub interface: String,
    pub iothread: bool,
    pub file_format: String,
    pub source_file: ResourceRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDevice {
    pub model: String,
    pub bridge: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<MacAddress>,
}

/// Guest login set up by cloud-init without a user-data snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub username: String,
    pub password: Password,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmInitialization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datastore_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data_file: Option<ResourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_account: Option<UserAccount>,
}

/// Virtual machine declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachineSpec {
    pub node_name: String,
    pub display_name: String,
    pub cpu_cores: u32,
    pub memory: VmMemory,
    pub disks: Vec<VmDisk>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boot_order: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scsi_hardware: Option<String>,
    pub network_devices: Vec<NetworkDevice>,
    pub os_type: String,
    pub on_boot: bool,
    pub agent_enabled: bool,
    pub initialization: VmInitialization,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMemory {
    pub dedicated_mib: u32,
    pub swap_mib: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDisk {
    pub datastore_id: String,
    pub size_gib: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInterface {
    pub name: String,
    pub bridge: String,
    pub enabled: bool,
}

/// LXC container declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub node_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_id: Option<u32>,
    pub template_file: ResourceRef,
    pub os_type: String,
    pub cpu_cores: u32,
    pub memory: ContainerMemory,
    pub disk: ContainerDisk,
    pub network_interfaces: Vec<ContainerInterface>,
    pub root_password: Password,
    pub started: bool,
}

/// Arguments of a declared resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceSpec {
    DownloadFile(DownloadFileSpec),
    SnippetFile(SnippetFileSpec),
    VirtualMachine(VirtualMachineSpec),
    Container(ContainerSpec),
}

impl ResourceSpec {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceSpec::DownloadFile(_) => ResourceKind::DiskImage,
            ResourceSpec::SnippetFile(_) => ResourceKind::CloudInitArtifact,
            ResourceSpec::VirtualMachine(_) | ResourceSpec::Container(_) => ResourceKind::Compute,
        }
    }

    pub fn is_compute(&self) -> bool {
        self.kind() == ResourceKind::Compute
    }

    /// Resources this spec refers to in its own arguments
    pub fn references(&self) -> Vec<&ResourceRef> {
        match self {
            ResourceSpec::DownloadFile(_) | ResourceSpec::SnippetFile(_) => Vec::new(),
            ResourceSpec::VirtualMachine(vm) => vm
                .disks
                .iter()
                .map(|disk| &disk.source_file)
                .chain(vm.initialization.user_data_file.as_ref())
                .collect(),
            ResourceSpec::Container(ct) => vec![&ct.template_file],
        }
    }

    /// Hypervisor node the resource lives on
    pub fn node_name(&self) -> &str {
        match self {
            ResourceSpec::DownloadFile(spec) => &spec.node_name,
            ResourceSpec::SnippetFile(spec) => &spec.node_name,
            ResourceSpec::VirtualMachine(spec) => &spec.node_name,
            ResourceSpec::Container(spec) => &spec.node_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_file_name() {
        let spec = DownloadFileSpec {
            content_type: ContentType::Iso,
            datastore_id: "local".into(),
            node_name: "pve".into(),
            url: "https://cloud-images.ubuntu.com/noble/current/noble-server-cloudimg-amd64.img"
                .into(),
        };
        assert_eq!(spec.file_name(), "noble-server-cloudimg-amd64.img");

        let with_query = DownloadFileSpec {
            url: "https://example.com/images/rootfs.tar.xz?sig=abc".into(),
            ..spec
        };
        assert_eq!(with_query.file_name(), "rootfs.tar.xz");
    }

    #[test]
    fn test_content_type_serde() {
        assert_eq!(serde_json::to_string(&ContentType::Vztmpl).unwrap(), "\"vztmpl\"");
        let parsed: ContentType = serde_json::from_str("\"iso\"").unwrap();
        assert_eq!(parsed, ContentType::Iso);
    }
}
