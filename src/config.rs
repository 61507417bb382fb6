// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Configuration
//!
//! - [`SessionConfig`] - hypervisor credentials, resolved from the
//!   environment (with `.env` support)
//! - [`ClusterConfig`] - node table and shared artifact settings, passed
//!   explicitly to the orchestrator
//! - [`ContainerConfig`] - single LXC container variant

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cloud_init::PlaceholderPolicy;
use crate::domain::{Hostname, MacStrategy, NodeError, NodeSpec};
use crate::plan::{ContentType, UserAccount};

pub const ENV_USERNAME: &str = "PROXMOX_USERNAME";
pub const ENV_PASSWORD: &str = "PROXMOX_PASSWORD";
pub const ENV_ENDPOINT: &str = "PROXMOX_ENDPOINT";
pub const ENV_INSECURE: &str = "PROXMOX_INSECURE";
pub const ENV_CONTAINER_PASSWORD: &str = "CONTAINER_PASSWORD";

/// Endpoint used when `PROXMOX_ENDPOINT` is unset
pub const DEFAULT_ENDPOINT: &str = "https://192.168.1.198:8006/";

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in the environment or .env file")]
    MissingVariable(&'static str),

    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: &'static str, message: String },

    #[error("Failed to read configuration file {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid cluster configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Node(#[from] NodeError),
}

/// Secret string that never shows up in logs or serialized plans
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The secret itself; pass straight to the provider
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(********)")
    }
}

impl Serialize for Password {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("********")
    }
}

/// Hypervisor connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub endpoint: String,
    pub username: String,
    pub password: Password,
    /// Skip TLS certificate verification
    pub insecure: bool,
    /// Root password for provisioned containers
    pub container_password: Option<Password>,
}

impl SessionConfig {
    /// Load from the process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self, ConfigError> {
        // Missing .env is fine, real environment variables still apply
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let username = get(ENV_USERNAME).ok_or(ConfigError::MissingVariable(ENV_USERNAME))?;
        let password = get(ENV_PASSWORD).ok_or(ConfigError::MissingVariable(ENV_PASSWORD))?;

        let endpoint = get(ENV_ENDPOINT).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(ConfigError::InvalidValue {
                name: ENV_ENDPOINT,
                message: format!("expected an http(s) URL, got {}", endpoint),
            });
        }

        let insecure = match get(ENV_INSECURE) {
            None => true,
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                name: ENV_INSECURE,
                message: format!("expected true or false, got {}", raw),
            })?,
        };

        Ok(Self {
            endpoint,
            username,
            password: Password::new(password),
            insecure,
            container_password: get(ENV_CONTAINER_PASSWORD).map(Password::new),
        })
    }

    /// Container password, required by the container workflow
    pub fn require_container_password(&self) -> Result<&Password, ConfigError> {
        self.container_password
            .as_ref()
            .ok_or(ConfigError::MissingVariable(ENV_CONTAINER_PASSWORD))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Artifact fetched once per run and shared by compute resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    /// Resource name of the download in the plan
    pub logical_name: String,
    pub url: String,
    #[serde(default = "default_local_datastore")]
    pub datastore_id: String,
    pub content_type: ContentType,
}

impl ImageSource {
    /// Ubuntu 24.04 cloud image
    pub fn ubuntu_noble_cloud_image() -> Self {
        Self {
            logical_name: "download-image".to_string(),
            url: "https://cloud-images.ubuntu.com/noble/current/noble-server-cloudimg-amd64.img"
                .to_string(),
            datastore_id: default_local_datastore(),
            content_type: ContentType::Iso,
        }
    }

    /// Ubuntu 22.04 cloud image
    pub fn ubuntu_jammy_cloud_image() -> Self {
        Self {
            logical_name: "latest-ubuntu22-jammy-img".to_string(),
            url: "https://cloud-images.ubuntu.com/jammy/current/jammy-server-cloudimg-amd64.img"
                .to_string(),
            datastore_id: default_local_datastore(),
            content_type: ContentType::Iso,
        }
    }

    /// Ubuntu 22.04 LXC root filesystem
    pub fn ubuntu_jammy_lxc_template() -> Self {
        Self {
            logical_name: "latest-ubuntu22-jammy-lxc".to_string(),
            url: "https://images.linuxcontainers.org/images/ubuntu/jammy/amd64/default/20241101_07%3A42/rootfs.tar.xz"
                .to_string(),
            datastore_id: default_local_datastore(),
            content_type: ContentType::Vztmpl,
        }
    }
}

fn default_cluster_name() -> String {
    "k8s".to_string()
}

fn default_hypervisor_node() -> String {
    "pve".to_string()
}

fn default_local_datastore() -> String {
    "local".to_string()
}

fn default_vm_datastore() -> String {
    "local-lvm".to_string()
}

fn default_bridge() -> String {
    "vmbr0".to_string()
}

/// Everything the orchestrator needs to build a cluster plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Cluster name, part of the seed for derived MACs
    #[serde(default = "default_cluster_name")]
    pub name: String,
    /// Hypervisor host every resource is placed on
    #[serde(default = "default_hypervisor_node")]
    pub hypervisor_node: String,
    pub image: ImageSource,
    #[serde(default = "default_local_datastore")]
    pub snippets_datastore: String,
    #[serde(default = "default_vm_datastore")]
    pub vm_datastore: String,
    #[serde(default = "default_bridge")]
    pub bridge: String,
    pub template_path: PathBuf,
    #[serde(default)]
    pub mac_strategy: MacStrategy,
    #[serde(default)]
    pub placeholder_policy: PlaceholderPolicy,
    pub nodes: Vec<NodeSpec>,
}

impl ClusterConfig {
    /// Cluster with default settings and the given node table
    pub fn new(template_path: impl Into<PathBuf>, nodes: Vec<NodeSpec>) -> Self {
        Self {
            name: default_cluster_name(),
            hypervisor_node: default_hypervisor_node(),
            image: ImageSource::ubuntu_noble_cloud_image(),
            snippets_datastore: default_local_datastore(),
            vm_datastore: default_vm_datastore(),
            bridge: default_bridge(),
            template_path: template_path.into(),
            mac_strategy: MacStrategy::default(),
            placeholder_policy: PlaceholderPolicy::default(),
            nodes,
        }
    }

    /// One control plane and two workers on Ubuntu 24.04
    pub fn kubernetes(template_path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let nodes = vec![
            NodeSpec::control("k8s-control-plane", 4, 8192, 50)?
                .with_hostname(hostname("controller")?),
            NodeSpec::worker("k8s-worker-1", 2, 4096, 40)?.with_hostname(hostname("worker1")?),
            NodeSpec::worker("k8s-worker-2", 2, 4096, 40)?.with_hostname(hostname("worker2")?),
        ];
        Ok(Self::new(template_path, nodes))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML cluster description
    ///
    /// A relative `template_path` is resolved against the file's directory.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut config = Self::from_yaml_str(&raw)?;
        if config.template_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.template_path = dir.join(&config.template_path);
            }
        }
        Ok(config)
    }

    pub fn with_mac_strategy(mut self, strategy: MacStrategy) -> Self {
        self.mac_strategy = strategy;
        self
    }

    pub fn with_placeholder_policy(mut self, policy: PlaceholderPolicy) -> Self {
        self.placeholder_policy = policy;
        self
    }

    pub fn with_image(mut self, image: ImageSource) -> Self {
        self.image = image;
        self
    }

    /// Check table-level rules that single nodes cannot see
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::Invalid("node table is empty".to_string()));
        }
        if self.image.content_type != ContentType::Iso {
            return Err(ConfigError::Invalid(format!(
                "virtual machine image must have content type iso, got {}",
                self.image.content_type
            )));
        }

        let mut names = HashSet::new();
        let mut hostnames = HashSet::new();
        for node in &self.nodes {
            if !names.insert(node.name()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate node name {}",
                    node.name()
                )));
            }
            // Hostnames name the snippet files, so they must be unique too
            if !hostnames.insert(node.hostname().short_name()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate hostname {}",
                    node.hostname()
                )));
            }
        }

        // Image, snippets and VMs share one resource name space
        let mut resources = HashSet::new();
        resources.insert(self.image.logical_name.clone());
        for node in &self.nodes {
            for resource in [node.name().to_string(), node.cloud_init_resource_name()] {
                if !resources.insert(resource.clone()) {
                    return Err(ConfigError::Invalid(format!(
                        "resource name {} is used by more than one resource",
                        resource
                    )));
                }
            }
        }
        Ok(())
    }
}

fn hostname(raw: &str) -> Result<Hostname, ConfigError> {
    Hostname::new(raw).map_err(|e| ConfigError::Invalid(e.to_string()))
}

/// Single LXC container provisioned from a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub name: String,
    #[serde(default = "default_hypervisor_node")]
    pub hypervisor_node: String,
    pub template: ImageSource,
    pub os_type: String,
    pub cpu_cores: u32,
    pub memory_mib: u32,
    pub swap_mib: u32,
    #[serde(default = "default_vm_datastore")]
    pub disk_datastore: String,
    pub disk_size_gib: u32,
    #[serde(default = "default_bridge")]
    pub bridge: String,
    pub interface_name: String,
    #[serde(default)]
    pub vm_id: Option<u32>,
    pub started: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            name: "container".to_string(),
            hypervisor_node: default_hypervisor_node(),
            template: ImageSource::ubuntu_jammy_lxc_template(),
            os_type: "ubuntu".to_string(),
            cpu_cores: 2,
            memory_mib: 4096,
            swap_mib: 4096,
            disk_datastore: default_vm_datastore(),
            disk_size_gib: 10,
            bridge: default_bridge(),
            interface_name: "eth0".to_string(),
            vm_id: Some(200),
            started: true,
        }
    }
}

impl ContainerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("container name is empty".to_string()));
        }
        if self.template.content_type != ContentType::Vztmpl {
            return Err(ConfigError::Invalid(format!(
                "container template must have content type vztmpl, got {}",
                self.template.content_type
            )));
        }
        if self.cpu_cores == 0 || self.memory_mib == 0 || self.disk_size_gib == 0 {
            return Err(ConfigError::Invalid(format!(
                "container {} needs positive cores, memory and disk",
                self.name
            )));
        }
        Ok(())
    }
}

/// Single VM booted straight from a cloud image, without a user-data snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleVmConfig {
    /// Resource name in the plan and key of the export
    pub resource_name: String,
    /// Name shown by the hypervisor
    pub display_name: String,
    #[serde(default = "default_hypervisor_node")]
    pub hypervisor_node: String,
    pub image: ImageSource,
    pub cpu_cores: u32,
    /// Balloon memory; no dedicated amount is requested
    pub floating_memory_mib: u32,
    pub disk_size_gib: u32,
    pub disk_interface: String,
    #[serde(default = "default_bridge")]
    pub bridge: String,
    pub user_account: UserAccount,
}

impl Default for SingleVmConfig {
    fn default() -> Self {
        Self {
            resource_name: "vm".to_string(),
            display_name: "example-vm".to_string(),
            hypervisor_node: default_hypervisor_node(),
            image: ImageSource::ubuntu_jammy_cloud_image(),
            cpu_cores: 2,
            floating_memory_mib: 3200,
            disk_size_gib: 30,
            disk_interface: "virtio0".to_string(),
            bridge: default_bridge(),
            user_account: UserAccount {
                username: "ubuntu".to_string(),
                password: Password::new("ubuntu"),
            },
        }
    }
}

impl SingleVmConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resource_name.trim().is_empty() || self.display_name.trim().is_empty() {
            return Err(ConfigError::Invalid("VM name is empty".to_string()));
        }
        if self.image.content_type != ContentType::Iso {
            return Err(ConfigError::Invalid(format!(
                "virtual machine image must have content type iso, got {}",
                self.image.content_type
            )));
        }
        if self.image.logical_name == self.resource_name {
            return Err(ConfigError::Invalid(format!(
                "resource name {} is used by both the image and the VM",
                self.resource_name
            )));
        }
        if self.cpu_cores == 0 || self.floating_memory_mib == 0 || self.disk_size_gib == 0 {
            return Err(ConfigError::Invalid(format!(
                "VM {} needs positive cores, memory and disk",
                self.resource_name
            )));
        }
        if self.user_account.username.trim().is_empty() {
            return Err(ConfigError::Invalid("VM user account has no username".to_string()));
        }
        Ok(())
    }
}
