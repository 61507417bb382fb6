// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for proxmox-provisioning
//!
//! Deterministic sessions, templates and node tables shared by the
//! integration tests. Templates are written into a [`TempDir`] that the
//! caller keeps alive for the duration of the test.

#![allow(dead_code)]

use std::path::PathBuf;
use tempfile::TempDir;

use proxmox_provisioning::domain::Hostname;
use proxmox_provisioning::{ClusterConfig, NodeSpec, Password, SessionConfig};

pub const ENDPOINT: &str = "https://pve.test:8006/";

/// Template that uses both standard placeholders
pub const TEMPLATE: &str = "#cloud-config
hostname: ${hostname}
network:
  version: 2
  ethernets:
    primary:
      match:
        macaddress: \"${mac_address}\"
      dhcp4: true
";

/// Template that only needs the hostname
pub const HOSTNAME_ONLY_TEMPLATE: &str = "#cloud-config
hostname: ${hostname}
";

/// Template whose substituted hostname breaks the YAML structure
pub const BROKEN_TEMPLATE: &str = "#cloud-config
hostname: [${hostname}
";

pub fn session() -> SessionConfig {
    SessionConfig {
        endpoint: ENDPOINT.to_string(),
        username: "root@pam".to_string(),
        password: Password::new("test-password"),
        insecure: true,
        container_password: Some(Password::new("container-secret")),
    }
}

/// Write `contents` as `cloud-init.yml` in a fresh temporary directory
pub fn template_dir(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("cloud-init.yml");
    std::fs::write(&path, contents).expect("Failed to write template");
    (dir, path)
}

/// `ctrl` plus `count` workers named `w1`, `w2`, ...
pub fn nodes(count: usize) -> Vec<NodeSpec> {
    let mut nodes = vec![NodeSpec::control("ctrl", 2, 2048, 20).expect("Invalid control node")];
    for i in 1..=count {
        nodes.push(NodeSpec::worker(format!("w{}", i), 1, 1024, 10).expect("Invalid worker node"));
    }
    nodes
}

pub fn cluster(template_path: PathBuf, nodes: Vec<NodeSpec>) -> ClusterConfig {
    ClusterConfig::new(template_path, nodes)
}

/// Single control node whose guest hostname is `controller`
pub fn single_ctrl_node() -> NodeSpec {
    NodeSpec::control("ctrl", 2, 2048, 20)
        .expect("Invalid control node")
        .with_hostname(Hostname::new("controller").expect("Invalid hostname"))
}
