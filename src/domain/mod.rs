// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Domain Models
//!
//! Value objects that parameterize a provisioning run.
//!
//! - [`Hostname`] - DNS-validated guest hostnames (RFC 1123)
//! - [`MacAddress`] - 48-bit MAC address, locally administered when generated
//! - [`MacStrategy`] - random-per-run or name-derived MAC assignment
//! - [`NodeSpec`] - one entry of the cluster node table

pub mod hostname;
pub mod network;
pub mod node;

pub use hostname::{Hostname, HostnameError};
pub use network::{MacAddress, MacStrategy, NetworkError};
pub use node::{NodeError, NodeRole, NodeSpec};
