// Copyright (c) 2025 - Cowboy AI, Inc.
//! Guest Hostname Value Object
//!
//! Hostnames are written into cloud-init documents and used to name the
//! snippet files uploaded for each node, so they must be valid DNS names
//! and safe as file name stems.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

/// Hostname validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostnameError {
    #[error("Hostname is empty")]
    Empty,

    #[error("Hostname exceeds maximum length of 253 characters: {0}")]
    TooLong(usize),

    #[error("Label exceeds maximum length of 63 characters: {0}")]
    LabelTooLong(String),

    #[error("Invalid character in hostname: {0}")]
    InvalidCharacter(char),

    #[error("Label cannot start or end with hyphen: {0}")]
    InvalidLabelFormat(String),

    #[error("Hostname cannot be all numeric: {0}")]
    NumericLabel(String),
}

/// Guest hostname (RFC 1123), stored lowercase
///
/// # Examples
///
/// ```rust
/// use proxmox_provisioning::domain::Hostname;
///
/// let host = Hostname::new("Worker1").unwrap();
/// assert_eq!(host.as_str(), "worker1");
/// assert!(Hostname::new("-invalid").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Hostname(String);

impl Hostname {
    /// Maximum total length for FQDN (RFC 1123)
    pub const MAX_LENGTH: usize = 253;

    /// Maximum length for a single label (RFC 1123)
    pub const MAX_LABEL_LENGTH: usize = 63;

    /// Validate and canonicalise a hostname
    pub fn new(hostname: impl AsRef<str>) -> Result<Self, HostnameError> {
        let hostname = hostname.as_ref().trim().to_ascii_lowercase();

        if hostname.is_empty() {
            return Err(HostnameError::Empty);
        }
        if hostname.len() > Self::MAX_LENGTH {
            return Err(HostnameError::TooLong(hostname.len()));
        }

        let labels: Vec<&str> = hostname.split('.').collect();
        for label in &labels {
            Self::validate_label(label)?;
        }

        // Rightmost label all-numeric would read as an IPv4 octet
        if let Some(last) = labels.last() {
            if last.chars().all(|c| c.is_ascii_digit()) {
                return Err(HostnameError::NumericLabel(last.to_string()));
            }
        }

        Ok(Self(hostname))
    }

    fn validate_label(label: &str) -> Result<(), HostnameError> {
        if label.is_empty() {
            return Err(HostnameError::Empty);
        }
        if label.len() > Self::MAX_LABEL_LENGTH {
            return Err(HostnameError::LabelTooLong(label.to_string()));
        }
        if let Some(ch) = label
            .chars()
            .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '-')
        {
            return Err(HostnameError::InvalidCharacter(ch));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(HostnameError::InvalidLabelFormat(label.to_string()));
        }
        Ok(())
    }

    /// Get the hostname as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First label, used as the guest's short hostname
    pub fn short_name(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// Check if this is a fully qualified domain name (contains dots)
    pub fn is_fqdn(&self) -> bool {
        self.0.contains('.')
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Hostname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Hostname {
    type Error = HostnameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for Hostname {
    type Error = HostnameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Hostname {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}
