// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Identity Value Objects
//!
//! MAC addresses handed to guest network devices. Generated addresses are
//! always locally administered unicast so they never collide with vendor
//! assigned hardware addresses on the same bridge.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("Random source unavailable: {0}")]
    RandomSource(String),
}

/// Locally-administered bit of the first octet
const LOCALLY_ADMINISTERED: u8 = 0x02;

/// Multicast (group) bit of the first octet
const MULTICAST: u8 = 0x01;

/// MAC Address value object
///
/// Represents a 48-bit MAC address with validation.
/// Invariants:
/// - Valid MAC address format (6 octets)
/// - Canonical representation (lowercase, colon-separated)
///
/// # Examples
///
/// ```rust
/// use proxmox_provisioning::domain::MacAddress;
///
/// let mac = MacAddress::new("02:AA:bb:cc:dd:ee").unwrap();
/// assert_eq!(mac.as_str(), "02:aa:bb:cc:dd:ee");
/// assert!(mac.is_locally_administered());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Create a new MAC address with validation
    ///
    /// Accepts colon, hyphen or bare hex notation.
    pub fn new(mac: impl AsRef<str>) -> Result<Self, NetworkError> {
        let mac = mac.as_ref();
        let invalid = || NetworkError::InvalidMacAddress(mac.to_string());

        // Invariant: six groups of exactly two hex digits, one separator style
        let groups: Vec<&str> = if mac.contains(':') {
            mac.split(':').collect()
        } else if mac.contains('-') {
            mac.split('-').collect()
        } else if mac.len() == 12 && mac.is_ascii() {
            (0..12).step_by(2).map(|i| &mac[i..i + 2]).collect()
        } else {
            return Err(invalid());
        };

        if groups.len() != 6 {
            return Err(invalid());
        }

        let mut octets = [0u8; 6];
        for (octet, group) in octets.iter_mut().zip(&groups) {
            if group.len() != 2 || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(group, 16).map_err(|_| invalid())?;
        }

        Ok(Self(octets))
    }

    /// Create from raw octets
    pub fn from_octets(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Generate a random locally-administered unicast address
    ///
    /// All 48 bits are drawn from the operating system CSPRNG before the
    /// first octet is fixed up, leaving 46 bits of entropy.
    pub fn generate_local() -> Result<Self, NetworkError> {
        let mut octets = [0u8; 6];
        OsRng
            .try_fill_bytes(&mut octets)
            .map_err(|e| NetworkError::RandomSource(e.to_string()))?;
        Ok(Self::local_unicast(octets))
    }

    /// Derive a stable locally-administered unicast address from a seed
    ///
    /// The same seed always yields the same address, so a node keeps its
    /// MAC across repeated provisioning runs.
    pub fn derive_local(seed: impl AsRef<[u8]>) -> Self {
        let digest = Sha256::digest(seed.as_ref());
        let mut octets = [0u8; 6];
        octets.copy_from_slice(&digest[..6]);
        Self::local_unicast(octets)
    }

    fn local_unicast(mut octets: [u8; 6]) -> Self {
        octets[0] = (octets[0] | LOCALLY_ADMINISTERED) & !MULTICAST;
        Self(octets)
    }

    /// Get the octets
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Get as canonical string (lowercase, colon-separated)
    pub fn as_str(&self) -> String {
        format!(
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }

    /// Check if this is a broadcast MAC address
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
    }

    /// Check if this is a multicast MAC address
    pub fn is_multicast(&self) -> bool {
        self.0[0] & MULTICAST != 0
    }

    /// Check if this is a unicast MAC address
    pub fn is_unicast(&self) -> bool {
        !self.is_multicast()
    }

    /// Check if the administratively-assigned bit is set
    pub fn is_locally_administered(&self) -> bool {
        self.0[0] & LOCALLY_ADMINISTERED != 0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MacAddress {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// Serialized in canonical text form, which is what the provider expects.
impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_str())
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// How node MAC addresses are chosen for a provisioning run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacStrategy {
    /// Fresh random address every run
    Random,
    /// Stable address derived from cluster and node name
    #[default]
    Derived,
}

impl MacStrategy {
    /// Produce an address for `seed` under this strategy
    pub fn assign(&self, seed: &str) -> Result<MacAddress, NetworkError> {
        match self {
            MacStrategy::Random => MacAddress::generate_local(),
            MacStrategy::Derived => Ok(MacAddress::derive_local(seed)),
        }
    }
}
