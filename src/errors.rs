//! Error types for provisioning runs

use std::fmt;
use thiserror::Error;

use crate::cloud_init::TemplateError;
use crate::config::ConfigError;
use crate::domain::{NetworkError, NodeError};
use crate::engine::EngineError;
use crate::plan::PlanError;

/// Step of the per-node pipeline an error happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// MAC address assignment
    Identity,
    /// Cloud-init substitution and validation
    CloudInit,
    /// Cloud-init snippet declaration
    Artifact,
    /// VM or container declaration
    Compute,
    /// Reading back realized identifiers
    Export,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Identity => "identity",
            Phase::CloudInit => "cloud-init",
            Phase::Artifact => "artifact",
            Phase::Compute => "compute",
            Phase::Export => "export",
        };
        f.write_str(name)
    }
}

/// Errors that abort a provisioning run
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProvisioningError {
    /// Missing or invalid credentials, endpoint or cluster settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Entropy source failure while generating a MAC
    #[error("Random source error: {0}")]
    RandomSource(String),

    /// Template file missing or unreadable
    #[error("Template read error: {0}")]
    TemplateRead(String),

    /// Rendered template is not valid YAML
    #[error("Template render error: {0}")]
    TemplateRender(String),

    /// `${...}` tokens left after substitution
    #[error("Unresolved placeholders: {}", .0.join(", "))]
    UnresolvedPlaceholder(Vec<String>),

    /// Engine or provider rejected a declaration
    #[error("Resource declaration error: {0}")]
    ResourceDeclaration(String),

    /// The assembled plan breaks a structural rule
    #[error("Invalid provisioning plan: {0}")]
    InvalidPlan(String),

    /// Failure inside one node's pipeline
    #[error("Node {node} failed during {phase}: {source}")]
    Node {
        node: String,
        phase: Phase,
        #[source]
        source: Box<ProvisioningError>,
    },
}

impl ProvisioningError {
    /// Attach node and phase context
    pub fn for_node(self, node: impl Into<String>, phase: Phase) -> Self {
        ProvisioningError::Node {
            node: node.into(),
            phase,
            source: Box::new(self),
        }
    }

    /// The underlying error with any node context removed
    pub fn root(&self) -> &ProvisioningError {
        match self {
            ProvisioningError::Node { source, .. } => source.root(),
            other => other,
        }
    }

    /// Node the run stopped at, if the failure was node-local
    pub fn node(&self) -> Option<&str> {
        match self {
            ProvisioningError::Node { node, .. } => Some(node),
            _ => None,
        }
    }
}

/// Result type for provisioning operations
pub type ProvisioningResult<T> = Result<T, ProvisioningError>;

impl From<ConfigError> for ProvisioningError {
    fn from(err: ConfigError) -> Self {
        ProvisioningError::Configuration(err.to_string())
    }
}

impl From<NodeError> for ProvisioningError {
    fn from(err: NodeError) -> Self {
        ProvisioningError::Configuration(err.to_string())
    }
}

impl From<NetworkError> for ProvisioningError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::RandomSource(msg) => ProvisioningError::RandomSource(msg),
            other => ProvisioningError::Configuration(other.to_string()),
        }
    }
}

impl From<TemplateError> for ProvisioningError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::Read { .. } => ProvisioningError::TemplateRead(err.to_string()),
            TemplateError::Render(msg) => ProvisioningError::TemplateRender(msg),
            TemplateError::UnresolvedPlaceholder(names) => {
                ProvisioningError::UnresolvedPlaceholder(names)
            }
        }
    }
}

impl From<PlanError> for ProvisioningError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::DuplicateResource(_) | PlanError::UnknownDependency { .. } => {
                ProvisioningError::ResourceDeclaration(err.to_string())
            }
            other => ProvisioningError::InvalidPlan(other.to_string()),
        }
    }
}

impl From<EngineError> for ProvisioningError {
    fn from(err: EngineError) -> Self {
        ProvisioningError::ResourceDeclaration(err.to_string())
    }
}
