// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cloud-Init Template Rendering
//!
//! A shared template is read once per run and rendered per node by literal
//! `${name}` substitution. The result must parse as YAML before it is
//! handed to the upload step.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::domain::{Hostname, MacAddress};

/// Placeholder key for the guest hostname
pub const HOSTNAME_KEY: &str = "hostname";

/// Placeholder key for the pinned MAC address
pub const MAC_ADDRESS_KEY: &str = "mac_address";

/// Template errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// Template file missing, unreadable or not UTF-8
    #[error("Failed to read cloud-init template {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// Rendered text is not well-formed YAML
    #[error("Invalid cloud-init YAML after substitution: {0}")]
    Render(String),

    /// `${...}` tokens remain after substitution
    #[error("Unresolved placeholders in cloud-init document: {}", .0.join(", "))]
    UnresolvedPlaceholder(Vec<String>),
}

/// What to do with `${...}` tokens left after substitution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderPolicy {
    /// Fail with [`TemplateError::UnresolvedPlaceholder`]
    #[default]
    Reject,
    /// Accept as long as the YAML still parses
    Tolerate,
}

/// Ordered placeholder substitutions with unique keys
///
/// Inserting an existing key replaces its value in place, so the last
/// write for a token wins and first-insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<(String, String)>")]
pub struct Substitutions(Vec<(String, String)>);

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard per-node substitutions
    pub fn for_node(hostname: &Hostname, mac: Option<&MacAddress>) -> Self {
        let mut subs = Self::new();
        if let Some(mac) = mac {
            subs.insert(MAC_ADDRESS_KEY, mac.as_str());
        }
        subs.insert(HOSTNAME_KEY, hostname.as_str());
        subs
    }

    /// Add or replace a substitution
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Apply every substitution to `text`, in order
    pub fn apply(&self, text: &str) -> String {
        self.iter().fold(text.to_string(), |content, (key, value)| {
            content.replace(&format!("${{{}}}", key), value)
        })
    }
}

impl From<Vec<(String, String)>> for Substitutions {
    fn from(pairs: Vec<(String, String)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Substitutions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut subs = Self::new();
        for (k, v) in iter {
            subs.insert(k, v);
        }
        subs
    }
}

/// A rendered, YAML-checked cloud-init document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloudInitDocument {
    template_source: String,
    substitutions: Substitutions,
    rendered_content: String,
    validated: bool,
}

impl CloudInitDocument {
    /// Raw template text the document was rendered from
    pub fn template_source(&self) -> &str {
        &self.template_source
    }

    pub fn substitutions(&self) -> &Substitutions {
        &self.substitutions
    }

    /// Final document text, ready for upload
    pub fn content(&self) -> &str {
        &self.rendered_content
    }

    /// True once the rendered content has parsed as YAML
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub fn into_content(self) -> String {
        self.rendered_content
    }
}

/// Shared cloud-init template, loaded once per provisioning run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudInitTemplate {
    path: Option<PathBuf>,
    source: String,
}

impl CloudInitTemplate {
    /// Read the template from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| TemplateError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let source = String::from_utf8(bytes).map_err(|e| TemplateError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            source,
        })
    }

    /// Build a template from in-memory text
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            path: None,
            source: source.into(),
        }
    }

    /// Where the template was loaded from, if anywhere
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Substitute, then check YAML well-formedness and leftover tokens
    pub fn render(
        &self,
        substitutions: &Substitutions,
        policy: PlaceholderPolicy,
    ) -> Result<CloudInitDocument, TemplateError> {
        let rendered = substitutions.apply(&self.source);

        serde_yaml::from_str::<serde_yaml::Value>(&rendered)
            .map_err(|e| TemplateError::Render(e.to_string()))?;

        let leftover = unresolved_placeholders(&rendered);
        if !leftover.is_empty() {
            match policy {
                PlaceholderPolicy::Reject => {
                    return Err(TemplateError::UnresolvedPlaceholder(leftover))
                }
                PlaceholderPolicy::Tolerate => {
                    warn!(placeholders = ?leftover, "Cloud-init document keeps unresolved placeholders")
                }
            }
        }

        Ok(CloudInitDocument {
            template_source: self.source.clone(),
            substitutions: substitutions.clone(),
            rendered_content: rendered,
            validated: true,
        })
    }
}

/// Load `path` and render it in one step
pub fn render(
    path: impl AsRef<Path>,
    substitutions: &Substitutions,
    policy: PlaceholderPolicy,
) -> Result<CloudInitDocument, TemplateError> {
    CloudInitTemplate::load(path)?.render(substitutions, policy)
}

/// Contents of every `${...}` span in `text`, deduplicated, in order of
/// first appearance
///
/// Any `${` with a closing `}` after it counts, including `${}` and names
/// with spaces. For nested spans such as `${${a}}` only the innermost is
/// reported.
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        if let Some(end) = after.find('}') {
            let name = &after[..end];
            if !name.contains("${") && !found.iter().any(|n| n == name) {
                found.push(name.to_string());
            }
        }
        rest = after;
    }

    found
}
