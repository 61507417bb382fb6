// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cloud-Init Template Engine
//!
//! Per-node first-boot documents rendered from one shared template.
//!
//! ```text
//! template file ──load once──> CloudInitTemplate
//!                                   │  render(Substitutions, PlaceholderPolicy)
//!                                   ▼
//!                      substitute ${name} → parse YAML → leftover check
//!                                   │
//!                                   ▼
//!                           CloudInitDocument (validated)
//! ```

pub mod template;

pub use template::{
    render, unresolved_placeholders, CloudInitDocument, CloudInitTemplate, PlaceholderPolicy,
    Substitutions, TemplateError, HOSTNAME_KEY, MAC_ADDRESS_KEY,
};
