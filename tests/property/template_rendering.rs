// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Cloud-Init Rendering

use proptest::prelude::*;
use proxmox_provisioning::cloud_init::{unresolved_placeholders, HOSTNAME_KEY, MAC_ADDRESS_KEY};
use proxmox_provisioning::domain::{Hostname, MacAddress};
use proxmox_provisioning::{CloudInitTemplate, PlaceholderPolicy, Substitutions};

const TEMPLATE: &str = "#cloud-config
hostname: ${hostname}
write_files:
  - path: /etc/pinned-mac
    content: \"${mac_address}\"
";

// ============================================================================
// Strategies
// ============================================================================

fn hostname() -> impl Strategy<Value = Hostname> {
    "[a-z][a-z0-9]{0,20}".prop_map(|h| Hostname::new(h).unwrap())
}

/// Arbitrary substitution maps, keys drawn from a small alphabet
fn substitutions() -> impl Strategy<Value = Substitutions> {
    prop::collection::vec(("[a-z_]{1,12}", "[a-zA-Z0-9 .:-]{0,24}"), 0..6)
        .prop_map(|pairs| pairs.into_iter().collect())
}

/// Simple YAML mappings without any `${` token
fn resolved_document() -> impl Strategy<Value = String> {
    prop::collection::vec(("[a-z][a-z_]{0,10}", "[a-zA-Z0-9 ]{0,20}"), 1..8).prop_map(|pairs| {
        pairs
            .iter()
            .enumerate()
            .map(|(i, (k, v))| format!("{}_{}: \"{}\"\n", k, i, v))
            .collect()
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: Rendering resolved input is the identity
    #[test]
    fn prop_resolved_document_unchanged(doc in resolved_document(), subs in substitutions()) {
        let template = CloudInitTemplate::from_source(doc.clone());
        let rendered = template.render(&subs, PlaceholderPolicy::Reject).unwrap();

        prop_assert_eq!(rendered.content(), doc.as_str());
        prop_assert!(rendered.is_validated());
    }

    /// Property: Per-node substitutions leave no standard token behind
    #[test]
    fn prop_node_substitution_complete(host in hostname(), octets in any::<[u8; 6]>()) {
        let mac = MacAddress::from_octets(octets);
        let subs = Substitutions::for_node(&host, Some(&mac));
        let doc = CloudInitTemplate::from_source(TEMPLATE)
            .render(&subs, PlaceholderPolicy::Reject)
            .unwrap();

        prop_assert!(doc.content().contains(host.as_str()));
        prop_assert!(doc.content().contains(&mac.to_string()));
        prop_assert!(unresolved_placeholders(doc.content()).is_empty());
        prop_assert_eq!(subs.get(HOSTNAME_KEY), Some(host.as_str()));
        prop_assert_eq!(subs.get(MAC_ADDRESS_KEY).map(str::to_string), Some(mac.to_string()));
    }

    /// Property: Rendering twice with the same map gives the same document
    #[test]
    fn prop_render_is_deterministic(host in hostname()) {
        let template = CloudInitTemplate::from_source(TEMPLATE);
        let subs = Substitutions::for_node(&host, None);

        let a = template.render(&subs, PlaceholderPolicy::Tolerate).unwrap();
        let b = template.render(&subs, PlaceholderPolicy::Tolerate).unwrap();
        prop_assert_eq!(a.content(), b.content());
        prop_assert_eq!(unresolved_placeholders(a.content()), vec![MAC_ADDRESS_KEY.to_string()]);
    }
}
