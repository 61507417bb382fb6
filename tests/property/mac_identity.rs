// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for MAC Address Assignment

use proptest::prelude::*;
use proxmox_provisioning::domain::MacAddress;
use proxmox_provisioning::MacStrategy;

// ============================================================================
// Strategies
// ============================================================================

/// Seeds shaped like `cluster/node`
fn seed() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9-]{0,15}", "[a-z][a-z0-9-]{0,15}").prop_map(|(c, n)| format!("{}/{}", c, n))
}

fn strategy() -> impl Strategy<Value = MacStrategy> {
    prop_oneof![Just(MacStrategy::Random), Just(MacStrategy::Derived)]
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: Every assigned address is locally administered unicast
    #[test]
    fn prop_assigned_mac_bits(seed in seed(), strategy in strategy()) {
        let mac = strategy.assign(&seed).unwrap();
        let first = mac.octets()[0];

        prop_assert_eq!(first & 0b10, 0b10, "locally administered bit must be set");
        prop_assert_eq!(first & 0b01, 0, "multicast bit must be clear");
        prop_assert!(!mac.is_broadcast());
    }

    /// Property: Derived addresses depend only on the seed
    #[test]
    fn prop_derived_is_stable(seed in seed()) {
        prop_assert_eq!(
            MacStrategy::Derived.assign(&seed).unwrap(),
            MacStrategy::Derived.assign(&seed).unwrap()
        );
    }

    /// Property: Canonical text form parses back to the same address
    #[test]
    fn prop_canonical_form_parses(octets in any::<[u8; 6]>()) {
        let mac = MacAddress::from_octets(octets);
        let text = mac.to_string();

        prop_assert_eq!(text.len(), 17);
        prop_assert_eq!(MacAddress::new(&text).unwrap(), mac);
    }
}
