// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Subnet Allocation
//!
//! Whatever masks and zone counts are asked for, allocation either fails
//! cleanly or returns aligned, disjoint blocks inside the VPC.

use fargate_stacks::domain::{allocate_subnets, Ipv4Cidr, SubnetMask, SubnetTier, SubnetType};
use proptest::prelude::*;

// ============================================================================
// Property Test Strategies
// ============================================================================

fn mask() -> impl Strategy<Value = SubnetMask> {
    (17u8..=28).prop_map(|m| SubnetMask::new(m).unwrap())
}

fn zones() -> impl Strategy<Value = Vec<String>> {
    (1usize..=4).prop_map(|n| (0..n).map(|i| format!("zone-{i}")).collect())
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: Allocated subnets never overlap and stay inside the VPC
    #[test]
    fn prop_subnets_disjoint_and_contained(
        public in mask(),
        private in mask(),
        db in mask(),
        zones in zones(),
    ) {
        let vpc = Ipv4Cidr::new("10.229.0.0/16").unwrap();
        let tiers = [
            SubnetTier::new("Public", SubnetType::Public, public),
            SubnetTier::new("Private", SubnetType::PrivateWithNat, private),
            SubnetTier::new("Db", SubnetType::PrivateIsolated, db),
        ];

        let Ok(subnets) = allocate_subnets(&vpc, &tiers, &zones) else {
            return Ok(());
        };

        prop_assert_eq!(subnets.len(), tiers.len() * zones.len());
        for (i, a) in subnets.iter().enumerate() {
            prop_assert!(vpc.contains(&a.cidr), "{} outside {}", a.cidr, vpc);
            prop_assert_eq!(u32::from(a.cidr.network()) as u64 % a.cidr.size(), 0);
            for b in &subnets[i + 1..] {
                prop_assert!(!a.cidr.overlaps(&b.cidr), "{} overlaps {}", a.cidr, b.cidr);
            }
        }
    }

    /// Property: Allocation order follows tiers then zones
    #[test]
    fn prop_allocation_is_sequential(public in mask(), zones in zones()) {
        let vpc = Ipv4Cidr::new("10.229.0.0/16").unwrap();
        let tiers = [SubnetTier::new("Public", SubnetType::Public, public)];

        if let Ok(subnets) = allocate_subnets(&vpc, &tiers, &zones) {
            for pair in subnets.windows(2) {
                prop_assert!(u32::from(pair[0].cidr.network()) < u32::from(pair[1].cidr.network()));
            }
            for (i, subnet) in subnets.iter().enumerate() {
                prop_assert_eq!(subnet.index, i + 1);
                prop_assert_eq!(&subnet.availability_zone, &zones[i]);
            }
        }
    }
}
