// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Stack Composition
//!
//! Every deploy-time parameter combination must yield the resource counts the
//! stacks promise, and composing the same configuration twice must
//! synthesize byte-identical templates.

use crate::fixtures::*;
use fargate_stacks::domain::ResourceType;
use fargate_stacks::{compose, AppConfig, Plan};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Property Test Strategies
// ============================================================================

fn environment() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["dev", "staging", "qa", "shared", "prod"])
}

fn host_label() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,10}"
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: Resource counts hold for every parameter combination
    ///
    /// Exactly one VPC, the cluster only when requested, the ALB only with a
    /// certificate, and the listeners and default target group always.
    #[test]
    fn prop_resource_counts(
        env in environment(),
        cluster in any::<bool>(),
        use_certificate in any::<bool>(),
    ) {
        let bundle = default_bundle();

        let infra = bundle.app.stack(INFRA_STACK).unwrap().template();
        let plan = Plan::new(infra, &infra_values(env, cluster)).unwrap();
        prop_assert_eq!(plan.count_of(ResourceType::Vpc), 1);
        prop_assert_eq!(plan.count_of(ResourceType::Cluster), usize::from(cluster));

        let lb = bundle.app.stack(LB_STACK).unwrap().template();
        let plan = Plan::new(lb, &lb_values(use_certificate)).unwrap();
        prop_assert_eq!(plan.count_of(ResourceType::LoadBalancer), usize::from(use_certificate));
        prop_assert_eq!(plan.count_of(ResourceType::Listener), 2);
        prop_assert_eq!(plan.count_of(ResourceType::TargetGroup), 1);
        prop_assert!(plan.resource("PublicALBHTTPSListener").is_some());
        prop_assert!(plan.resource("PublicALBRedirect80To443").is_some());
    }

    /// Property: Synthesis is deterministic
    ///
    /// Composing the same configuration twice yields identical templates.
    #[test]
    fn prop_synthesis_is_deterministic(label in host_label(), priority in 1u32..=50_000) {
        let mut config = AppConfig::default();
        config.services[0].priority = priority;
        config.services[0].host_headers = vec![
            fargate_stacks::domain::HostPattern::new(format!("{label}.example.com")).unwrap(),
        ];

        let first = compose(&config).unwrap();
        let second = compose(&config).unwrap();
        prop_assert_eq!(first.app.stacks().len(), second.app.stacks().len());
        for (a, b) in first.app.stacks().iter().zip(second.app.stacks()) {
            prop_assert_eq!(
                a.template().to_json_pretty().unwrap(),
                b.template().to_json_pretty().unwrap()
            );
        }

        let service = first.app.stack(SERVICE_STACK).unwrap().template();
        prop_assert_eq!(
            service.parameter("Priority").unwrap().default.clone(),
            Some(json!(priority))
        );
        prop_assert_eq!(
            service.parameter("HostHeaders").unwrap().default.clone(),
            Some(json!(format!("{label}.example.com")))
        );
    }
}
