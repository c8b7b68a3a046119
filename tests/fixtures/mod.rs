// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for fargate-stacks
//!
//! Fixed stack ids and parameter sets so every test composes the same
//! assembly. Tests build configurations and parameter values through these
//! helpers instead of repeating literals.

#![allow(dead_code)]

use fargate_stacks::{compose, AppConfig, ParameterValues, StackBundle, Topology};

pub const INFRA_STACK: &str = "VPCWithECSCLuster";
pub const LB_STACK: &str = "SplitAtTargetGroup-LBStack";
pub const SERVICE_STACK: &str = "SplitAtTargetGroup-ServiceStack";

pub const CERTIFICATE_ARN: &str =
    "arn:aws:acm:ap-northeast-2:123456789012:certificate/00000000-0000-0000-0000-000000000000";

/// Default assembly
pub fn default_bundle() -> StackBundle {
    compose(&AppConfig::default()).unwrap()
}

pub fn split_config() -> AppConfig {
    AppConfig {
        topology: Topology::SplitAtTargetGroup,
        ..AppConfig::default()
    }
}

/// Infra parameters for one environment and cluster choice
pub fn infra_values(environment: &str, cluster: bool) -> ParameterValues {
    ParameterValues::new()
        .with("Environment", environment)
        .with("ECSCluster", cluster.to_string())
}

pub fn lb_values(use_certificate: bool) -> ParameterValues {
    ParameterValues::new()
        .with("CertificateArn", CERTIFICATE_ARN)
        .with("UseCertificate", use_certificate.to_string())
}

pub fn service_values() -> ParameterValues {
    ParameterValues::new().with("ECRRepoName", "web")
}
