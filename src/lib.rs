// Copyright (c) 2025 - Cowboy AI, Inc.
//! Typed CloudFormation composition for a Fargate web service
//!
//! Three independently deployable stacks:
//!
//! - a shared VPC with public, private and isolated subnets and an optional
//!   ECS cluster
//! - a public application load balancer with an HTTPS listener and an
//!   HTTP to HTTPS redirect
//! - a Fargate service behind a host-header rule on that listener
//!
//! Stacks hand each other typed export handles; [`App`] checks every
//! cross-stack import against earlier exports and [`synth`] writes the
//! templates and a manifest. [`Plan`] previews what a deploy would create
//! for concrete parameter values.

pub mod app;
pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod errors;
pub mod plan;
pub mod resources;
pub mod stacks;
pub mod synth;
pub mod template;

// Re-export commonly used types
pub use app::{compose, App, FrontEnd, StackBundle};
pub use config::{AppConfig, InfraConfig, LoadBalancerConfig, NetworkPolicy, ServiceConfig, Topology};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use errors::{StackError, StackResult};
pub use plan::Plan;
pub use stacks::{
    ExportRef, LoadBalancerExports, SharedInfraExports, SplitLoadBalancerExports, Stack,
};
pub use synth::{synth, Manifest};
pub use template::{Evaluator, ParameterValues, Template};
