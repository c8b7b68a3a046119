// Copyright (c) 2025 - Cowboy AI, Inc.
//! Typed CloudFormation resource properties
//!
//! Each struct serializes to the `Properties` block of one resource type,
//! with CloudFormation's PascalCase keys. Values that may be intrinsics are
//! [`Expr`](crate::template::Expr); fixed settings are plain fields.

pub mod ec2;
pub mod ecs;
pub mod elbv2;
pub mod iam;

pub use elbv2::{LoadBalancerTarget, TargetGroupHandle, TargetType};
