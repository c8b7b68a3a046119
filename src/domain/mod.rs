// Copyright (c) 2025 - Cowboy AI, Inc.
//! Infrastructure Domain Models
//!
//! Value objects with validation invariants shared by every stack.
//!
//! # Value Objects with Invariants
//!
//! - [`Ipv4Cidr`] - IPv4 block in canonical CIDR notation
//! - [`SubnetMask`] - subnet size AWS accepts (/16-/28)
//! - [`HostPattern`] - ALB host-header match value
//! - [`Environment`] - deployment environment name
//! - [`ResourceType`] - CloudFormation resource taxonomy
//!
//! # Pure Validation
//!
//! [`invariants`] holds the routing and parameter checks as pure functions.

pub mod environment;
pub mod hostname;
pub mod invariants;
pub mod network;
pub mod resource_type;

pub use environment::Environment;
pub use hostname::{HostPattern, HostnameError};
pub use invariants::{ValidationError, ValidationResult};
pub use network::{
    allocate_subnets, select_zones, AllocatedSubnet, Ipv4Cidr, NetworkError, SubnetMask,
    SubnetTier, SubnetType,
};
pub use resource_type::{ResourceCategory, ResourceType};
