// Copyright (c) 2025 - Cowboy AI, Inc.
//! CloudFormation Resource Type Taxonomy
//!
//! The closed set of resource types the stacks in this crate declare, with
//! their CloudFormation type names and a coarse category used for logging
//! and summaries.

use serde::{Serialize, Serializer};
use std::fmt;

/// CloudFormation resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    // Network
    Vpc,
    Subnet,
    RouteTable,
    SubnetRouteTableAssociation,
    Route,
    InternetGateway,
    VpcGatewayAttachment,
    Eip,
    NatGateway,
    SecurityGroup,
    SecurityGroupIngress,

    // Compute
    Cluster,
    TaskDefinition,
    Service,

    // Load balancing
    LoadBalancer,
    Listener,
    ListenerRule,
    TargetGroup,

    // Identity
    Role,
    Policy,
}

impl ResourceType {
    /// CloudFormation type name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vpc => "AWS::EC2::VPC",
            Self::Subnet => "AWS::EC2::Subnet",
            Self::RouteTable => "AWS::EC2::RouteTable",
            Self::SubnetRouteTableAssociation => "AWS::EC2::SubnetRouteTableAssociation",
            Self::Route => "AWS::EC2::Route",
            Self::InternetGateway => "AWS::EC2::InternetGateway",
            Self::VpcGatewayAttachment => "AWS::EC2::VPCGatewayAttachment",
            Self::Eip => "AWS::EC2::EIP",
            Self::NatGateway => "AWS::EC2::NatGateway",
            Self::SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::SecurityGroupIngress => "AWS::EC2::SecurityGroupIngress",
            Self::Cluster => "AWS::ECS::Cluster",
            Self::TaskDefinition => "AWS::ECS::TaskDefinition",
            Self::Service => "AWS::ECS::Service",
            Self::LoadBalancer => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            Self::Listener => "AWS::ElasticLoadBalancingV2::Listener",
            Self::ListenerRule => "AWS::ElasticLoadBalancingV2::ListenerRule",
            Self::TargetGroup => "AWS::ElasticLoadBalancingV2::TargetGroup",
            Self::Role => "AWS::IAM::Role",
            Self::Policy => "AWS::IAM::Policy",
        }
    }

    /// Parse a CloudFormation type name
    pub fn parse(s: &str) -> Option<Self> {
        let parsed = match s {
            "AWS::EC2::VPC" => Self::Vpc,
            "AWS::EC2::Subnet" => Self::Subnet,
            "AWS::EC2::RouteTable" => Self::RouteTable,
            "AWS::EC2::SubnetRouteTableAssociation" => Self::SubnetRouteTableAssociation,
            "AWS::EC2::Route" => Self::Route,
            "AWS::EC2::InternetGateway" => Self::InternetGateway,
            "AWS::EC2::VPCGatewayAttachment" => Self::VpcGatewayAttachment,
            "AWS::EC2::EIP" => Self::Eip,
            "AWS::EC2::NatGateway" => Self::NatGateway,
            "AWS::EC2::SecurityGroup" => Self::SecurityGroup,
            "AWS::EC2::SecurityGroupIngress" => Self::SecurityGroupIngress,
            "AWS::ECS::Cluster" => Self::Cluster,
            "AWS::ECS::TaskDefinition" => Self::TaskDefinition,
            "AWS::ECS::Service" => Self::Service,
            "AWS::ElasticLoadBalancingV2::LoadBalancer" => Self::LoadBalancer,
            "AWS::ElasticLoadBalancingV2::Listener" => Self::Listener,
            "AWS::ElasticLoadBalancingV2::ListenerRule" => Self::ListenerRule,
            "AWS::ElasticLoadBalancingV2::TargetGroup" => Self::TargetGroup,
            "AWS::IAM::Role" => Self::Role,
            "AWS::IAM::Policy" => Self::Policy,
            _ => return None,
        };
        Some(parsed)
    }

    /// Get the primary category for this resource type
    pub fn category(&self) -> ResourceCategory {
        match self {
            Self::Vpc
            | Self::Subnet
            | Self::RouteTable
            | Self::SubnetRouteTableAssociation
            | Self::Route
            | Self::InternetGateway
            | Self::VpcGatewayAttachment
            | Self::Eip
            | Self::NatGateway
            | Self::SecurityGroup
            | Self::SecurityGroupIngress => ResourceCategory::Network,

            Self::Cluster | Self::TaskDefinition | Self::Service => ResourceCategory::Compute,

            Self::LoadBalancer | Self::Listener | Self::ListenerRule | Self::TargetGroup => {
                ResourceCategory::LoadBalancing
            }

            Self::Role | Self::Policy => ResourceCategory::Identity,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Resource category (high-level grouping)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceCategory {
    /// VPC, subnets, routing, security groups
    Network,
    /// ECS cluster, tasks, services
    Compute,
    /// ALB, listeners, rules, target groups
    LoadBalancing,
    /// IAM roles and policies
    Identity,
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "Network"),
            Self::Compute => write!(f, "Compute"),
            Self::LoadBalancing => write!(f, "Load Balancing"),
            Self::Identity => write!(f, "Identity"),
        }
    }
}
