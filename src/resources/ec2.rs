// Copyright (c) 2025 - Cowboy AI, Inc.
//! EC2 networking resource properties

use serde::Serialize;

use crate::template::Expr;

/// Any IPv4 address, the destination of default routes and open ingress
pub const ANY_IPV4: &str = "0.0.0.0/0";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: Expr,
}

impl Tag {
    /// The `Name` tag the console displays
    pub fn name(value: impl Into<Expr>) -> Self {
        Self {
            key: "Name".to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcProperties {
    pub cidr_block: String,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
    pub instance_tenancy: &'static str,
    pub tags: Vec<Tag>,
}

impl VpcProperties {
    pub fn new(cidr_block: impl Into<String>, name: Expr) -> Self {
        Self {
            cidr_block: cidr_block.into(),
            enable_dns_hostnames: true,
            enable_dns_support: true,
            instance_tenancy: "default",
            tags: vec![Tag::name(name)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubnetProperties {
    pub vpc_id: Expr,
    pub availability_zone: String,
    pub cidr_block: String,
    pub map_public_ip_on_launch: bool,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteTableProperties {
    pub vpc_id: Expr,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubnetRouteTableAssociationProperties {
    pub route_table_id: Expr,
    pub subnet_id: Expr,
}

/// Default route through either the internet gateway or a NAT gateway
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteProperties {
    pub route_table_id: Expr,
    pub destination_cidr_block: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<Expr>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nat_gateway_id: Option<Expr>,
}

impl RouteProperties {
    pub fn via_internet_gateway(route_table_id: Expr, gateway_id: Expr) -> Self {
        Self {
            route_table_id,
            destination_cidr_block: ANY_IPV4,
            gateway_id: Some(gateway_id),
            nat_gateway_id: None,
        }
    }

    pub fn via_nat_gateway(route_table_id: Expr, nat_gateway_id: Expr) -> Self {
        Self {
            route_table_id,
            destination_cidr_block: ANY_IPV4,
            gateway_id: None,
            nat_gateway_id: Some(nat_gateway_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InternetGatewayProperties {
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcGatewayAttachmentProperties {
    pub vpc_id: Expr,
    pub internet_gateway_id: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EipProperties {
    pub domain: &'static str,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NatGatewayProperties {
    pub allocation_id: Expr,
    pub subnet_id: Expr,
    pub tags: Vec<Tag>,
}

/// Inline ingress rule open to a CIDR
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IngressRule {
    pub cidr_ip: String,
    pub description: String,
    pub from_port: u16,
    pub ip_protocol: &'static str,
    pub to_port: u16,
}

impl IngressRule {
    /// Allow TCP `port` from anywhere
    pub fn open_tcp(port: u16) -> Self {
        Self {
            cidr_ip: ANY_IPV4.to_string(),
            description: format!("Allow from anyone on port {port}"),
            from_port: port,
            ip_protocol: "tcp",
            to_port: port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EgressRule {
    pub cidr_ip: String,
    pub description: String,
    pub ip_protocol: &'static str,
}

impl EgressRule {
    pub fn allow_all() -> Self {
        Self {
            cidr_ip: ANY_IPV4.to_string(),
            description: "Allow all outbound traffic by default".to_string(),
            ip_protocol: "-1",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupProperties {
    pub group_description: String,
    pub vpc_id: Expr,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_ingress: Vec<IngressRule>,

    pub security_group_egress: Vec<EgressRule>,
}

/// Standalone ingress from another security group, used across stacks
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupIngressProperties {
    pub group_id: Expr,
    pub ip_protocol: &'static str,
    pub from_port: Expr,
    pub to_port: Expr,
    pub source_security_group_id: Expr,
    pub description: String,
}
