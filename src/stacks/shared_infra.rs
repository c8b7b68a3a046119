// Copyright (c) 2025 - Cowboy AI, Inc.
//! VPC and optional ECS cluster
//!
//! Three subnet tiers (public, private with NAT egress, isolated) replicated
//! across the pinned zones, one NAT gateway in the first public subnet, and
//! an ECS cluster that only exists when `ECSCluster` is `"true"`.
//!
//! Subnet layout is fixed at synthesis. The network parameters are declared
//! so operators see them, but nothing reads them; see [`NetworkPolicy`].
//!
//! [`NetworkPolicy`]: crate::config::NetworkPolicy

use serde_json::json;
use tracing::debug;

use super::{ExportRef, Stack};
use crate::config::InfraConfig;
use crate::domain::{
    allocate_subnets, select_zones, AllocatedSubnet, Environment, ResourceType, SubnetMask,
    SubnetTier, SubnetType,
};
use crate::errors::StackResult;
use crate::resources::ec2::{
    EipProperties, InternetGatewayProperties, NatGatewayProperties, RouteProperties,
    RouteTableProperties, SubnetProperties, SubnetRouteTableAssociationProperties, Tag,
    VpcGatewayAttachmentProperties, VpcProperties,
};
use crate::resources::ecs::ClusterProperties;
use crate::template::{flag_parameter, ConditionExpr, Expr, Output, Parameter, Resource};

/// Gate of the cluster and its export
pub const CLUSTER_CONDITION: &str = "EnableCreateECSCluster";

/// IPv4 address with a /16-/28 prefix
pub const VPC_CIDR_PATTERN: &str = r"^(([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])\.){3}([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])(\/(1[6-9]|2[0-8]))$";

const MASK_CONSTRAINT: &str = "CIDR network mask parameter must be in the form x.x.x.x/16-28";

const VPC_ID: &str = "Vpc";
const INTERNET_GATEWAY_ID: &str = "VpcIGW";
const GATEWAY_ATTACHMENT_ID: &str = "VpcVPCGW";
const CLUSTER_ID: &str = "Cluster";

/// What the shared stack offers downstream stacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedInfraExports {
    pub vpc_id: ExportRef,
    /// One per zone, in zone order
    pub public_subnet_ids: Vec<ExportRef>,
    /// One per zone, in zone order
    pub private_subnet_ids: Vec<ExportRef>,
    /// Only exported when the cluster condition holds
    pub cluster_name: ExportRef,
}

impl SharedInfraExports {
    pub fn public_subnets(&self) -> Vec<Expr> {
        self.public_subnet_ids.iter().map(ExportRef::import).collect()
    }

    pub fn private_subnets(&self) -> Vec<Expr> {
        self.private_subnet_ids.iter().map(ExportRef::import).collect()
    }
}

/// The shared network stack and its exports
#[derive(Debug, Clone)]
pub struct SharedInfraStack {
    pub stack: Stack,
    pub exports: SharedInfraExports,
    pub subnets: Vec<AllocatedSubnet>,
}

fn subnet_id(subnet: &AllocatedSubnet) -> String {
    format!("Vpc{}Subnet{}", subnet.tier, subnet.index)
}

fn mask_parameter(description: &str, mask: SubnetMask) -> Parameter {
    Parameter::number(description)
        .default_number(i64::from(mask.value()))
        .constraint_description(MASK_CONSTRAINT)
}

impl SharedInfraStack {
    pub fn new(config: &InfraConfig) -> StackResult<Self> {
        let mut stack = Stack::new(config.stack_id.clone());
        let layout = config.layout();

        let template = stack.template_mut();
        template.set_description("VPC with three subnet tiers and an optional ECS cluster");
        template.add_parameter(
            "Environment",
            Parameter::string("Environment")
                .default_str(config.environment.as_str())
                .allowed_values(Environment::allowed_values()),
        )?;
        template.add_parameter(
            "MaxAZs",
            Parameter::number("Max Availability Zones")
                .default_number(config.max_azs as i64)
                .min_value(2)
                .max_value(4),
        )?;
        template.add_parameter(
            "VPCCIDR",
            Parameter::string("CIDR block for the VPC")
                .default_str(config.vpc_cidr.to_string())
                .allowed_pattern(VPC_CIDR_PATTERN)
                .constraint_description("CIDR block parameter must be in the form x.x.x.x/16-28"),
        )?;
        template.add_parameter(
            "PublicSubnetCIDRMask",
            mask_parameter("CIDR block for the Public Subnet", config.public_mask),
        )?;
        template.add_parameter(
            "PrivateSubnetCIDRMask",
            mask_parameter("CIDR block for the Private Subnet", config.private_mask),
        )?;
        template.add_parameter(
            "DbSubnetCIDRMask",
            mask_parameter("CIDR block for the DB Subnet", config.db_mask),
        )?;
        template.add_parameter("ECSCluster", flag_parameter("Create ECS Cluster in VPC", false))?;
        template.add_condition(
            CLUSTER_CONDITION,
            ConditionExpr::parameter_equals("true", "ECSCluster"),
        )?;

        template.set_metadata(
            "AWS::CloudFormation::Interface",
            json!({
                "ParameterGroups": [
                    {
                        "Label": { "default": "VPC Configuration" },
                        "Parameters": [
                            "Environment",
                            "MaxAZs",
                            "VPCCIDR",
                            "PublicSubnetCIDRMask",
                            "PrivateSubnetCIDRMask",
                            "DbSubnetCIDRMask"
                        ]
                    },
                    {
                        "Label": { "default": "(Optional)ECS Cluster in VPC" },
                        "Parameters": ["ECSCluster"]
                    }
                ]
            }),
        );

        let vpc_name = Expr::sub("${Environment}-vpc");
        template.add_resource(
            VPC_ID,
            Resource::new(
                ResourceType::Vpc,
                &VpcProperties::new(layout.vpc_cidr.to_string(), vpc_name.clone()),
            )?,
        )?;
        template.add_resource(
            INTERNET_GATEWAY_ID,
            Resource::new(
                ResourceType::InternetGateway,
                &InternetGatewayProperties {
                    tags: vec![Tag::name(vpc_name)],
                },
            )?,
        )?;
        template.add_resource(
            GATEWAY_ATTACHMENT_ID,
            Resource::new(
                ResourceType::VpcGatewayAttachment,
                &VpcGatewayAttachmentProperties {
                    vpc_id: Expr::reference(VPC_ID),
                    internet_gateway_id: Expr::reference(INTERNET_GATEWAY_ID),
                },
            )?,
        )?;

        let tiers = [
            SubnetTier::new("Public", SubnetType::Public, layout.public_mask),
            SubnetTier::new("Private", SubnetType::PrivateWithNat, layout.private_mask),
            SubnetTier::new("Db", SubnetType::PrivateIsolated, layout.db_mask),
        ];
        let zones = select_zones(&config.zones, layout.max_azs)?;
        let subnets = allocate_subnets(&layout.vpc_cidr, &tiers, &zones)?;

        // Egress for every private tier goes through the first public subnet
        let nat_gateway = subnets
            .iter()
            .find(|s| s.subnet_type == SubnetType::Public)
            .map(|s| format!("{}NATGateway", subnet_id(s)));

        for subnet in &subnets {
            let id = subnet_id(subnet);
            let route_table = format!("{id}RouteTable");
            let name = Expr::sub(format!(
                "${{Environment}}-vpc/{}Subnet{}",
                subnet.tier, subnet.index
            ));
            debug!(
                subnet = %id,
                cidr = %subnet.cidr,
                zone = %subnet.availability_zone,
                "allocated subnet"
            );

            template.add_resource(
                &id,
                Resource::new(
                    ResourceType::Subnet,
                    &SubnetProperties {
                        vpc_id: Expr::reference(VPC_ID),
                        availability_zone: subnet.availability_zone.clone(),
                        cidr_block: subnet.cidr.to_string(),
                        map_public_ip_on_launch: subnet.subnet_type.maps_public_ip(),
                        tags: vec![
                            Tag::name(name.clone()),
                            Tag {
                                key: "aws-cdk:subnet-type".to_string(),
                                value: Expr::str(subnet.subnet_type.as_str()),
                            },
                        ],
                    },
                )?,
            )?;
            template.add_resource(
                &route_table,
                Resource::new(
                    ResourceType::RouteTable,
                    &RouteTableProperties {
                        vpc_id: Expr::reference(VPC_ID),
                        tags: vec![Tag::name(name.clone())],
                    },
                )?,
            )?;
            template.add_resource(
                &format!("{id}RouteTableAssociation"),
                Resource::new(
                    ResourceType::SubnetRouteTableAssociation,
                    &SubnetRouteTableAssociationProperties {
                        route_table_id: Expr::reference(&route_table),
                        subnet_id: Expr::reference(&id),
                    },
                )?,
            )?;

            match subnet.subnet_type {
                SubnetType::Public => {
                    let default_route = format!("{id}DefaultRoute");
                    template.add_resource(
                        &default_route,
                        Resource::new(
                            ResourceType::Route,
                            &RouteProperties::via_internet_gateway(
                                Expr::reference(&route_table),
                                Expr::reference(INTERNET_GATEWAY_ID),
                            ),
                        )?
                        .depends_on(GATEWAY_ATTACHMENT_ID),
                    )?;

                    if nat_gateway.as_deref() == Some(format!("{id}NATGateway").as_str()) {
                        let eip = format!("{id}EIP");
                        template.add_resource(
                            &eip,
                            Resource::new(
                                ResourceType::Eip,
                                &EipProperties {
                                    domain: "vpc",
                                    tags: vec![Tag::name(name.clone())],
                                },
                            )?,
                        )?;
                        template.add_resource(
                            &format!("{id}NATGateway"),
                            Resource::new(
                                ResourceType::NatGateway,
                                &NatGatewayProperties {
                                    allocation_id: Expr::get_att(&eip, "AllocationId"),
                                    subnet_id: Expr::reference(&id),
                                    tags: vec![Tag::name(name)],
                                },
                            )?
                            .depends_on(default_route)
                            .depends_on(format!("{id}RouteTableAssociation")),
                        )?;
                    }
                }
                SubnetType::PrivateWithNat => {
                    if let Some(nat) = &nat_gateway {
                        template.add_resource(
                            &format!("{id}DefaultRoute"),
                            Resource::new(
                                ResourceType::Route,
                                &RouteProperties::via_nat_gateway(
                                    Expr::reference(&route_table),
                                    Expr::reference(nat),
                                ),
                            )?,
                        )?;
                    }
                }
                SubnetType::PrivateIsolated => {}
            }
        }

        template.add_resource(
            CLUSTER_ID,
            Resource::new(
                ResourceType::Cluster,
                &ClusterProperties {
                    cluster_name: Expr::sub("${Environment}-cluster"),
                },
            )?
            .with_condition(CLUSTER_CONDITION),
        )?;

        let vpc_id = stack.export_qualified(
            "VpcId",
            Output::new(Expr::reference(VPC_ID)).description("VPC id"),
        )?;

        let mut public_subnet_ids = Vec::new();
        let mut private_subnet_ids = Vec::new();
        for subnet in &subnets {
            let (exports, label) = match subnet.subnet_type {
                SubnetType::Public => (&mut public_subnet_ids, "Public"),
                SubnetType::PrivateWithNat => (&mut private_subnet_ids, "Private"),
                SubnetType::PrivateIsolated => continue,
            };
            let export = stack.export_qualified(
                &format!("{label}Subnet{}Id", subnet.index),
                Output::new(Expr::reference(subnet_id(subnet)))
                    .description(format!("{label} subnet in {}", subnet.availability_zone)),
            )?;
            exports.push(export);
        }

        let cluster_name = stack.export_qualified(
            "ClusterName",
            Output::new(Expr::reference(CLUSTER_ID))
                .description("ECS cluster name")
                .with_condition(CLUSTER_CONDITION),
        )?;

        Ok(Self {
            stack,
            exports: SharedInfraExports {
                vpc_id,
                public_subnet_ids,
                private_subnet_ids,
                cluster_name,
            },
            subnets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkPolicy;
    use crate::diagnostics::DiagnosticKind;
    use crate::domain::Ipv4Cidr;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_layout() {
        let infra = SharedInfraStack::new(&InfraConfig::default()).unwrap();
        let cidrs: Vec<String> = infra.subnets.iter().map(|s| s.cidr.to_string()).collect();
        assert_eq!(
            cidrs,
            vec![
                "10.229.0.0/28",
                "10.229.0.16/28",
                "10.229.1.0/24",
                "10.229.2.0/24",
                "10.229.3.0/28",
                "10.229.3.16/28",
            ]
        );

        let template = infra.stack.template();
        assert_eq!(template.resources_of_type(ResourceType::Vpc).len(), 1);
        assert_eq!(template.resources_of_type(ResourceType::NatGateway).len(), 1);
        assert_eq!(template.resources_of_type(ResourceType::Subnet).len(), 6);
        // Two public and two private default routes, none for the isolated tier
        assert_eq!(template.resources_of_type(ResourceType::Route).len(), 4);
        template.check_references().unwrap();
    }

    #[test]
    fn test_cluster_is_gated() {
        let infra = SharedInfraStack::new(&InfraConfig::default()).unwrap();
        let template = infra.stack.template();
        let cluster = template.resource(CLUSTER_ID).unwrap();
        assert_eq!(cluster.condition.as_deref(), Some(CLUSTER_CONDITION));
        assert_eq!(infra.exports.cluster_name.condition(), Some(CLUSTER_CONDITION));
        assert_eq!(infra.exports.vpc_id.condition(), None);
    }

    #[test]
    fn test_network_parameters_are_inert() {
        let infra = SharedInfraStack::new(&InfraConfig::default()).unwrap();
        let inert: Vec<String> = infra
            .stack
            .template()
            .diagnostics()
            .into_iter()
            .filter(|d| d.kind == DiagnosticKind::InertParameter)
            .map(|d| d.logical_id)
            .collect();
        assert_eq!(
            inert,
            vec![
                "DbSubnetCIDRMask",
                "MaxAZs",
                "PrivateSubnetCIDRMask",
                "PublicSubnetCIDRMask",
                "VPCCIDR",
            ]
        );
    }

    #[test]
    fn test_configured_network() {
        let config = InfraConfig {
            vpc_cidr: Ipv4Cidr::new("10.0.0.0/20").unwrap(),
            max_azs: 3,
            zones: vec!["a".into(), "b".into(), "c".into()],
            network_policy: NetworkPolicy::UseConfigured,
            ..InfraConfig::default()
        };
        let infra = SharedInfraStack::new(&config).unwrap();
        assert_eq!(infra.subnets.len(), 9);
        assert_eq!(infra.exports.public_subnet_ids.len(), 3);
        assert_eq!(infra.exports.private_subnet_ids.len(), 3);
        assert_eq!(
            infra.stack.template().parameter("VPCCIDR").unwrap().default,
            Some(serde_json::json!("10.0.0.0/20"))
        );
    }

    #[test]
    fn test_too_many_zones() {
        let config = InfraConfig {
            max_azs: 3,
            network_policy: NetworkPolicy::UseConfigured,
            ..InfraConfig::default()
        };
        assert!(SharedInfraStack::new(&config).is_err());
    }
}
