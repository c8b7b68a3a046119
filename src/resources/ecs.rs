// Copyright (c) 2025 - Cowboy AI, Inc.
//! ECS cluster, Fargate task definition and service properties

use serde::Serialize;

use super::elbv2::{LoadBalancerTarget, TargetType};
use crate::template::Expr;

/// Task-level CPU units
pub const FARGATE_TASK_CPU: &str = "256";
/// Task-level memory in MiB
pub const FARGATE_TASK_MEMORY: &str = "512";
/// Container hard memory limit in MiB
pub const CONTAINER_MEMORY_MIB: u32 = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterProperties {
    pub cluster_name: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortMapping {
    pub container_port: Expr,
    pub protocol: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerDefinition {
    pub essential: bool,
    pub image: Expr,
    pub memory: u32,
    pub name: Expr,
    pub port_mappings: Vec<PortMapping>,
}

impl ContainerDefinition {
    /// Essential container with the standard memory limit and one TCP port
    pub fn new(name: impl Into<Expr>, image: Expr, container_port: Expr) -> Self {
        Self {
            essential: true,
            image,
            memory: CONTAINER_MEMORY_MIB,
            name: name.into(),
            port_mappings: vec![PortMapping {
                container_port,
                protocol: "tcp",
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskDefinitionProperties {
    pub container_definitions: Vec<ContainerDefinition>,
    pub cpu: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_role_arn: Option<Expr>,

    pub memory: &'static str,
    pub network_mode: &'static str,
    pub requires_compatibilities: Vec<&'static str>,
}

impl TaskDefinitionProperties {
    pub fn fargate(container: ContainerDefinition) -> Self {
        Self {
            container_definitions: vec![container],
            cpu: FARGATE_TASK_CPU,
            execution_role_arn: None,
            memory: FARGATE_TASK_MEMORY,
            network_mode: "awsvpc",
            requires_compatibilities: vec!["FARGATE"],
        }
    }

    pub fn with_execution_role(mut self, role_arn: Expr) -> Self {
        self.execution_role_arn = Some(role_arn);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentConfiguration {
    pub maximum_percent: u32,
    pub minimum_healthy_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AwsvpcConfiguration {
    pub assign_public_ip: &'static str,
    pub security_groups: Vec<Expr>,
    pub subnets: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkConfiguration {
    pub awsvpc_configuration: AwsvpcConfiguration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoadBalancerBinding {
    pub container_name: Expr,
    pub container_port: Expr,
    pub target_group_arn: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceProperties {
    pub cluster: Expr,
    pub deployment_configuration: DeploymentConfiguration,
    pub desired_count: u32,
    pub enable_ecs_managed_tags: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_grace_period_seconds: Option<u32>,

    pub launch_type: &'static str,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub load_balancers: Vec<LoadBalancerBinding>,

    pub network_configuration: NetworkConfiguration,
    pub service_name: Expr,
    pub task_definition: Expr,
}

/// A Fargate service before rendering, knowing which container port
/// a target group should send traffic to
#[derive(Debug, Clone, PartialEq)]
pub struct FargateService {
    properties: ServiceProperties,
    container_name: Expr,
    container_port: Expr,
}

impl FargateService {
    /// One private task, no public IP
    pub fn new(
        service_name: Expr,
        cluster: Expr,
        task_definition: Expr,
        container_name: Expr,
        container_port: Expr,
    ) -> Self {
        Self {
            properties: ServiceProperties {
                cluster,
                deployment_configuration: DeploymentConfiguration {
                    maximum_percent: 200,
                    minimum_healthy_percent: 50,
                },
                desired_count: 1,
                enable_ecs_managed_tags: false,
                health_check_grace_period_seconds: None,
                launch_type: "FARGATE",
                load_balancers: Vec::new(),
                network_configuration: NetworkConfiguration {
                    awsvpc_configuration: AwsvpcConfiguration {
                        assign_public_ip: "DISABLED",
                        security_groups: Vec::new(),
                        subnets: Vec::new(),
                    },
                },
                service_name,
                task_definition,
            },
            container_name,
            container_port,
        }
    }

    pub fn in_network(mut self, subnets: Vec<Expr>, security_groups: Vec<Expr>) -> Self {
        let awsvpc = &mut self.properties.network_configuration.awsvpc_configuration;
        awsvpc.subnets = subnets;
        awsvpc.security_groups = security_groups;
        self
    }

    pub fn properties(&self) -> &ServiceProperties {
        &self.properties
    }
}

impl LoadBalancerTarget for FargateService {
    fn target_type(&self) -> TargetType {
        TargetType::Ip
    }

    fn attach(&mut self, target_group_arn: Expr) {
        self.properties.load_balancers.push(LoadBalancerBinding {
            container_name: self.container_name.clone(),
            container_port: self.container_port.clone(),
            target_group_arn,
        });
        self.properties.health_check_grace_period_seconds = Some(60);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::elbv2::TargetGroupHandle;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn service() -> FargateService {
        FargateService::new(
            Expr::reference("ServiceName"),
            Expr::import_value("Infra:ClusterName"),
            Expr::reference("TaskDef"),
            Expr::reference("ServiceName"),
            Expr::reference("ContainerPort"),
        )
    }

    #[test]
    fn test_task_definition_is_fargate() {
        let container = ContainerDefinition::new(
            "web",
            Expr::str("amazon/amazon-ecs-sample"),
            Expr::Num(80),
        );
        let value = serde_json::to_value(TaskDefinitionProperties::fargate(container)).unwrap();

        assert_eq!(value["Cpu"], json!("256"));
        assert_eq!(value["Memory"], json!("512"));
        assert_eq!(value["NetworkMode"], json!("awsvpc"));
        assert_eq!(value["RequiresCompatibilities"], json!(["FARGATE"]));
        assert_eq!(value["ContainerDefinitions"][0]["Memory"], json!(256));
        assert_eq!(
            value["ContainerDefinitions"][0]["PortMappings"],
            json!([{ "ContainerPort": 80, "Protocol": "tcp" }])
        );
        assert!(value.get("ExecutionRoleArn").is_none());
    }

    #[test]
    fn test_unregistered_service_has_no_load_balancers() {
        let value = serde_json::to_value(service().properties()).unwrap();
        assert!(value.get("LoadBalancers").is_none());
        assert!(value.get("HealthCheckGracePeriodSeconds").is_none());
        assert_eq!(
            value["NetworkConfiguration"]["AwsvpcConfiguration"]["AssignPublicIp"],
            json!("DISABLED")
        );
    }

    #[test]
    fn test_registration_binds_container() {
        let mut service = service();
        TargetGroupHandle::new("TargetGroup", Expr::reference("TargetGroup"), TargetType::Ip)
            .register(&mut service)
            .unwrap();

        let value = serde_json::to_value(service.properties()).unwrap();
        assert_eq!(
            value["LoadBalancers"],
            json!([{
                "ContainerName": { "Ref": "ServiceName" },
                "ContainerPort": { "Ref": "ContainerPort" },
                "TargetGroupArn": { "Ref": "TargetGroup" }
            }])
        );
        assert_eq!(value["HealthCheckGracePeriodSeconds"], json!(60));
    }

    #[test]
    fn test_fargate_rejects_instance_target_group() {
        let mut service = service();
        let result = TargetGroupHandle::new("Legacy", Expr::reference("Legacy"), TargetType::Instance)
            .register(&mut service);
        assert!(result.is_err());
        assert!(service.properties().load_balancers.is_empty());
    }
}
