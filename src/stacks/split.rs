// Copyright (c) 2025 - Cowboy AI, Inc.
//! Split at the target group
//!
//! The load balancer stack owns an HTTP listener and the target group it
//! forwards to. Service stacks register their tasks straight into that
//! imported target group; there are no routing rules.

use super::load_balancer::{alb_security_group, DNS_EXPORT, LOAD_BALANCER_ID, SECURITY_GROUP_ID};
use super::service::{
    add_service, container_port_parameter, service_name_parameter, task_security_group,
    TASK_SECURITY_GROUP_ID,
};
use super::shared_infra::SharedInfraExports;
use super::{ExportRef, ExportedTargetGroup, Stack};
use crate::config::{LoadBalancerConfig, ServiceConfig};
use crate::domain::ResourceType;
use crate::errors::StackResult;
use crate::resources::ecs::{ContainerDefinition, FargateService, TaskDefinitionProperties};
use crate::resources::elbv2::{
    ListenerAction, ListenerProperties, LoadBalancerProperties, Protocol, TargetGroupProperties,
    TargetType,
};
use crate::template::{Expr, Output, Resource};

/// Fixed export name of the shared target group's name
pub const TARGET_GROUP_NAME_EXPORT: &str = "TargetGroup80Name";

/// Public sample image the split variant runs
pub const SAMPLE_IMAGE: &str = "amazon/amazon-ecs-sample";

const TARGET_GROUP_ID: &str = "TargetGroup80";
const LISTENER_ID: &str = "PublicALBListener80";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitLoadBalancerExports {
    pub dns_name: ExportRef,
    pub target_group: ExportedTargetGroup,
    pub target_group_name: ExportRef,
    pub security_group_id: ExportRef,
}

#[derive(Debug, Clone)]
pub struct SplitLoadBalancerStack {
    pub stack: Stack,
    pub exports: SplitLoadBalancerExports,
}

impl SplitLoadBalancerStack {
    pub fn new(config: &LoadBalancerConfig, infra: &SharedInfraExports) -> StackResult<Self> {
        let mut stack = Stack::new(config.stack_id.clone());

        let template = stack.template_mut();
        template.set_description("Public ALB with an HTTP listener and a shared target group");
        template.add_resource(
            SECURITY_GROUP_ID,
            Resource::new(
                ResourceType::SecurityGroup,
                &alb_security_group(infra.vpc_id.import(), &[80]),
            )?,
        )?;
        template.add_resource(
            LOAD_BALANCER_ID,
            Resource::new(
                ResourceType::LoadBalancer,
                &LoadBalancerProperties::internet_facing(
                    infra.public_subnets(),
                    vec![Expr::get_att(SECURITY_GROUP_ID, "GroupId")],
                ),
            )?,
        )?;
        template.add_resource(
            TARGET_GROUP_ID,
            Resource::new(
                ResourceType::TargetGroup,
                &TargetGroupProperties::new(infra.vpc_id.import(), 80, Protocol::Http, TargetType::Ip),
            )?,
        )?;
        template.add_resource(
            LISTENER_ID,
            Resource::new(
                ResourceType::Listener,
                &ListenerProperties::new(
                    Expr::reference(LOAD_BALANCER_ID),
                    80,
                    Protocol::Http,
                    ListenerAction::forward(Expr::reference(TARGET_GROUP_ID)),
                ),
            )?,
        )?;

        let dns_name = stack.export(
            "LoadBalancerDNS",
            DNS_EXPORT,
            Output::new(Expr::get_att(LOAD_BALANCER_ID, "DNSName")),
        )?;
        let target_group_name = stack.export(
            "TargetGroup",
            TARGET_GROUP_NAME_EXPORT,
            Output::new(Expr::get_att(TARGET_GROUP_ID, "TargetGroupName")),
        )?;
        let target_group_arn = stack.export_qualified(
            "TargetGroupArn",
            Output::new(Expr::reference(TARGET_GROUP_ID)).description("Shared target group"),
        )?;
        let security_group_id = stack.export_qualified(
            "SecurityGroupId",
            Output::new(Expr::get_att(SECURITY_GROUP_ID, "GroupId"))
                .description("Load balancer security group"),
        )?;

        Ok(Self {
            stack,
            exports: SplitLoadBalancerExports {
                dns_name,
                target_group: ExportedTargetGroup {
                    arn: target_group_arn,
                    target_type: TargetType::Ip,
                },
                target_group_name,
                security_group_id,
            },
        })
    }
}

/// Service registered directly into the load balancer's target group
#[derive(Debug, Clone)]
pub struct SplitServiceStack {
    pub stack: Stack,
}

impl SplitServiceStack {
    pub fn new(
        config: &ServiceConfig,
        infra: &SharedInfraExports,
        front: &SplitLoadBalancerExports,
    ) -> StackResult<Self> {
        let mut stack = Stack::new(config.stack_id.clone());
        let template = stack.template_mut();
        template.set_description("Fargate service registered into the shared target group");

        template.add_parameter("ServiceName", service_name_parameter(&config.service_name))?;
        template.add_parameter("ContainerPort", container_port_parameter(config.container_port))?;

        template.add_resource(
            "TaskDef",
            Resource::new(
                ResourceType::TaskDefinition,
                &TaskDefinitionProperties::fargate(ContainerDefinition::new(
                    "app",
                    Expr::str(SAMPLE_IMAGE),
                    Expr::reference("ContainerPort"),
                )),
            )?,
        )?;
        task_security_group(template, infra.vpc_id.import(), front.security_group_id.import())?;

        let mut service = FargateService::new(
            Expr::reference("ServiceName"),
            infra.cluster_name.import(),
            Expr::reference("TaskDef"),
            Expr::str("app"),
            Expr::reference("ContainerPort"),
        )
        .in_network(
            infra.private_subnets(),
            vec![Expr::get_att(TASK_SECURITY_GROUP_ID, "GroupId")],
        );
        front.target_group.handle().register(&mut service)?;
        add_service(template, service, None)?;

        Ok(Self { stack })
    }
}
