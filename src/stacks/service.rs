// Copyright (c) 2025 - Cowboy AI, Inc.
//! Fargate service behind a host-header rule on the shared HTTPS listener

use super::load_balancer::LoadBalancerExports;
use super::shared_infra::SharedInfraExports;
use super::Stack;
use crate::config::ServiceConfig;
use crate::domain::invariants::{MAX_RULE_PRIORITY, MIN_RULE_PRIORITY};
use crate::domain::ResourceType;
use crate::errors::StackResult;
use crate::resources::ec2::{EgressRule, SecurityGroupIngressProperties, SecurityGroupProperties};
use crate::resources::ecs::{ContainerDefinition, FargateService, TaskDefinitionProperties};
use crate::resources::elbv2::{
    ListenerAction, ListenerRuleProperties, Protocol, RuleCondition, TargetGroupHandle,
    TargetGroupProperties, TargetType,
};
use crate::resources::iam::{
    PolicyDocument, PolicyProperties, RoleProperties, Statement, ECS_TASKS_PRINCIPAL,
    TASK_EXECUTION_ACTIONS,
};
use crate::template::{Expr, Parameter, Resource, Template};

const EXECUTION_ROLE_ID: &str = "EcsTaskExecutionRole";
const EXECUTION_POLICY_ID: &str = "EcsTaskExecutionRoleDefaultPolicy";
const TASK_DEFINITION_ID: &str = "TaskDef";
pub(crate) const TASK_SECURITY_GROUP_ID: &str = "FargateServiceSecurityGroup";
const INGRESS_ID: &str = "FargateServiceSecurityGroupIngressFromALB";
const TARGET_GROUP_ID: &str = "TargetGroup";
const LISTENER_RULE_ID: &str = "HostHeaderListenerRule";
const SERVICE_ID: &str = "FargateService";

/// Image in the account's private registry, tagged `latest`
pub const ECR_IMAGE: &str =
    "${AWS::AccountId}.dkr.ecr.${AWS::Region}.${AWS::URLSuffix}/${ECRRepoName}:latest";

#[derive(Debug, Clone)]
pub struct ServiceStack {
    pub stack: Stack,
    /// Listener the rule attaches to, as its export name
    pub listener: String,
    pub priority: u32,
}

/// Security group for Fargate tasks, open only to the load balancer
pub(crate) fn task_security_group(
    template: &mut Template,
    vpc_id: Expr,
    load_balancer_group: Expr,
) -> StackResult<()> {
    template.add_resource(
        TASK_SECURITY_GROUP_ID,
        Resource::new(
            ResourceType::SecurityGroup,
            &SecurityGroupProperties {
                group_description: "Fargate service tasks".to_string(),
                vpc_id,
                security_group_ingress: Vec::new(),
                security_group_egress: vec![EgressRule::allow_all()],
            },
        )?,
    )?;
    template.add_resource(
        INGRESS_ID,
        Resource::new(
            ResourceType::SecurityGroupIngress,
            &SecurityGroupIngressProperties {
                group_id: Expr::get_att(TASK_SECURITY_GROUP_ID, "GroupId"),
                ip_protocol: "tcp",
                from_port: Expr::reference("ContainerPort"),
                to_port: Expr::reference("ContainerPort"),
                source_security_group_id: load_balancer_group,
                description: "Load balancer to target".to_string(),
            },
        )?,
    )?;
    Ok(())
}

/// Container port parameter shared by both service variants
pub(crate) fn container_port_parameter(port: u16) -> Parameter {
    Parameter::number("port number exposed from the container image").default_number(i64::from(port))
}

/// Service name parameter shared by both service variants
pub(crate) fn service_name_parameter(name: &str) -> Parameter {
    Parameter::string("This will set the Container, Task Definition, and Service name in Fargate")
        .default_str(name)
}

/// Render a service once its target registrations are done
pub(crate) fn add_service(
    template: &mut Template,
    service: FargateService,
    depends_on: Option<&str>,
) -> StackResult<()> {
    let mut resource = Resource::new(ResourceType::Service, service.properties())?;
    if let Some(dep) = depends_on {
        resource = resource.depends_on(dep);
    }
    template.add_resource(SERVICE_ID, resource)
}

impl ServiceStack {
    pub fn new(
        config: &ServiceConfig,
        infra: &SharedInfraExports,
        front: &LoadBalancerExports,
    ) -> StackResult<Self> {
        let mut stack = Stack::new(config.stack_id.clone());
        let template = stack.template_mut();
        template.set_description("Fargate service routed by host header from the shared listener");

        template.add_parameter("ServiceName", service_name_parameter(&config.service_name))?;
        template.add_parameter(
            "ECRRepoName",
            Parameter::string("Name of Amazon Elastic Container Registry"),
        )?;
        template.add_parameter(
            "HealthCheckPath",
            Parameter::string("Health Check Path for ECS Container")
                .default_str(config.health_check_path.clone()),
        )?;
        template.add_parameter(
            "HealthCheckPort",
            Parameter::number("Health Check Port for ECS Container")
                .default_number(i64::from(config.health_check_port)),
        )?;
        template.add_parameter("ContainerPort", container_port_parameter(config.container_port))?;
        template.add_parameter(
            "Priority",
            Parameter::number("Priority of Listener Rule")
                .default_number(i64::from(config.priority))
                .min_value(i64::from(MIN_RULE_PRIORITY))
                .max_value(i64::from(MAX_RULE_PRIORITY)),
        )?;
        let hosts: Vec<&str> = config.host_headers.iter().map(|h| h.as_str()).collect();
        template.add_parameter(
            "HostHeaders",
            Parameter::comma_delimited_list("Host headers routed to this service")
                .default_str(hosts.join(",")),
        )?;

        template.add_resource(
            EXECUTION_ROLE_ID,
            Resource::new(
                ResourceType::Role,
                &RoleProperties::assumed_by(ECS_TASKS_PRINCIPAL)
                    .named(Expr::sub("${ServiceName}-ecs-task-execution-role")),
            )?,
        )?;
        template.add_resource(
            EXECUTION_POLICY_ID,
            Resource::new(
                ResourceType::Policy,
                &PolicyProperties {
                    policy_document: PolicyDocument::new(vec![Statement::allow_all_resources(
                        TASK_EXECUTION_ACTIONS,
                    )]),
                    policy_name: EXECUTION_POLICY_ID.to_string(),
                    roles: vec![Expr::reference(EXECUTION_ROLE_ID)],
                },
            )?,
        )?;

        template.add_resource(
            TASK_DEFINITION_ID,
            Resource::new(
                ResourceType::TaskDefinition,
                &TaskDefinitionProperties::fargate(ContainerDefinition::new(
                    Expr::reference("ServiceName"),
                    Expr::sub(ECR_IMAGE),
                    Expr::reference("ContainerPort"),
                ))
                .with_execution_role(Expr::get_att(EXECUTION_ROLE_ID, "Arn")),
            )?,
        )?;

        task_security_group(template, infra.vpc_id.import(), front.security_group_id.import())?;

        template.add_resource(
            TARGET_GROUP_ID,
            Resource::new(
                ResourceType::TargetGroup,
                &TargetGroupProperties::new(infra.vpc_id.import(), 80, Protocol::Http, TargetType::Ip)
                    .named(Expr::sub("${ServiceName}-ecs-target-group"))
                    .health_check(
                        Expr::reference("HealthCheckPath"),
                        Expr::reference("HealthCheckPort"),
                    ),
            )?,
        )?;
        template.add_resource(
            LISTENER_RULE_ID,
            Resource::new(
                ResourceType::ListenerRule,
                &ListenerRuleProperties::new(
                    front.listener_arn.import(),
                    Expr::reference("Priority"),
                    RuleCondition::host_header(Expr::reference("HostHeaders")),
                    ListenerAction::forward(Expr::reference(TARGET_GROUP_ID)),
                ),
            )?,
        )?;

        let mut service = FargateService::new(
            Expr::reference("ServiceName"),
            infra.cluster_name.import(),
            Expr::reference(TASK_DEFINITION_ID),
            Expr::reference("ServiceName"),
            Expr::reference("ContainerPort"),
        )
        .in_network(
            infra.private_subnets(),
            vec![Expr::get_att(TASK_SECURITY_GROUP_ID, "GroupId")],
        );
        TargetGroupHandle::new(TARGET_GROUP_ID, Expr::reference(TARGET_GROUP_ID), TargetType::Ip)
            .register(&mut service)?;

        // The target group must be attached to a listener before a service can use it
        add_service(template, service, Some(LISTENER_RULE_ID))?;

        Ok(Self {
            stack,
            listener: front.listener_arn.name().to_string(),
            priority: config.priority,
        })
    }
}
