// Copyright (c) 2025 - Cowboy AI, Inc.
//! Public ALB front end with an HTTPS listener and a default target group
//!
//! The ALB only exists when `UseCertificate` is `"true"`, but the redirect
//! listener, the HTTPS listener and the DNS output are declared without a
//! condition. Deploying with `UseCertificate=false` therefore fails on the
//! dangling `Ref PublicALB`; [`Template::diagnostics`] reports each one.
//!
//! [`Template::diagnostics`]: crate::template::Template::diagnostics

use super::shared_infra::SharedInfraExports;
use super::{ExportRef, ExportedTargetGroup, Stack};
use crate::config::LoadBalancerConfig;
use crate::domain::ResourceType;
use crate::errors::StackResult;
use crate::resources::ec2::{EgressRule, IngressRule, SecurityGroupProperties};
use crate::resources::elbv2::{
    ListenerAction, ListenerProperties, LoadBalancerProperties, Protocol, TargetGroupProperties,
    TargetType,
};
use crate::template::{flag_parameter, ConditionExpr, Expr, Output, Parameter, Resource};

/// Gate of the ALB
pub const CERTIFICATE_CONDITION: &str = "UseCertificateCondition";

/// Fixed export name of the ALB DNS name
pub const DNS_EXPORT: &str = "PUBLoadBalancerDNSName";

pub(crate) const LOAD_BALANCER_ID: &str = "PublicALB";
pub(crate) const SECURITY_GROUP_ID: &str = "PublicALBSecurityGroup";
const REDIRECT_LISTENER_ID: &str = "PublicALBRedirect80To443";
const HTTPS_LISTENER_ID: &str = "PublicALBHTTPSListener";
const TARGET_GROUP_ID: &str = "HttpsTargetGroup";

/// What the front end offers service stacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerExports {
    pub dns_name: ExportRef,
    /// HTTPS listener service rules attach to
    pub listener_arn: ExportRef,
    pub target_group: ExportedTargetGroup,
    pub security_group_id: ExportRef,
}

#[derive(Debug, Clone)]
pub struct LoadBalancerStack {
    pub stack: Stack,
    pub exports: LoadBalancerExports,
}

/// Security group for an internet-facing ALB open on `ports`
pub(crate) fn alb_security_group(vpc_id: Expr, ports: &[u16]) -> SecurityGroupProperties {
    SecurityGroupProperties {
        group_description: "Automatically created Security Group for ELB".to_string(),
        vpc_id,
        security_group_ingress: ports.iter().copied().map(IngressRule::open_tcp).collect(),
        security_group_egress: vec![EgressRule::allow_all()],
    }
}

impl LoadBalancerStack {
    pub fn new(config: &LoadBalancerConfig, infra: &SharedInfraExports) -> StackResult<Self> {
        let mut stack = Stack::new(config.stack_id.clone());

        let template = stack.template_mut();
        template.set_description("Public ALB with HTTP to HTTPS redirect and a default target group");
        template.add_parameter("CertificateArn", Parameter::string("use certificate"))?;
        template.add_parameter("UseCertificate", flag_parameter("use certificate", false))?;
        template.add_condition(
            CERTIFICATE_CONDITION,
            ConditionExpr::parameter_equals("true", "UseCertificate"),
        )?;

        template.add_resource(
            SECURITY_GROUP_ID,
            Resource::new(
                ResourceType::SecurityGroup,
                &alb_security_group(infra.vpc_id.import(), &[80, 443]),
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
            )?
            .with_condition(CERTIFICATE_CONDITION),
        )?;

        // Declared regardless of the certificate flag
        template.add_resource(
            REDIRECT_LISTENER_ID,
            Resource::new(
                ResourceType::Listener,
                &ListenerProperties::new(
                    Expr::reference(LOAD_BALANCER_ID),
                    80,
                    Protocol::Http,
                    ListenerAction::redirect(Protocol::Https, 443),
                ),
            )?,
        )?;

        template.add_resource(
            TARGET_GROUP_ID,
            Resource::new(
                ResourceType::TargetGroup,
                &TargetGroupProperties::new(
                    infra.vpc_id.import(),
                    80,
                    Protocol::Http,
                    TargetType::Ip,
                )
                .named(TARGET_GROUP_ID),
            )?,
        )?;
        template.add_resource(
            HTTPS_LISTENER_ID,
            Resource::new(
                ResourceType::Listener,
                &ListenerProperties::new(
                    Expr::reference(LOAD_BALANCER_ID),
                    443,
                    Protocol::Https,
                    ListenerAction::forward(Expr::reference(TARGET_GROUP_ID)),
                )
                .with_certificate(Expr::reference("CertificateArn")),
            )?,
        )?;

        let dns_name = stack.export(
            "LoadBalancerDNS",
            DNS_EXPORT,
            Output::new(Expr::get_att(LOAD_BALANCER_ID, "DNSName")),
        )?;
        let listener_arn = stack.export_qualified(
            "ListenerArn",
            Output::new(Expr::reference(HTTPS_LISTENER_ID)).description("HTTPS listener"),
        )?;
        let target_group_arn = stack.export_qualified(
            "TargetGroupArn",
            Output::new(Expr::reference(TARGET_GROUP_ID)).description("Default target group"),
        )?;
        let security_group_id = stack.export_qualified(
            "SecurityGroupId",
            Output::new(Expr::get_att(SECURITY_GROUP_ID, "GroupId"))
                .description("Load balancer security group"),
        )?;

        Ok(Self {
            stack,
            exports: LoadBalancerExports {
                dns_name,
                listener_arn,
                target_group: ExportedTargetGroup {
                    arn: target_group_arn,
                    target_type: TargetType::Ip,
                },
                security_group_id,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InfraConfig;
    use crate::diagnostics::DiagnosticKind;
    use crate::stacks::SharedInfraStack;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn build() -> LoadBalancerStack {
        let infra = SharedInfraStack::new(&InfraConfig::default()).unwrap();
        LoadBalancerStack::new(&LoadBalancerConfig::default(), &infra.exports).unwrap()
    }

    #[test]
    fn test_listeners_and_target_group() {
        let lb = build();
        let template = lb.stack.template();
        template.check_references().unwrap();

        assert_eq!(template.resources_of_type(ResourceType::LoadBalancer).len(), 1);
        assert_eq!(template.resources_of_type(ResourceType::Listener).len(), 2);
        assert_eq!(template.resources_of_type(ResourceType::TargetGroup).len(), 1);

        let https = template.resource(HTTPS_LISTENER_ID).unwrap();
        assert_eq!(https.properties["Port"], json!(443));
        assert_eq!(
            https.properties["Certificates"],
            json!([{ "CertificateArn": { "Ref": "CertificateArn" } }])
        );
        assert_eq!(
            https.properties["DefaultActions"][0]["TargetGroupArn"],
            json!({ "Ref": "HttpsTargetGroup" })
        );

        let tg = template.resource(TARGET_GROUP_ID).unwrap();
        assert_eq!(tg.properties["TargetType"], json!("ip"));
        assert_eq!(tg.properties["Name"], json!("HttpsTargetGroup"));
    }

    #[test]
    fn test_only_alb_is_gated() {
        let lb = build();
        let template = lb.stack.template();
        let gated: Vec<&str> = template
            .resources()
            .iter()
            .filter(|(_, r)| r.condition.is_some())
            .map(|(id, _)| id.as_str())
            .collect();
        assert_eq!(gated, vec![LOAD_BALANCER_ID]);
    }

    #[test]
    fn test_unguarded_alb_references_reported() {
        let lb = build();
        let flagged: Vec<String> = lb
            .stack
            .template()
            .diagnostics()
            .into_iter()
            .filter(|d| matches!(d.kind, DiagnosticKind::UnguardedConditionalReference { .. }))
            .map(|d| d.logical_id)
            .collect();
        assert_eq!(
            flagged,
            vec!["LoadBalancerDNS", HTTPS_LISTENER_ID, REDIRECT_LISTENER_ID]
        );
    }

    #[test]
    fn test_exports() {
        let lb = build();
        assert_eq!(lb.exports.dns_name.name(), "PUBLoadBalancerDNSName");
        assert_eq!(
            lb.exports.listener_arn.name(),
            "SplitAtTargetGroup-LBStack:ListenerArn"
        );
        assert_eq!(lb.exports.target_group.handle().target_type, TargetType::Ip);
    }
}
