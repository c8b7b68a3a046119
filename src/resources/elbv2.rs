// Copyright (c) 2025 - Cowboy AI, Inc.
//! Application Load Balancer resource properties
//!
//! The routing chain is load balancer → listener → target group → targets.
//! Two invariants are carried by the types here:
//!
//! - a listener always has exactly one default action ([`ListenerProperties::new`]
//!   takes it by value, there is no empty constructor)
//! - a target is registered only into a target group of its own kind
//!   ([`TargetGroupHandle::register`])

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::invariants::validate_target_type;
use crate::domain::ValidationResult;
use crate::template::Expr;

/// What a target group routes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Instance,
    /// awsvpc tasks, Fargate included
    Ip,
    Lambda,
    Alb,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Instance => "instance",
            Self::Ip => "ip",
            Self::Lambda => "lambda",
            Self::Alb => "alb",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Http,
    Https,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoadBalancerProperties {
    pub load_balancer_attributes: Vec<Attribute>,
    pub scheme: &'static str,
    pub security_groups: Vec<Expr>,
    pub subnets: Vec<Expr>,
    #[serde(rename = "Type")]
    pub load_balancer_type: &'static str,
}

impl LoadBalancerProperties {
    pub fn internet_facing(subnets: Vec<Expr>, security_groups: Vec<Expr>) -> Self {
        Self {
            load_balancer_attributes: vec![Attribute {
                key: "deletion_protection.enabled".to_string(),
                value: "false".to_string(),
            }],
            scheme: "internet-facing",
            security_groups,
            subnets,
            load_balancer_type: "application",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RedirectConfig {
    pub port: String,
    pub protocol: Protocol,
    pub status_code: &'static str,
}

/// Rendered listener or rule action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Action {
    #[serde(rename = "Type")]
    pub action_type: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_group_arn: Option<Expr>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_config: Option<RedirectConfig>,
}

/// What a listener or rule does with matching traffic
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerAction {
    Forward { target_group_arn: Expr },
    Redirect { protocol: Protocol, port: u16 },
}

impl ListenerAction {
    pub fn forward(target_group_arn: Expr) -> Self {
        Self::Forward { target_group_arn }
    }

    pub fn redirect(protocol: Protocol, port: u16) -> Self {
        Self::Redirect { protocol, port }
    }

    pub fn to_action(&self) -> Action {
        match self {
            Self::Forward { target_group_arn } => Action {
                action_type: "forward",
                target_group_arn: Some(target_group_arn.clone()),
                redirect_config: None,
            },
            Self::Redirect { protocol, port } => Action {
                action_type: "redirect",
                target_group_arn: None,
                redirect_config: Some(RedirectConfig {
                    port: port.to_string(),
                    protocol: *protocol,
                    status_code: "HTTP_301",
                }),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Certificate {
    pub certificate_arn: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListenerProperties {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub certificates: Vec<Certificate>,
    pub default_actions: Vec<Action>,
    pub load_balancer_arn: Expr,
    pub port: u16,
    pub protocol: Protocol,
}

impl ListenerProperties {
    pub fn new(
        load_balancer_arn: Expr,
        port: u16,
        protocol: Protocol,
        default_action: ListenerAction,
    ) -> Self {
        Self {
            certificates: Vec::new(),
            default_actions: vec![default_action.to_action()],
            load_balancer_arn,
            port,
            protocol,
        }
    }

    pub fn with_certificate(mut self, certificate_arn: Expr) -> Self {
        self.certificates.push(Certificate { certificate_arn });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TargetGroupProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_path: Option<Expr>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_port: Option<Expr>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Expr>,

    pub port: u16,
    pub protocol: Protocol,
    pub target_type: TargetType,
    pub vpc_id: Expr,
}

impl TargetGroupProperties {
    pub fn new(vpc_id: Expr, port: u16, protocol: Protocol, target_type: TargetType) -> Self {
        Self {
            health_check_path: None,
            health_check_port: None,
            name: None,
            port,
            protocol,
            target_type,
            vpc_id,
        }
    }

    pub fn named(mut self, name: impl Into<Expr>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn health_check(mut self, path: Expr, port: Expr) -> Self {
        self.health_check_path = Some(path);
        self.health_check_port = Some(port);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostHeaderConfig {
    pub values: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuleCondition {
    pub field: &'static str,
    pub host_header_config: HostHeaderConfig,
}

impl RuleCondition {
    /// Match on the `Host` header; `values` must resolve to a list
    pub fn host_header(values: Expr) -> Self {
        Self {
            field: "host-header",
            host_header_config: HostHeaderConfig { values },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListenerRuleProperties {
    pub actions: Vec<Action>,
    pub conditions: Vec<RuleCondition>,
    pub listener_arn: Expr,
    pub priority: Expr,
}

impl ListenerRuleProperties {
    pub fn new(
        listener_arn: Expr,
        priority: Expr,
        condition: RuleCondition,
        action: ListenerAction,
    ) -> Self {
        Self {
            actions: vec![action.to_action()],
            conditions: vec![condition],
            listener_arn,
            priority,
        }
    }
}

/// Something a target group can route to
pub trait LoadBalancerTarget {
    /// Kind of target this registers as
    fn target_type(&self) -> TargetType;

    /// Record the registration on the target's own declaration
    fn attach(&mut self, target_group_arn: Expr);
}

/// A target group as seen by the code that registers targets into it,
/// whether declared in the same stack or imported from another
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGroupHandle {
    /// Logical id or export name, for error messages
    pub name: String,
    pub arn: Expr,
    pub target_type: TargetType,
}

impl TargetGroupHandle {
    pub fn new(name: impl Into<String>, arn: Expr, target_type: TargetType) -> Self {
        Self {
            name: name.into(),
            arn,
            target_type,
        }
    }

    /// Register `target` into this target group
    pub fn register<T: LoadBalancerTarget>(&self, target: &mut T) -> ValidationResult {
        validate_target_type(&self.name, self.target_type, target.target_type())?;
        target.attach(self.arn.clone());
        Ok(())
    }
}
