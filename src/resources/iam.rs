// Copyright (c) 2025 - Cowboy AI, Inc.
//! IAM role and inline policy properties

use serde::Serialize;

use crate::template::Expr;

pub const POLICY_VERSION: &str = "2012-10-17";

/// Service principal ECS tasks assume roles as
pub const ECS_TASKS_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

/// Actions a task needs to pull from ECR and write its logs
pub const TASK_EXECUTION_ACTIONS: [&str; 6] = [
    "ecr:GetAuthorizationToken",
    "ecr:BatchCheckLayerAvailability",
    "ecr:GetDownloadUrlForLayer",
    "ecr:BatchGetImage",
    "logs:CreateLogStream",
    "logs:PutLogEvents",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Principal {
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub action: Vec<String>,
    pub effect: Effect,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl Statement {
    /// Let `service` assume the role
    pub fn assume_role(service: impl Into<String>) -> Self {
        Self {
            action: vec!["sts:AssumeRole".to_string()],
            effect: Effect::Allow,
            principal: Some(Principal {
                service: service.into(),
            }),
            resource: None,
        }
    }

    /// Allow `actions` on every resource
    pub fn allow_all_resources<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            action: actions.into_iter().map(Into::into).collect(),
            effect: Effect::Allow,
            principal: None,
            resource: Some("*".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub statement: Vec<Statement>,
    pub version: &'static str,
}

impl PolicyDocument {
    pub fn new(statement: Vec<Statement>) -> Self {
        Self {
            statement,
            version: POLICY_VERSION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleProperties {
    pub assume_role_policy_document: PolicyDocument,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<Expr>,
}

impl RoleProperties {
    pub fn assumed_by(service: impl Into<String>) -> Self {
        Self {
            assume_role_policy_document: PolicyDocument::new(vec![Statement::assume_role(service)]),
            role_name: None,
        }
    }

    pub fn named(mut self, name: Expr) -> Self {
        self.role_name = Some(name);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyProperties {
    pub policy_document: PolicyDocument,
    pub policy_name: String,
    pub roles: Vec<Expr>,
}
