// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Builders
//!
//! Each builder declares one independently deployable stack and returns it
//! with a typed handle of its exports. Downstream builders take those handles
//! as arguments, so a stack can only reference what an earlier one exported.
//!
//! ```text
//! SharedInfraStack ──► LoadBalancerStack ──► ServiceStack (one per service)
//!        │                                        ▲
//!        └────────────────────────────────────────┘
//! ```

pub mod load_balancer;
pub mod service;
pub mod shared_infra;
pub mod split;

use crate::errors::StackResult;
use crate::resources::{TargetGroupHandle, TargetType};
use crate::template::{Expr, Output, Template};

pub use load_balancer::{LoadBalancerExports, LoadBalancerStack};
pub use service::ServiceStack;
pub use shared_infra::{SharedInfraExports, SharedInfraStack};
pub use split::{SplitLoadBalancerExports, SplitLoadBalancerStack, SplitServiceStack};

/// One deployable unit: an id and the template it synthesizes to
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    id: String,
    template: Template,
}

impl Stack {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            template: Template::new(id.clone()),
            id,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub(crate) fn template_mut(&mut self) -> &mut Template {
        &mut self.template
    }

    /// Export name qualified by this stack's id
    pub fn export_name(&self, name: &str) -> String {
        format!("{}:{}", self.id, name)
    }

    /// Declare an output exported as `export_name` and return its handle
    pub(crate) fn export(
        &mut self,
        logical_id: &str,
        export_name: impl Into<String>,
        output: Output,
    ) -> StackResult<ExportRef> {
        let export = ExportRef {
            name: export_name.into(),
            condition: output.condition.clone(),
        };
        self.template
            .add_output(logical_id, output.export(export.name.clone()))?;
        Ok(export)
    }

    /// Export under `<stack id>:<logical id>`
    pub(crate) fn export_qualified(&mut self, logical_id: &str, output: Output) -> StackResult<ExportRef> {
        let name = self.export_name(logical_id);
        self.export(logical_id, name, output)
    }
}

/// A value another stack can import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRef {
    name: String,
    condition: Option<String>,
}

impl ExportRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Condition of the producing output, when the export is gated
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// `Fn::ImportValue` of this export
    pub fn import(&self) -> Expr {
        Expr::import_value(self.name.clone())
    }
}

/// Exported target group ARN together with the kind of target it accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedTargetGroup {
    pub arn: ExportRef,
    pub target_type: TargetType,
}

impl ExportedTargetGroup {
    /// Registration handle as seen from an importing stack
    pub fn handle(&self) -> TargetGroupHandle {
        TargetGroupHandle::new(self.arn.name(), self.arn.import(), self.target_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Expr;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_export_carries_condition() {
        let mut stack = Stack::new("Producer");
        let export = stack
            .export_qualified(
                "ClusterName",
                Output::new(Expr::str("c")).with_condition("EnableCreateECSCluster"),
            )
            .unwrap();

        assert_eq!(export.name(), "Producer:ClusterName");
        assert_eq!(export.condition(), Some("EnableCreateECSCluster"));
        assert_eq!(
            export.import().to_value(),
            json!({ "Fn::ImportValue": "Producer:ClusterName" })
        );
        assert_eq!(
            stack.template().exports(),
            vec![(
                "Producer:ClusterName".to_string(),
                Some("EnableCreateECSCluster".to_string())
            )]
        );
    }
}
