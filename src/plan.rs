// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deploy preview
//!
//! What the engine would create for one stack given concrete parameter
//! values. Anything only the engine can know is shown as deferred.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::{ResourceType, ValidationError};
use crate::template::{Evaluator, ParameterValues, Template};

/// Property keys tried in order when naming a planned resource
const NAME_PROPERTIES: [&str; 4] = ["ClusterName", "ServiceName", "RoleName", "Name"];

/// A resource the engine would create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedResource {
    pub logical_id: String,
    pub resource_type: ResourceType,
    /// Physical name, when parameters alone decide it
    pub name: Option<String>,
}

/// An output and its value, `None` when deferred
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedOutput {
    pub logical_id: String,
    pub value: Option<String>,
    pub export: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub stack: String,
    pub parameters: BTreeMap<String, Value>,
    pub conditions: BTreeMap<String, bool>,
    pub resources: Vec<PlannedResource>,
    /// `(logical id, condition)` of resources the engine would skip
    pub skipped: Vec<(String, String)>,
    pub outputs: Vec<PlannedOutput>,
}

fn tag_name(properties: &Value) -> Option<&Value> {
    properties
        .get("Tags")?
        .as_array()?
        .iter()
        .find(|tag| tag.get("Key").and_then(Value::as_str) == Some("Name"))?
        .get("Value")
}

impl Plan {
    pub fn new(template: &Template, values: &ParameterValues) -> Result<Self, ValidationError> {
        let eval = Evaluator::new(template, values)?;

        let mut resources = Vec::new();
        let mut skipped = Vec::new();
        for (logical_id, resource) in template.resources() {
            if !eval.is_materialized(resource) {
                if let Some(condition) = &resource.condition {
                    skipped.push((logical_id.clone(), condition.clone()));
                }
                continue;
            }

            let name = NAME_PROPERTIES
                .iter()
                .find_map(|key| resource.properties.get(*key))
                .or_else(|| tag_name(&resource.properties))
                .and_then(|value| eval.resolve_string(value));

            resources.push(PlannedResource {
                logical_id: logical_id.clone(),
                resource_type: resource.resource_type,
                name,
            });
        }

        let outputs = template
            .outputs()
            .iter()
            .filter(|(_, output)| {
                output
                    .condition
                    .as_ref()
                    .map_or(true, |cond| eval.condition(cond).unwrap_or(false))
            })
            .map(|(logical_id, output)| PlannedOutput {
                logical_id: logical_id.clone(),
                value: eval.resolve_string(&output.value.to_value()),
                export: output.export.as_ref().map(|e| e.name.clone()),
            })
            .collect();

        Ok(Self {
            stack: template.stack().to_string(),
            parameters: eval.parameters().clone(),
            conditions: eval.conditions().clone(),
            resources,
            skipped,
            outputs,
        })
    }

    pub fn resource(&self, logical_id: &str) -> Option<&PlannedResource> {
        self.resources.iter().find(|r| r.logical_id == logical_id)
    }

    pub fn count_of(&self, resource_type: ResourceType) -> usize {
        self.resources
            .iter()
            .filter(|r| r.resource_type == resource_type)
            .count()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stack {}", self.stack)?;
        for (name, value) in &self.conditions {
            writeln!(f, "  condition {name} = {value}")?;
        }
        for resource in &self.resources {
            match &resource.name {
                Some(name) => writeln!(
                    f,
                    "  + {} ({}) {}",
                    resource.logical_id, resource.resource_type, name
                )?,
                None => writeln!(f, "  + {} ({})", resource.logical_id, resource.resource_type)?,
            }
        }
        for (logical_id, condition) in &self.skipped {
            writeln!(f, "  - {logical_id} (skipped, {condition} is false)")?;
        }
        for output in &self.outputs {
            let value = output.value.as_deref().unwrap_or("<deferred>");
            writeln!(f, "  output {} = {}", output.logical_id, value)?;
        }
        Ok(())
    }
}
