// Copyright (c) 2025 - Cowboy AI, Inc.
//! CloudFormation Template Model
//!
//! A [`Template`] is the declarative artifact one stack synthesizes to. Every
//! section is a `BTreeMap`, so rendering the same template twice yields the
//! same bytes.
//!
//! Resource properties are stored as rendered JSON. That keeps the model
//! closed over every resource type and lets the reference walker, the
//! diagnostics and the deploy preview work on exactly what the engine sees.

pub mod evaluate;
pub mod intrinsic;
pub mod parameter;

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::domain::ResourceType;
use crate::errors::{StackError, StackResult};

pub use evaluate::{Evaluator, ParameterValues};
pub use intrinsic::{sub_variables, ConditionExpr, Expr};
pub use parameter::{flag_parameter, Parameter, ParameterType};

/// Template format version every template declares
pub const FORMAT_VERSION: &str = "2010-09-09";

/// One declared resource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: ResourceType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(skip_serializing_if = "Value::is_null")]
    pub properties: Value,
}

impl Resource {
    /// Declare a resource from a typed property struct
    pub fn new<P: Serialize>(resource_type: ResourceType, properties: &P) -> StackResult<Self> {
        Ok(Self {
            resource_type,
            condition: None,
            depends_on: Vec::new(),
            properties: serde_json::to_value(properties)?,
        })
    }

    /// Gate the resource on a declared condition
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }
}

/// Export name of an output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Export {
    pub name: String,
}

/// One declared output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub value: Expr,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<Export>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Output {
    pub fn new(value: Expr) -> Self {
        Self {
            description: None,
            value,
            export: None,
            condition: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn export(mut self, name: impl Into<String>) -> Self {
        self.export = Some(Export { name: name.into() });
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

/// A name found while walking template JSON
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reference {
    /// `Ref` or a `${Name}` in `Fn::Sub`
    Ref(String),
    /// `Fn::GetAtt` or a `${Name.Attr}` in `Fn::Sub`
    GetAtt(String),
    /// `Fn::ImportValue` with a literal export name
    Import(String),
    /// Condition named by `Fn::If` or `{"Condition": ..}`
    Condition(String),
}

/// A reference and whether it sits inside an `Fn::If` branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundReference {
    pub reference: Reference,
    pub guarded: bool,
}

/// Collect every reference in a JSON value
pub fn references(value: &Value) -> Vec<FoundReference> {
    let mut found = Vec::new();
    walk(value, false, &mut found);
    found
}

fn walk(value: &Value, guarded: bool, found: &mut Vec<FoundReference>) {
    match value {
        Value::Array(items) => {
            for item in items {
                walk(item, guarded, found);
            }
        }
        Value::Object(map) => {
            if let (1, Some((key, arg))) = (map.len(), map.iter().next()) {
                if walk_intrinsic(key, arg, guarded, found) {
                    return;
                }
            }
            for item in map.values() {
                walk(item, guarded, found);
            }
        }
        _ => {}
    }
}

/// Returns false when `key` is not an intrinsic this walker understands
fn walk_intrinsic(key: &str, arg: &Value, guarded: bool, found: &mut Vec<FoundReference>) -> bool {
    let reference = match (key, arg) {
        ("Ref", Value::String(id)) => Reference::Ref(id.clone()),
        ("Fn::ImportValue", Value::String(name)) => Reference::Import(name.clone()),
        ("Condition", Value::String(name)) => Reference::Condition(name.clone()),
        ("Fn::GetAtt", Value::Array(parts)) => match parts.first() {
            Some(Value::String(id)) => Reference::GetAtt(id.clone()),
            _ => return false,
        },
        ("Fn::Sub", Value::String(template)) => {
            for var in sub_variables(template) {
                let reference = match var.split_once('.') {
                    Some((id, _)) => Reference::GetAtt(id.to_string()),
                    None => Reference::Ref(var.to_string()),
                };
                found.push(FoundReference { reference, guarded });
            }
            return true;
        }
        ("Fn::If", Value::Array(parts)) => {
            if let Some(Value::String(cond)) = parts.first() {
                found.push(FoundReference {
                    reference: Reference::Condition(cond.clone()),
                    guarded,
                });
            }
            for branch in parts.iter().skip(1) {
                walk(branch, true, found);
            }
            return true;
        }
        _ => return false,
    };
    found.push(FoundReference { reference, guarded });
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Conditions,
    Resources,
    Outputs,
}

fn is_pseudo_parameter(id: &str) -> bool {
    id.starts_with("AWS::")
}

/// CloudFormation template under construction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(skip)]
    stack: String,

    #[serde(rename = "AWSTemplateFormatVersion")]
    format_version: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, Value>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    parameters: BTreeMap<String, Parameter>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    conditions: BTreeMap<String, ConditionExpr>,

    resources: BTreeMap<String, Resource>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    outputs: BTreeMap<String, Output>,
}

impl Template {
    /// Empty template for the named stack
    pub fn new(stack: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            format_version: FORMAT_VERSION,
            description: None,
            metadata: BTreeMap::new(),
            parameters: BTreeMap::new(),
            conditions: BTreeMap::new(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    fn duplicate(&self, logical_id: &str) -> StackError {
        StackError::DuplicateLogicalId {
            stack: self.stack.clone(),
            logical_id: logical_id.to_string(),
        }
    }

    fn check_logical_id(&self, logical_id: &str) -> StackResult<()> {
        if logical_id.is_empty() || !logical_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StackError::Configuration(format!(
                "logical id '{logical_id}' in stack {} must be non-empty and alphanumeric",
                self.stack
            )));
        }
        Ok(())
    }

    /// Parameters and resources share the `Ref` namespace
    pub fn add_parameter(&mut self, logical_id: &str, parameter: Parameter) -> StackResult<()> {
        self.check_logical_id(logical_id)?;
        if self.parameters.contains_key(logical_id) || self.resources.contains_key(logical_id) {
            return Err(self.duplicate(logical_id));
        }
        self.parameters.insert(logical_id.to_string(), parameter);
        Ok(())
    }

    pub fn add_condition(&mut self, logical_id: &str, condition: ConditionExpr) -> StackResult<()> {
        self.check_logical_id(logical_id)?;
        if self.conditions.contains_key(logical_id) {
            return Err(self.duplicate(logical_id));
        }
        self.conditions.insert(logical_id.to_string(), condition);
        Ok(())
    }

    pub fn add_resource(&mut self, logical_id: &str, resource: Resource) -> StackResult<()> {
        self.check_logical_id(logical_id)?;
        if self.parameters.contains_key(logical_id) || self.resources.contains_key(logical_id) {
            return Err(self.duplicate(logical_id));
        }
        debug!(
            stack = %self.stack,
            logical_id,
            resource_type = %resource.resource_type,
            condition = resource.condition.as_deref().unwrap_or("-"),
            "declared resource"
        );
        self.resources.insert(logical_id.to_string(), resource);
        Ok(())
    }

    pub fn add_output(&mut self, logical_id: &str, output: Output) -> StackResult<()> {
        self.check_logical_id(logical_id)?;
        if self.outputs.contains_key(logical_id) {
            return Err(self.duplicate(logical_id));
        }
        self.outputs.insert(logical_id.to_string(), output);
        Ok(())
    }

    pub fn parameters(&self) -> &BTreeMap<String, Parameter> {
        &self.parameters
    }

    pub fn parameter(&self, logical_id: &str) -> Option<&Parameter> {
        self.parameters.get(logical_id)
    }

    pub fn conditions(&self) -> &BTreeMap<String, ConditionExpr> {
        &self.conditions
    }

    pub fn resources(&self) -> &BTreeMap<String, Resource> {
        &self.resources
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    pub fn outputs(&self) -> &BTreeMap<String, Output> {
        &self.outputs
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Resources of one type, in logical-id order
    pub fn resources_of_type(&self, resource_type: ResourceType) -> Vec<(&str, &Resource)> {
        self.resources
            .iter()
            .filter(|(_, r)| r.resource_type == resource_type)
            .map(|(id, r)| (id.as_str(), r))
            .collect()
    }

    /// Export names declared by this template, with each output's condition
    pub fn exports(&self) -> Vec<(String, Option<String>)> {
        self.outputs
            .values()
            .filter_map(|o| o.export.as_ref().map(|e| (e.name.clone(), o.condition.clone())))
            .collect()
    }

    /// Export names this template imports
    pub fn imports(&self) -> BTreeSet<String> {
        self.all_references()
            .into_iter()
            .filter_map(|(_, _, found)| match found.reference {
                Reference::Import(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// `(logical id, export name)` for every import outside an `Fn::If` branch
    pub fn import_sites(&self) -> Vec<(String, String)> {
        let mut sites: Vec<_> = self
            .all_references()
            .into_iter()
            .filter_map(|(_, id, found)| match found.reference {
                Reference::Import(name) if !found.guarded => Some((id, name)),
                _ => None,
            })
            .collect();
        sites.sort();
        sites.dedup();
        sites
    }

    /// Every reference, with the section and logical id of the declaring item
    fn all_references(&self) -> Vec<(Section, String, FoundReference)> {
        let mut all = Vec::new();
        for (id, condition) in &self.conditions {
            for found in references(&condition.to_value()) {
                all.push((Section::Conditions, id.clone(), found));
            }
        }
        for (id, resource) in &self.resources {
            for found in references(&resource.properties) {
                all.push((Section::Resources, id.clone(), found));
            }
        }
        for (id, output) in &self.outputs {
            for found in references(&output.value.to_value()) {
                all.push((Section::Outputs, id.clone(), found));
            }
        }
        all
    }

    /// Every `Ref`, `Fn::GetAtt`, condition name and `DependsOn` must name
    /// something this template declares
    pub fn check_references(&self) -> StackResult<()> {
        let unresolved = |logical_id: &str, target: &str| StackError::UnresolvedReference {
            stack: self.stack.clone(),
            logical_id: logical_id.to_string(),
            target: target.to_string(),
        };

        for (section, id, found) in self.all_references() {
            let ok = match &found.reference {
                Reference::Ref(target) => {
                    is_pseudo_parameter(target)
                        || self.parameters.contains_key(target)
                        || (section != Section::Conditions && self.resources.contains_key(target))
                }
                Reference::GetAtt(target) => self.resources.contains_key(target),
                Reference::Condition(name) => self.conditions.contains_key(name),
                Reference::Import(_) => true,
            };
            if !ok {
                let target = match found.reference {
                    Reference::Ref(t)
                    | Reference::GetAtt(t)
                    | Reference::Condition(t)
                    | Reference::Import(t) => t,
                };
                return Err(unresolved(&id, &target));
            }
        }

        for (id, resource) in &self.resources {
            if let Some(cond) = &resource.condition {
                if !self.conditions.contains_key(cond) {
                    return Err(unresolved(id, cond));
                }
            }
            for dep in &resource.depends_on {
                if !self.resources.contains_key(dep) {
                    return Err(unresolved(id, dep));
                }
            }
        }

        for (id, output) in &self.outputs {
            if let Some(cond) = &output.condition {
                if !self.conditions.contains_key(cond) {
                    return Err(unresolved(id, cond));
                }
            }
        }

        Ok(())
    }

    /// Findings that are legal template syntax but likely deploy-time defects
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut referenced = BTreeSet::new();

        let declared_condition = |section: Section, id: &str| -> Option<&String> {
            match section {
                Section::Resources => self.resources.get(id).and_then(|r| r.condition.as_ref()),
                Section::Outputs => self.outputs.get(id).and_then(|o| o.condition.as_ref()),
                Section::Conditions => None,
            }
        };

        for (section, id, found) in self.all_references() {
            let target = match &found.reference {
                Reference::Ref(t) | Reference::GetAtt(t) => t,
                _ => continue,
            };
            referenced.insert(target.clone());

            if found.guarded || section == Section::Conditions {
                continue;
            }
            let Some(target_condition) = self.resources.get(target).and_then(|r| r.condition.as_ref())
            else {
                continue;
            };
            if declared_condition(section, &id) != Some(target_condition) {
                diagnostics.push(Diagnostic {
                    stack: self.stack.clone(),
                    logical_id: id.clone(),
                    kind: DiagnosticKind::UnguardedConditionalReference {
                        target: target.clone(),
                        condition: target_condition.clone(),
                    },
                });
            }
        }

        // DependsOn on a conditional resource fails the same way a Ref does
        for (id, resource) in &self.resources {
            for dep in &resource.depends_on {
                let Some(dep_condition) = self.resources.get(dep).and_then(|r| r.condition.as_ref())
                else {
                    continue;
                };
                if resource.condition.as_ref() != Some(dep_condition) {
                    diagnostics.push(Diagnostic {
                        stack: self.stack.clone(),
                        logical_id: id.clone(),
                        kind: DiagnosticKind::UnguardedConditionalReference {
                            target: dep.clone(),
                            condition: dep_condition.clone(),
                        },
                    });
                }
            }
        }

        for name in self.parameters.keys() {
            if !referenced.contains(name) {
                diagnostics.push(Diagnostic {
                    stack: self.stack.clone(),
                    logical_id: name.clone(),
                    kind: DiagnosticKind::InertParameter,
                });
            }
        }

        diagnostics.sort();
        diagnostics.dedup();
        diagnostics
    }

    /// Render as template JSON
    pub fn to_value(&self) -> StackResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Render as pretty-printed template JSON with a trailing newline
    pub fn to_json_pretty(&self) -> StackResult<String> {
        let mut rendered = serde_json::to_string_pretty(&self.to_value()?)?;
        rendered.push('\n');
        Ok(rendered)
    }
}
