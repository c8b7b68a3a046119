// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deploy-time evaluation of a template against concrete parameter values
//!
//! Mirrors what the provisioning engine does before it creates anything:
//! validate parameters, decide every condition, resolve intrinsics. Values
//! only the engine can know (attributes of created resources, imports,
//! pseudo parameters) are left as `{"Deferred": "<what>"}` markers.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

use super::{ConditionExpr, ParameterType, Resource, Template};
use crate::domain::invariants::validate_parameter_value;
use crate::domain::ValidationError;

/// Parameter values supplied at deploy time, as the engine receives them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterValues(BTreeMap<String, String>);

impl ParameterValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Marker for a value only the engine can resolve
pub fn deferred(what: impl Into<String>) -> Value {
    json!({ "Deferred": what.into() })
}

/// Whether `value` is a [`deferred`] marker
pub fn is_deferred(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.len() == 1 && map.contains_key("Deferred"))
}

fn contains_deferred(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().any(contains_deferred),
        Value::Object(map) => is_deferred(value) || map.values().any(contains_deferred),
        _ => false,
    }
}

/// Scalar rendering the engine uses when a value lands in a string
fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(scalar_string).collect::<Vec<_>>().join(","),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Template evaluated against one set of parameter values
#[derive(Debug, Clone)]
pub struct Evaluator {
    parameters: BTreeMap<String, Value>,
    conditions: BTreeMap<String, bool>,
}

impl Evaluator {
    /// Validate `supplied` against the template and decide every condition
    pub fn new(template: &Template, supplied: &ParameterValues) -> Result<Self, ValidationError> {
        if let Some((name, _)) = supplied
            .iter()
            .find(|(name, _)| template.parameter(name).is_none())
        {
            return Err(ValidationError::UnknownParameter(name.clone()));
        }

        let mut parameters = BTreeMap::new();
        for (name, parameter) in template.parameters() {
            let raw = supplied
                .get(name)
                .map(str::to_string)
                .or_else(|| parameter.default_as_string())
                .ok_or_else(|| ValidationError::MissingParameter(name.clone()))?;

            validate_parameter_value(name, parameter, &raw)?;

            let value = match parameter.parameter_type {
                ParameterType::CommaDelimitedList => Value::Array(
                    raw.split(',')
                        .map(|item| Value::String(item.trim().to_string()))
                        .collect(),
                ),
                // Ref to a Number parameter yields its string form
                ParameterType::String | ParameterType::Number => Value::String(raw),
            };
            parameters.insert(name.clone(), value);
        }

        let mut evaluator = Self {
            parameters,
            conditions: BTreeMap::new(),
        };

        let mut visiting = BTreeSet::new();
        for name in template.conditions().keys() {
            evaluator.evaluate_named(template, name, &mut visiting)?;
        }

        Ok(evaluator)
    }

    fn evaluate_named(
        &mut self,
        template: &Template,
        name: &str,
        visiting: &mut BTreeSet<String>,
    ) -> Result<bool, ValidationError> {
        if let Some(&known) = self.conditions.get(name) {
            return Ok(known);
        }
        if !visiting.insert(name.to_string()) {
            return Err(ValidationError::ConditionCycle(name.to_string()));
        }

        let expr = template
            .conditions()
            .get(name)
            .ok_or_else(|| ValidationError::UnresolvableCondition(name.to_string()))?
            .clone();
        let result = self.evaluate_expr(template, name, &expr, visiting)?;

        visiting.remove(name);
        self.conditions.insert(name.to_string(), result);
        Ok(result)
    }

    fn evaluate_expr(
        &mut self,
        template: &Template,
        name: &str,
        expr: &ConditionExpr,
        visiting: &mut BTreeSet<String>,
    ) -> Result<bool, ValidationError> {
        match expr {
            ConditionExpr::Equals(a, b) => {
                let a = self.resolve(&a.to_value());
                let b = self.resolve(&b.to_value());
                if contains_deferred(&a) || contains_deferred(&b) {
                    return Err(ValidationError::UnresolvableCondition(name.to_string()));
                }
                Ok(scalar_string(&a) == scalar_string(&b))
            }
            ConditionExpr::Not(inner) => Ok(!self.evaluate_expr(template, name, inner, visiting)?),
            ConditionExpr::And(items) => {
                for item in items {
                    if !self.evaluate_expr(template, name, item, visiting)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ConditionExpr::Or(items) => {
                for item in items {
                    if self.evaluate_expr(template, name, item, visiting)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            ConditionExpr::Condition(other) => self.evaluate_named(template, other, visiting),
        }
    }

    /// Resolved parameter value
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    pub fn parameters(&self) -> &BTreeMap<String, Value> {
        &self.parameters
    }

    /// Decided condition value
    pub fn condition(&self, name: &str) -> Option<bool> {
        self.conditions.get(name).copied()
    }

    pub fn conditions(&self) -> &BTreeMap<String, bool> {
        &self.conditions
    }

    /// Whether the engine would create this resource
    pub fn is_materialized(&self, resource: &Resource) -> bool {
        resource
            .condition
            .as_ref()
            .map_or(true, |cond| self.condition(cond).unwrap_or(false))
    }

    /// Resolve every intrinsic in `value` that parameter values decide.
    ///
    /// `AWS::NoValue` removes the enclosing key or list item.
    pub fn resolve(&self, value: &Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve(item))
                    .filter(|item| !item.is_null())
                    .collect(),
            ),
            Value::Object(map) => {
                if let (1, Some((key, arg))) = (map.len(), map.iter().next()) {
                    if let Some(resolved) = self.resolve_intrinsic(key, arg) {
                        return resolved;
                    }
                }
                Value::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), self.resolve(v)))
                        .filter(|(_, v)| !v.is_null())
                        .collect(),
                )
            }
            other => other.clone(),
        }
    }

    /// Resolve to a string, or `None` when the engine decides the value
    pub fn resolve_string(&self, value: &Value) -> Option<String> {
        let resolved = self.resolve(value);
        if contains_deferred(&resolved) {
            return None;
        }
        Some(scalar_string(&resolved))
    }

    fn resolve_intrinsic(&self, key: &str, arg: &Value) -> Option<Value> {
        let resolved = match (key, arg) {
            ("Ref", Value::String(id)) if id == "AWS::NoValue" => Value::Null,
            ("Ref", Value::String(id)) => match self.parameters.get(id) {
                Some(value) => value.clone(),
                None => deferred(format!("Ref {id}")),
            },
            ("Fn::GetAtt", Value::Array(parts)) => {
                let parts: Vec<String> = parts.iter().map(scalar_string).collect();
                deferred(format!("Fn::GetAtt {}", parts.join(".")))
            }
            ("Fn::ImportValue", _) => {
                deferred(format!("Fn::ImportValue {}", scalar_string(&self.resolve(arg))))
            }
            ("Fn::GetAZs", _) => deferred("Fn::GetAZs"),
            ("Fn::Sub", Value::String(template)) => self.substitute(template, &BTreeMap::new()),
            ("Fn::Sub", Value::Array(parts)) => match (parts.first(), parts.get(1)) {
                (Some(Value::String(template)), Some(Value::Object(vars))) => {
                    let vars = vars
                        .iter()
                        .map(|(k, v)| (k.clone(), self.resolve(v)))
                        .collect();
                    self.substitute(template, &vars)
                }
                _ => return None,
            },
            ("Fn::Join", Value::Array(parts)) => match (parts.first(), parts.get(1)) {
                (Some(Value::String(separator)), Some(list)) => {
                    let list = self.resolve(list);
                    match list {
                        Value::Array(items) if !items.iter().any(contains_deferred) => {
                            let items: Vec<String> = items.iter().map(scalar_string).collect();
                            Value::String(items.join(separator))
                        }
                        _ => deferred("Fn::Join"),
                    }
                }
                _ => return None,
            },
            ("Fn::Select", Value::Array(parts)) => match (parts.first(), parts.get(1)) {
                (Some(index), Some(list)) => {
                    let index = scalar_string(index).parse::<usize>().ok();
                    match (index, self.resolve(list)) {
                        (Some(i), Value::Array(items)) if i < items.len() => items[i].clone(),
                        _ => deferred("Fn::Select"),
                    }
                }
                _ => return None,
            },
            ("Fn::If", Value::Array(parts)) => match (parts.first(), parts.get(1), parts.get(2)) {
                (Some(Value::String(cond)), Some(a), Some(b)) => match self.condition(cond) {
                    Some(true) => self.resolve(a),
                    Some(false) => self.resolve(b),
                    None => deferred(format!("Fn::If {cond}")),
                },
                _ => return None,
            },
            _ => return None,
        };
        Some(resolved)
    }

    fn substitute(&self, template: &str, vars: &BTreeMap<String, Value>) -> Value {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };
            let name = &after[..end];

            if let Some(literal) = name.strip_prefix('!') {
                out.push_str("${");
                out.push_str(literal);
                out.push('}');
            } else {
                let value = vars.get(name).or_else(|| self.parameters.get(name));
                match value {
                    Some(v) if !contains_deferred(v) => out.push_str(&scalar_string(v)),
                    _ => return deferred(format!("Fn::Sub {template}")),
                }
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Value::String(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceType;
    use crate::template::{flag_parameter, Expr, Parameter};
    use pretty_assertions::assert_eq;

    fn template() -> Template {
        let mut template = Template::new("Eval");
        template
            .add_parameter(
                "Environment",
                Parameter::string("env")
                    .default_str("dev")
                    .allowed_values(["dev", "prod"]),
            )
            .unwrap();
        template
            .add_parameter("Hosts", Parameter::comma_delimited_list("hosts").default_str("a.com,b.com"))
            .unwrap();
        template
            .add_parameter("Flag", flag_parameter("flag", false))
            .unwrap();
        template
            .add_condition("FlagOn", ConditionExpr::parameter_equals("true", "Flag"))
            .unwrap();
        template
            .add_condition(
                "FlagOff",
                ConditionExpr::Not(Box::new(ConditionExpr::Condition("FlagOn".into()))),
            )
            .unwrap();
        template
            .add_resource(
                "Gated",
                Resource::new(ResourceType::Cluster, &json!({}))
                    .unwrap()
                    .with_condition("FlagOn"),
            )
            .unwrap();
        template
    }

    #[test]
    fn test_defaults_and_conditions() {
        let eval = Evaluator::new(&template(), &ParameterValues::new()).unwrap();
        assert_eq!(eval.parameter("Environment"), Some(&json!("dev")));
        assert_eq!(eval.parameter("Hosts"), Some(&json!(["a.com", "b.com"])));
        assert_eq!(eval.condition("FlagOn"), Some(false));
        assert_eq!(eval.condition("FlagOff"), Some(true));

        let gated = template().resource("Gated").cloned().unwrap();
        assert!(!eval.is_materialized(&gated));

        let on = Evaluator::new(&template(), &ParameterValues::new().with("Flag", "true")).unwrap();
        assert!(on.is_materialized(&gated));
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = Evaluator::new(&template(), &ParameterValues::new().with("Environment", "qa"))
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotAllowed { .. }));

        let err = Evaluator::new(&template(), &ParameterValues::new().with("Nope", "x")).unwrap_err();
        assert_eq!(err, ValidationError::UnknownParameter("Nope".into()));
    }

    #[test]
    fn test_missing_parameter() {
        let mut template = template();
        template
            .add_parameter("Required", Parameter::string("no default"))
            .unwrap();
        let err = Evaluator::new(&template, &ParameterValues::new()).unwrap_err();
        assert_eq!(err, ValidationError::MissingParameter("Required".into()));
    }

    #[test]
    fn test_resolve_intrinsics() {
        let eval = Evaluator::new(&template(), &ParameterValues::new().with("Environment", "prod"))
            .unwrap();

        assert_eq!(
            eval.resolve_string(&Expr::sub("${Environment}-vpc").to_value()),
            Some("prod-vpc".to_string())
        );
        assert_eq!(
            eval.resolve(&json!({ "Fn::Select": [1, { "Ref": "Hosts" }] })),
            json!("b.com")
        );
        assert_eq!(
            eval.resolve(&json!({ "Fn::Join": ["-", ["a", { "Ref": "Environment" }]] })),
            json!("a-prod")
        );
        assert_eq!(
            eval.resolve_string(&Expr::sub("${AWS::Region}-x").to_value()),
            None
        );
        assert_eq!(eval.resolve_string(&Expr::sub("${!Literal}").to_value()), Some("${Literal}".into()));
        assert!(is_deferred(&eval.resolve(&Expr::get_att("Gated", "Arn").to_value())));
    }

    #[test]
    fn test_no_value_removes_property() {
        let eval = Evaluator::new(&template(), &ParameterValues::new()).unwrap();
        let props = json!({
            "Keep": "yes",
            "Drop": { "Fn::If": ["FlagOn", "x", { "Ref": "AWS::NoValue" }] }
        });
        assert_eq!(eval.resolve(&props), json!({ "Keep": "yes" }));
    }

    #[test]
    fn test_condition_cycle_detected() {
        let mut template = Template::new("Cycle");
        template
            .add_condition("A", ConditionExpr::Condition("B".into()))
            .unwrap();
        template
            .add_condition("B", ConditionExpr::Condition("A".into()))
            .unwrap();
        let err = Evaluator::new(&template, &ParameterValues::new()).unwrap_err();
        assert!(matches!(err, ValidationError::ConditionCycle(_)));
    }
}
