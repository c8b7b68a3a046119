// Copyright (c) 2025 - Cowboy AI, Inc.
//! CloudFormation intrinsic functions
//!
//! [`Expr`] is any property value: a literal or an intrinsic the engine
//! resolves at deploy time. [`ConditionExpr`] is the boolean subset allowed in
//! the `Conditions` section.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

/// A property value, literal or intrinsic
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Num(i64),
    Bool(bool),
    List(Vec<Expr>),
    /// `{"Ref": id}`, a parameter, resource or pseudo parameter
    Ref(String),
    /// `{"Fn::GetAtt": [id, attribute]}`
    GetAtt(String, String),
    /// `{"Fn::Sub": template}`
    Sub(String),
    /// `{"Fn::ImportValue": export_name}`
    ImportValue(String),
}

impl Expr {
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Self::Ref(logical_id.into())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::GetAtt(logical_id.into(), attribute.into())
    }

    pub fn sub(template: impl Into<String>) -> Self {
        Self::Sub(template.into())
    }

    pub fn import_value(export_name: impl Into<String>) -> Self {
        Self::ImportValue(export_name.into())
    }

    /// Render as template JSON
    pub fn to_value(&self) -> Value {
        match self {
            Self::Str(s) => Value::String(s.clone()),
            Self::Num(n) => json!(n),
            Self::Bool(b) => Value::Bool(*b),
            Self::List(items) => Value::Array(items.iter().map(Expr::to_value).collect()),
            Self::Ref(id) => json!({ "Ref": id }),
            Self::GetAtt(id, attr) => json!({ "Fn::GetAtt": [id, attr] }),
            Self::Sub(template) => json!({ "Fn::Sub": template }),
            Self::ImportValue(name) => json!({ "Fn::ImportValue": name }),
        }
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Self::Num(value)
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Boolean expression for the `Conditions` section
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionExpr {
    Equals(Expr, Expr),
    Not(Box<ConditionExpr>),
    And(Vec<ConditionExpr>),
    Or(Vec<ConditionExpr>),
    /// `{"Condition": name}`, another declared condition
    Condition(String),
}

impl ConditionExpr {
    /// `Fn::Equals` of a literal and a parameter, the usual flag shape
    pub fn parameter_equals(value: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::Equals(Expr::Str(value.into()), Expr::Ref(parameter.into()))
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Equals(a, b) => json!({ "Fn::Equals": [a.to_value(), b.to_value()] }),
            Self::Not(c) => json!({ "Fn::Not": [c.to_value()] }),
            Self::And(cs) => {
                let cs: Vec<Value> = cs.iter().map(ConditionExpr::to_value).collect();
                json!({ "Fn::And": cs })
            }
            Self::Or(cs) => {
                let cs: Vec<Value> = cs.iter().map(ConditionExpr::to_value).collect();
                json!({ "Fn::Or": cs })
            }
            Self::Condition(name) => json!({ "Condition": name }),
        }
    }
}

impl Serialize for ConditionExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Variable names referenced by an `Fn::Sub` template, `${!X}` escapes excluded
pub fn sub_variables(template: &str) -> Vec<&str> {
    let mut vars = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                if !name.starts_with('!') {
                    vars.push(name);
                }
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    vars
}
