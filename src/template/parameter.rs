// Copyright (c) 2025 - Cowboy AI, Inc.
//! Template parameters

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CloudFormation parameter type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    String,
    Number,
    CommaDelimitedList,
}

/// A deploy-time input with its constraints
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub parameter_type: ParameterType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_pattern: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint_description: Option<String>,
}

impl Parameter {
    fn new(parameter_type: ParameterType, description: impl Into<String>) -> Self {
        Self {
            parameter_type,
            default: None,
            description: Some(description.into()),
            allowed_values: Vec::new(),
            allowed_pattern: None,
            min_value: None,
            max_value: None,
            constraint_description: None,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(ParameterType::String, description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::new(ParameterType::Number, description)
    }

    pub fn comma_delimited_list(description: impl Into<String>) -> Self {
        Self::new(ParameterType::CommaDelimitedList, description)
    }

    /// String default (also used for lists, comma-joined)
    pub fn default_str(mut self, default: impl Into<String>) -> Self {
        self.default = Some(Value::String(default.into()));
        self
    }

    pub fn default_number(mut self, default: i64) -> Self {
        self.default = Some(Value::from(default));
        self
    }

    pub fn allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn allowed_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.allowed_pattern = Some(pattern.into());
        self
    }

    pub fn min_value(mut self, min: i64) -> Self {
        self.min_value = Some(min);
        self
    }

    pub fn max_value(mut self, max: i64) -> Self {
        self.max_value = Some(max);
        self
    }

    pub fn constraint_description(mut self, text: impl Into<String>) -> Self {
        self.constraint_description = Some(text.into());
        self
    }

    /// Default rendered the way the engine passes values around
    pub fn default_as_string(&self) -> Option<String> {
        match &self.default {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        }
    }
}

/// Boolean flag parameter: `"true"`/`"false"` with a default
pub fn flag_parameter(description: impl Into<String>, default: bool) -> Parameter {
    Parameter::string(description)
        .default_str(default.to_string())
        .allowed_values(["true", "false"])
}
