// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Composition and Parameter Invariants
//!
//! All functions are pure (no side effects) and return detailed validation
//! results.
//!
//! # Invariant Categories
//!
//! 1. **Routing Invariants**: listener-rule priorities, target types
//! 2. **Parameter Invariants**: the constraints the provisioning engine
//!    enforces on deploy-time values, mirrored for local previews

use regex::Regex;
use std::collections::BTreeSet;

use crate::resources::elbv2::TargetType;
use crate::template::{Parameter, ParameterType};

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Listener rule priority outside the ALB range
    #[error("Listener rule priority {0} is out of range (must be 1-50000)")]
    InvalidPriority(u32),

    /// Two rules on one listener share a priority
    #[error("Listener rule priority {priority} is already used on listener {listener}")]
    DuplicatePriority { listener: String, priority: u32 },

    /// Target registered into a target group of another kind
    #[error("Target group {target_group} expects '{expected}' targets, got '{actual}'")]
    TargetTypeMismatch {
        target_group: String,
        expected: TargetType,
        actual: TargetType,
    },

    /// Parameter without default and without a supplied value
    #[error("Parameter {0} has no default and no value was supplied")]
    MissingParameter(String),

    /// Value supplied for a parameter the template does not declare
    #[error("Parameter {0} is not declared by the template")]
    UnknownParameter(String),

    #[error("Parameter {parameter}: '{value}' is not one of {allowed:?}")]
    NotAllowed {
        parameter: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("Parameter {parameter}: '{value}' does not match {pattern}")]
    PatternMismatch {
        parameter: String,
        value: String,
        pattern: String,
    },

    #[error("Parameter {parameter}: AllowedPattern {pattern} is not a valid expression")]
    InvalidPattern { parameter: String, pattern: String },

    #[error("Parameter {parameter}: '{value}' is not a number")]
    NotANumber { parameter: String, value: String },

    #[error("Parameter {parameter}: {value} is below the minimum {min}")]
    BelowMinimum {
        parameter: String,
        value: String,
        min: i64,
    },

    #[error("Parameter {parameter}: {value} is above the maximum {max}")]
    AboveMaximum {
        parameter: String,
        value: String,
        max: i64,
    },

    /// Condition depends on a value only the engine knows
    #[error("Condition {0} cannot be evaluated from parameter values alone")]
    UnresolvableCondition(String),

    /// Conditions refer to each other in a loop
    #[error("Condition {0} refers to itself")]
    ConditionCycle(String),
}

/// Lowest listener rule priority an ALB accepts
pub const MIN_RULE_PRIORITY: u32 = 1;

/// Highest listener rule priority an ALB accepts
pub const MAX_RULE_PRIORITY: u32 = 50_000;

/// Validate a listener rule priority
///
/// # Rules
/// - Must be 1-50000
pub fn validate_priority(priority: u32) -> ValidationResult {
    if !(MIN_RULE_PRIORITY..=MAX_RULE_PRIORITY).contains(&priority) {
        return Err(ValidationError::InvalidPriority(priority));
    }
    Ok(())
}

/// Validate a new rule priority against those already on the listener
///
/// # Rules
/// - Priority must be in range
/// - Priority must not already be used on the same listener
pub fn validate_unique_priority(
    listener: &str,
    priority: u32,
    existing: &BTreeSet<u32>,
) -> ValidationResult {
    validate_priority(priority)?;
    if existing.contains(&priority) {
        return Err(ValidationError::DuplicatePriority {
            listener: listener.to_string(),
            priority,
        });
    }
    Ok(())
}

/// Validate that a target matches the target group's target type
pub fn validate_target_type(
    target_group: &str,
    expected: TargetType,
    actual: TargetType,
) -> ValidationResult {
    if expected != actual {
        return Err(ValidationError::TargetTypeMismatch {
            target_group: target_group.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Validate a deploy-time value against the parameter's declared constraints
///
/// # Rules
/// - Allowed values, when declared, must contain the value
/// - Allowed pattern, when declared, must match the whole value
/// - Number parameters must parse and respect min/max
/// - List parameters are checked element by element
pub fn validate_parameter_value(name: &str, parameter: &Parameter, value: &str) -> ValidationResult {
    let items: Vec<&str> = match parameter.parameter_type {
        ParameterType::CommaDelimitedList => value.split(',').map(str::trim).collect(),
        _ => vec![value],
    };

    for item in items {
        validate_scalar(name, parameter, item)?;
    }
    Ok(())
}

fn validate_scalar(name: &str, parameter: &Parameter, value: &str) -> ValidationResult {
    if !parameter.allowed_values.is_empty() && !parameter.allowed_values.iter().any(|v| v == value) {
        return Err(ValidationError::NotAllowed {
            parameter: name.to_string(),
            value: value.to_string(),
            allowed: parameter.allowed_values.clone(),
        });
    }

    if let Some(pattern) = &parameter.allowed_pattern {
        let anchored = Regex::new(&format!("^(?:{pattern})$")).map_err(|_| {
            ValidationError::InvalidPattern {
                parameter: name.to_string(),
                pattern: pattern.clone(),
            }
        })?;
        if !anchored.is_match(value) {
            return Err(ValidationError::PatternMismatch {
                parameter: name.to_string(),
                value: value.to_string(),
                pattern: pattern.clone(),
            });
        }
    }

    if parameter.parameter_type == ParameterType::Number {
        let not_a_number = || ValidationError::NotANumber {
            parameter: name.to_string(),
            value: value.to_string(),
        };
        // f64 parsing accepts NaN and infinities, which the engine rejects
        let number: f64 = value.parse().map_err(|_| not_a_number())?;
        if !number.is_finite() {
            return Err(not_a_number());
        }

        if let Some(min) = parameter.min_value {
            if number < min as f64 {
                return Err(ValidationError::BelowMinimum {
                    parameter: name.to_string(),
                    value: value.to_string(),
                    min,
                });
            }
        }
        if let Some(max) = parameter.max_value {
            if number > max as f64 {
                return Err(ValidationError::AboveMaximum {
                    parameter: name.to_string(),
                    value: value.to_string(),
                    max,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::flag_parameter;

    #[test]
    fn test_validate_priority() {
        assert!(validate_priority(1).is_ok());
        assert!(validate_priority(50_000).is_ok());
        assert!(validate_priority(0).is_err());
        assert!(validate_priority(50_001).is_err());
    }

    #[test]
    fn test_validate_unique_priority() {
        let existing: BTreeSet<u32> = [100, 200].into_iter().collect();

        assert!(validate_unique_priority("Listener", 150, &existing).is_ok());
        assert_eq!(
            validate_unique_priority("Listener", 100, &existing),
            Err(ValidationError::DuplicatePriority {
                listener: "Listener".to_string(),
                priority: 100
            })
        );
    }

    #[test]
    fn test_validate_target_type() {
        assert!(validate_target_type("Tg", TargetType::Ip, TargetType::Ip).is_ok());
        assert!(matches!(
            validate_target_type("Tg", TargetType::Instance, TargetType::Ip),
            Err(ValidationError::TargetTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_allowed_values() {
        let param = flag_parameter("flag", false);
        assert!(validate_parameter_value("Flag", &param, "true").is_ok());
        assert!(matches!(
            validate_parameter_value("Flag", &param, "yes"),
            Err(ValidationError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_number_range() {
        let param = Parameter::number("zones").min_value(2).max_value(4);
        assert!(validate_parameter_value("MaxAZs", &param, "3").is_ok());
        assert!(matches!(
            validate_parameter_value("MaxAZs", &param, "1"),
            Err(ValidationError::BelowMinimum { .. })
        ));
        assert!(matches!(
            validate_parameter_value("MaxAZs", &param, "5"),
            Err(ValidationError::AboveMaximum { .. })
        ));
        assert!(matches!(
            validate_parameter_value("MaxAZs", &param, "two"),
            Err(ValidationError::NotANumber { .. })
        ));
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        let bounded = Parameter::number("priority").min_value(1).max_value(50_000);
        let unbounded = Parameter::number("port");
        for raw in ["NaN", "nan", "inf", "-inf", "infinity"] {
            assert!(
                matches!(
                    validate_parameter_value("Priority", &bounded, raw),
                    Err(ValidationError::NotANumber { .. })
                ),
                "{raw} accepted with bounds"
            );
            assert!(
                matches!(
                    validate_parameter_value("ContainerPort", &unbounded, raw),
                    Err(ValidationError::NotANumber { .. })
                ),
                "{raw} accepted without bounds"
            );
        }
    }

    #[test]
    fn test_allowed_pattern_is_anchored() {
        let param = Parameter::string("digits").allowed_pattern("[0-9]+");
        assert!(validate_parameter_value("Digits", &param, "123").is_ok());
        assert!(validate_parameter_value("Digits", &param, "12a").is_err());
    }

    #[test]
    fn test_list_elements_checked() {
        let param = Parameter::comma_delimited_list("hosts").allowed_pattern("[a-z.]+");
        assert!(validate_parameter_value("Hosts", &param, "a.com, b.com").is_ok());
        assert!(validate_parameter_value("Hosts", &param, "a.com,B_C").is_err());
    }
}
