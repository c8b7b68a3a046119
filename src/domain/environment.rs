// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment environment

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Environment a stack set is deployed for; prefixes VPC and cluster names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Staging,
    Qa,
    Shared,
    Prod,
}

impl Environment {
    pub const ALL: [Environment; 5] = [
        Self::Dev,
        Self::Staging,
        Self::Qa,
        Self::Shared,
        Self::Prod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Staging => "staging",
            Self::Qa => "qa",
            Self::Shared => "shared",
            Self::Prod => "prod",
        }
    }

    /// All values, as the `AllowedValues` of the `Environment` parameter
    pub fn allowed_values() -> Vec<&'static str> {
        Self::ALL.iter().map(Environment::as_str).collect()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| format!("unknown environment '{s}' (expected one of {:?})", Self::allowed_values()))
    }
}
