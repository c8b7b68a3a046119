// Copyright (c) 2025 - Cowboy AI, Inc.
//! Host Header Pattern Value Object
//!
//! Values accepted by an ALB `host-header` rule condition: DNS names whose
//! labels may carry the `*` and `?` wildcards.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Host pattern validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostnameError {
    #[error("Host pattern is empty")]
    Empty,

    #[error("Host pattern exceeds maximum length of 128 characters: {0}")]
    TooLong(usize),

    #[error("Label exceeds maximum length of 63 characters: {0}")]
    LabelTooLong(String),

    #[error("Invalid character in host pattern: {0}")]
    InvalidCharacter(char),

    #[error("Label cannot start or end with hyphen: {0}")]
    InvalidLabelFormat(String),
}

/// Host header pattern
///
/// Invariants:
/// - Total length ≤ 128 characters (ALB condition value limit)
/// - Each label ≤ 63 characters and non-empty
/// - Labels contain only alphanumerics, hyphens and the wildcards `*` `?`
/// - Labels cannot start or end with hyphens
/// - Stored lowercase, since host matching is case-insensitive
///
/// # Examples
///
/// ```rust
/// use fargate_stacks::domain::HostPattern;
///
/// assert!(HostPattern::new("hello.skcnctf.tk").is_ok());
/// assert!(HostPattern::new("*.example.com").is_ok());
/// assert!(HostPattern::new("-bad.example.com").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostPattern(String);

impl HostPattern {
    /// Maximum length of an ALB condition value
    pub const MAX_LENGTH: usize = 128;

    /// Maximum length for a single label (RFC 1123)
    pub const MAX_LABEL_LENGTH: usize = 63;

    /// Create a new host pattern with validation
    pub fn new(pattern: impl Into<String>) -> Result<Self, HostnameError> {
        let pattern = pattern.into().to_lowercase();

        if pattern.is_empty() {
            return Err(HostnameError::Empty);
        }

        if pattern.len() > Self::MAX_LENGTH {
            return Err(HostnameError::TooLong(pattern.len()));
        }

        for label in pattern.split('.') {
            Self::validate_label(label)?;
        }

        Ok(Self(pattern))
    }

    fn validate_label(label: &str) -> Result<(), HostnameError> {
        if label.is_empty() {
            return Err(HostnameError::Empty);
        }

        if label.len() > Self::MAX_LABEL_LENGTH {
            return Err(HostnameError::LabelTooLong(label.to_string()));
        }

        for ch in label.chars() {
            if !ch.is_ascii_alphanumeric() && !matches!(ch, '-' | '*' | '?') {
                return Err(HostnameError::InvalidCharacter(ch));
            }
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(HostnameError::InvalidLabelFormat(label.to_string()));
        }

        Ok(())
    }

    /// Get the pattern as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the pattern contains a wildcard
    pub fn is_wildcard(&self) -> bool {
        self.0.contains(['*', '?'])
    }
}

impl fmt::Display for HostPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for HostPattern {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HostPattern {
    type Error = HostnameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for HostPattern {
    type Error = HostnameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HostPattern> for String {
    fn from(pattern: HostPattern) -> Self {
        pattern.0
    }
}
