// Copyright (c) 2025 - Cowboy AI, Inc.
//! Composition diagnostics
//!
//! Findings that synthesize to a valid template but are likely to fail or
//! misbehave at deploy time. They are reported, never fixed silently.

use serde::Serialize;
use std::fmt;

/// What a diagnostic is about
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// An item without `condition` references a resource gated on it
    UnguardedConditionalReference { target: String, condition: String },

    /// A declared parameter nothing in the template reads
    InertParameter,

    /// A stack imports an export that only exists when `condition` holds
    ConditionalImport {
        export: String,
        producer: String,
        condition: String,
    },
}

/// A diagnostic attached to one logical id of one stack
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Diagnostic {
    pub stack: String,
    pub logical_id: String,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::UnguardedConditionalReference { target, condition } => write!(
                f,
                "{}/{} references {} which only exists when {} holds",
                self.stack, self.logical_id, target, condition
            ),
            DiagnosticKind::InertParameter => write!(
                f,
                "{}/{} is declared but never read; its value has no effect",
                self.stack, self.logical_id
            ),
            DiagnosticKind::ConditionalImport {
                export,
                producer,
                condition,
            } => write!(
                f,
                "{}/{} imports {} which {} only exports when {} holds",
                self.stack, self.logical_id, export, producer, condition
            ),
        }
    }
}
