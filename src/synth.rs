// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cloud assembly output
//!
//! Writes one `<StackId>.template.json` per stack and a `manifest.json`
//! listing the stacks in instantiation order with their dependencies.

use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::app::App;
use crate::diagnostics::Diagnostic;
use crate::errors::StackResult;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: &str = "1.0";

/// One stack in the assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: String,
    pub template_file: String,
    /// Stacks whose exports this one imports
    pub dependencies: Vec<String>,
}

/// Contents of `manifest.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub version: &'static str,
    pub stacks: Vec<ManifestEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

pub fn template_file_name(stack_id: &str) -> String {
    format!("{stack_id}.template.json")
}

fn pretty<T: Serialize>(value: &T) -> StackResult<String> {
    let mut rendered = serde_json::to_string_pretty(value)?;
    rendered.push('\n');
    Ok(rendered)
}

/// Write the cloud assembly for `app` into `out_dir`, creating it if needed
pub fn synth(app: &App, out_dir: impl AsRef<Path>) -> StackResult<Manifest> {
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir)?;

    for stack in app.stacks() {
        let path = out_dir.join(template_file_name(stack.id()));
        fs::write(&path, stack.template().to_json_pretty()?)?;
        debug!(stack = stack.id(), path = %path.display(), "wrote template");
    }

    let manifest = app.manifest();
    fs::write(out_dir.join(MANIFEST_FILE), pretty(&manifest)?)?;

    info!(
        dir = %out_dir.display(),
        stacks = manifest.stacks.len(),
        diagnostics = manifest.diagnostics.len(),
        "synthesized cloud assembly"
    );
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::compose;
    use crate::config::AppConfig;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_synth_writes_assembly() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = compose(&AppConfig::default()).unwrap();
        let manifest = synth(&bundle.app, dir.path()).unwrap();

        assert_eq!(manifest.stacks.len(), 3);
        for entry in &manifest.stacks {
            assert!(dir.path().join(&entry.template_file).is_file());
        }

        let raw = fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["stacks"][0]["id"], "VPCWithECSCLuster");
        assert_eq!(
            value["stacks"][0]["templateFile"],
            "VPCWithECSCLuster.template.json"
        );
    }
}
