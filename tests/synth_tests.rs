// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cloud Assembly Tests
//!
//! Writes the assembly into a temporary directory and reads it back the way
//! a deploy tool would.

mod fixtures;

use fargate_stacks::synth::{template_file_name, MANIFEST_FILE};
use fargate_stacks::{compose, synth};
use fixtures::*;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::fs;

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_assembly_layout() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = default_bundle();
    synth(&bundle.app, dir.path()).unwrap();

    let mut files: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(
        files,
        vec![
            "SplitAtTargetGroup-LBStack.template.json".to_string(),
            "SplitAtTargetGroup-ServiceStack.template.json".to_string(),
            "VPCWithECSCLuster.template.json".to_string(),
            MANIFEST_FILE.to_string(),
        ]
    );
}

#[test]
fn test_templates_round_trip_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = default_bundle();
    synth(&bundle.app, dir.path()).unwrap();

    let lb = read_json(&dir.path().join(template_file_name(LB_STACK)));
    assert_eq!(lb["AWSTemplateFormatVersion"], "2010-09-09");
    assert_eq!(lb["Resources"]["PublicALB"]["Condition"], "UseCertificateCondition");
    assert_eq!(
        lb["Outputs"]["LoadBalancerDNS"]["Export"]["Name"],
        "PUBLoadBalancerDNSName"
    );

    let service = read_json(&dir.path().join(template_file_name(SERVICE_STACK)));
    assert_eq!(
        service["Resources"]["HostHeaderListenerRule"]["Properties"]["ListenerArn"]
            ["Fn::ImportValue"],
        format!("{LB_STACK}:ListenerArn")
    );
}

#[test]
fn test_manifest_lists_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = default_bundle();
    let manifest = synth(&bundle.app, dir.path()).unwrap();

    let written = read_json(&dir.path().join(MANIFEST_FILE));
    assert_eq!(written["version"], "1.0");
    assert_eq!(
        written["diagnostics"].as_array().unwrap().len(),
        manifest.diagnostics.len()
    );
    assert!(written["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .any(|d| d["kind"] == "conditional_import" && d["stack"] == SERVICE_STACK));
}

#[test]
fn test_synth_is_byte_identical() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    synth(&default_bundle().app, first.path()).unwrap();
    synth(&default_bundle().app, second.path()).unwrap();

    for stack in [INFRA_STACK, LB_STACK, SERVICE_STACK] {
        let name = template_file_name(stack);
        assert_eq!(
            fs::read(first.path().join(&name)).unwrap(),
            fs::read(second.path().join(&name)).unwrap()
        );
    }
    assert_eq!(
        fs::read(first.path().join(MANIFEST_FILE)).unwrap(),
        fs::read(second.path().join(MANIFEST_FILE)).unwrap()
    );
}

#[test]
fn test_split_assembly() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = compose(&split_config()).unwrap();
    let manifest = synth(&bundle.app, dir.path()).unwrap();

    assert_eq!(manifest.stacks.len(), 3);
    let lb = read_json(&dir.path().join(template_file_name(LB_STACK)));
    assert!(lb["Resources"]["PublicALB"].get("Condition").is_none());
    assert_eq!(lb["Outputs"]["TargetGroup"]["Export"]["Name"], "TargetGroup80Name");
}
