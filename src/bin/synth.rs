// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cloud Assembly Synthesizer
//!
//! Composes the shared network, load balancer and service stacks and writes
//! their templates plus `manifest.json` to an output directory.
//!
//! Run with: cargo run --bin fargate-stacks-synth -- [--config FILE] [--out DIR] [--parameters FILE]
//!
//! Without `--config`, configuration comes from `FARGATE_STACKS_*`
//! environment variables over the built-in defaults. A parameter file is a
//! JSON object of `{ "<StackId>": { "<Parameter>": "<value>" } }`; each
//! stack it names gets a deploy preview printed to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use fargate_stacks::{compose, synth, AppConfig, ParameterValues, Plan};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "fargate-stacks-synth")]
#[command(about = "Synthesize the VPC, load balancer and Fargate service stacks", long_about = None)]
struct Args {
    /// JSON configuration file (defaults to FARGATE_STACKS_* variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the cloud assembly is written to
    #[arg(long = "out", default_value = "cdk.out")]
    out_dir: PathBuf,

    /// JSON file of per-stack parameter values to preview a deploy with
    #[arg(long)]
    parameters: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AppConfig::from_env().context("Failed to load configuration from environment")?,
    };

    let bundle = compose(&config).context("Failed to compose stacks")?;
    let manifest = synth(&bundle.app, &args.out_dir)
        .with_context(|| format!("Failed to write cloud assembly to {}", args.out_dir.display()))?;

    info!(
        "Synthesized {} stacks into {}",
        manifest.stacks.len(),
        args.out_dir.display()
    );

    if let Some(path) = &args.parameters {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read parameter file {}", path.display()))?;
        let values: BTreeMap<String, ParameterValues> =
            serde_json::from_str(&raw).context("Parameter file is not valid JSON")?;

        for (stack_id, parameters) in &values {
            let Some(stack) = bundle.app.stack(stack_id) else {
                warn!(stack = %stack_id, "Parameter file names an unknown stack");
                continue;
            };
            let plan = Plan::new(stack.template(), parameters)
                .with_context(|| format!("Invalid parameters for {stack_id}"))?;
            println!("{plan}");
        }
    }

    Ok(())
}
