// Copyright (c) 2025 - Cowboy AI, Inc.
//! Composition Root
//!
//! [`App`] is the registry of stacks in instantiation order. Adding a stack
//! checks it against everything added before it:
//!
//! - stack ids are unique
//! - every `Fn::ImportValue` names an export of an earlier stack
//! - export names are unique across the assembly
//!
//! [`compose`] builds the full stack set from an [`AppConfig`] and returns a
//! [`StackBundle`] of typed export handles.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use crate::config::{AppConfig, Topology};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::domain::invariants::validate_unique_priority;
use crate::errors::{StackError, StackResult};
use crate::stacks::{
    LoadBalancerExports, LoadBalancerStack, ServiceStack, SharedInfraExports, SharedInfraStack,
    SplitLoadBalancerExports, SplitLoadBalancerStack, SplitServiceStack, Stack,
};
use crate::synth::{template_file_name, Manifest, ManifestEntry, MANIFEST_VERSION};

#[derive(Debug, Clone, PartialEq, Eq)]
struct ExportSource {
    stack: String,
    condition: Option<String>,
}

/// Stacks in instantiation order
#[derive(Debug, Clone, Default)]
pub struct App {
    stacks: Vec<Stack>,
    exports: BTreeMap<String, ExportSource>,
    dependencies: BTreeMap<String, BTreeSet<String>>,
    diagnostics: Vec<Diagnostic>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fully declared stack after every stack it imports from
    pub fn add_stack(&mut self, stack: Stack) -> StackResult<()> {
        let id = stack.id().to_string();
        if self.stacks.iter().any(|s| s.id() == id) {
            return Err(StackError::DuplicateStack(id));
        }

        let template = stack.template();
        template.check_references()?;

        let mut depends_on = BTreeSet::new();
        for export in template.imports() {
            let source = self
                .exports
                .get(&export)
                .ok_or_else(|| StackError::UnresolvedImport {
                    stack: id.clone(),
                    export: export.clone(),
                })?;
            depends_on.insert(source.stack.clone());
        }

        let mut new_exports = BTreeMap::new();
        for (name, condition) in template.exports() {
            if self.exports.contains_key(&name) || new_exports.contains_key(&name) {
                return Err(StackError::DuplicateExport(name));
            }
            new_exports.insert(
                name,
                ExportSource {
                    stack: id.clone(),
                    condition,
                },
            );
        }

        let mut diagnostics = template.diagnostics();
        // Conditions are per stack, so nothing in the importer can match the producer's gate
        for (logical_id, export) in template.import_sites() {
            let Some(source) = self.exports.get(&export) else {
                continue;
            };
            if let Some(condition) = &source.condition {
                diagnostics.push(Diagnostic {
                    stack: id.clone(),
                    logical_id,
                    kind: DiagnosticKind::ConditionalImport {
                        export,
                        producer: source.stack.clone(),
                        condition: condition.clone(),
                    },
                });
            }
        }

        info!(
            stack = %id,
            resources = template.resources().len(),
            parameters = template.parameters().len(),
            exports = new_exports.len(),
            depends_on = ?depends_on,
            "added stack"
        );

        self.exports.extend(new_exports);
        self.dependencies.insert(id, depends_on);
        self.diagnostics.extend(diagnostics);
        self.stacks.push(stack);
        Ok(())
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn stack(&self, id: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.id() == id)
    }

    /// Stacks `id` imports from
    pub fn dependencies(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.dependencies.get(id)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Export names in the assembly, with their producing stack
    pub fn exports(&self) -> impl Iterator<Item = (&str, &str)> {
        self.exports
            .iter()
            .map(|(name, source)| (name.as_str(), source.stack.as_str()))
    }

    pub fn manifest(&self) -> Manifest {
        Manifest {
            version: MANIFEST_VERSION,
            stacks: self
                .stacks
                .iter()
                .map(|stack| ManifestEntry {
                    id: stack.id().to_string(),
                    template_file: template_file_name(stack.id()),
                    dependencies: self
                        .dependencies(stack.id())
                        .map(|deps| deps.iter().cloned().collect())
                        .unwrap_or_default(),
                })
                .collect(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

/// Export handles of whichever front end was composed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontEnd {
    DefaultAction(LoadBalancerExports),
    SplitAtTargetGroup(SplitLoadBalancerExports),
}

/// Result of [`compose`]
#[derive(Debug, Clone)]
pub struct StackBundle {
    pub app: App,
    pub infra: SharedInfraExports,
    pub front_end: FrontEnd,
    /// Service stack ids in configuration order
    pub services: Vec<String>,
}

/// Build every stack the configuration describes, in dependency order
pub fn compose(config: &AppConfig) -> StackResult<StackBundle> {
    config.validate()?;
    info!(
        topology = %config.topology,
        environment = %config.infra.environment,
        services = config.services.len(),
        "composing stacks"
    );

    let mut app = App::new();
    let infra = SharedInfraStack::new(&config.infra)?;
    app.add_stack(infra.stack)?;
    let shared = infra.exports;

    let mut services = Vec::new();
    let front_end = match config.topology {
        Topology::DefaultAction => {
            let lb = LoadBalancerStack::new(&config.load_balancer, &shared)?;
            app.add_stack(lb.stack)?;

            let mut priorities: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
            for service_config in &config.services {
                let service = ServiceStack::new(service_config, &shared, &lb.exports)?;
                let used = priorities.entry(service.listener.clone()).or_default();
                validate_unique_priority(&service.listener, service.priority, used)?;
                used.insert(service.priority);

                services.push(service.stack.id().to_string());
                app.add_stack(service.stack)?;
            }
            FrontEnd::DefaultAction(lb.exports)
        }
        Topology::SplitAtTargetGroup => {
            let lb = SplitLoadBalancerStack::new(&config.load_balancer, &shared)?;
            app.add_stack(lb.stack)?;

            for service_config in &config.services {
                let service = SplitServiceStack::new(service_config, &shared, &lb.exports)?;
                services.push(service.stack.id().to_string());
                app.add_stack(service.stack)?;
            }
            FrontEnd::SplitAtTargetGroup(lb.exports)
        }
    };

    for diagnostic in app.diagnostics() {
        warn!(
            stack = %diagnostic.stack,
            logical_id = %diagnostic.logical_id,
            "{diagnostic}"
        );
    }

    Ok(StackBundle {
        app,
        infra: shared,
        front_end,
        services,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ValidationError;
    use crate::template::{Expr, Output};
    use pretty_assertions::assert_eq;

    fn producer() -> Stack {
        let mut stack = Stack::new("Producer");
        stack
            .export_qualified("Value", Output::new(Expr::str("v")))
            .unwrap();
        stack
    }

    fn consumer(export: &str) -> Stack {
        let mut stack = Stack::new("Consumer");
        stack
            .template_mut()
            .add_output("Copied", Output::new(Expr::import_value(export)))
            .unwrap();
        stack
    }

    #[test]
    fn test_import_must_follow_export() {
        let mut app = App::new();
        let err = app.add_stack(consumer("Producer:Value")).unwrap_err();
        assert!(matches!(err, StackError::UnresolvedImport { .. }));

        app.add_stack(producer()).unwrap();
        app.add_stack(consumer("Producer:Value")).unwrap();
        assert_eq!(
            app.dependencies("Consumer").unwrap(),
            &BTreeSet::from(["Producer".to_string()])
        );
    }

    #[test]
    fn test_duplicate_stack_and_export() {
        let mut app = App::new();
        app.add_stack(producer()).unwrap();
        assert!(matches!(
            app.add_stack(producer()),
            Err(StackError::DuplicateStack(_))
        ));

        let mut clash = Stack::new("Other");
        clash
            .export("Value", "Producer:Value", Output::new(Expr::str("x")))
            .unwrap();
        assert!(matches!(
            app.add_stack(clash),
            Err(StackError::DuplicateExport(name)) if name == "Producer:Value"
        ));
    }

    #[test]
    fn test_compose_default() {
        let bundle = compose(&AppConfig::default()).unwrap();
        let ids: Vec<&str> = bundle.app.stacks().iter().map(Stack::id).collect();
        assert_eq!(
            ids,
            vec![
                "VPCWithECSCLuster",
                "SplitAtTargetGroup-LBStack",
                "SplitAtTargetGroup-ServiceStack",
            ]
        );
        assert_eq!(
            bundle.app.dependencies("SplitAtTargetGroup-ServiceStack").unwrap(),
            &BTreeSet::from([
                "SplitAtTargetGroup-LBStack".to_string(),
                "VPCWithECSCLuster".to_string(),
            ])
        );
        assert!(matches!(bundle.front_end, FrontEnd::DefaultAction(_)));
    }

    #[test]
    fn test_cluster_import_reported() {
        let bundle = compose(&AppConfig::default()).unwrap();
        let conditional: Vec<&Diagnostic> = bundle
            .app
            .diagnostics()
            .iter()
            .filter(|d| matches!(d.kind, DiagnosticKind::ConditionalImport { .. }))
            .collect();
        assert_eq!(conditional.len(), 1);
        assert_eq!(conditional[0].stack, "SplitAtTargetGroup-ServiceStack");
        assert_eq!(conditional[0].logical_id, "FargateService");
    }

    #[test]
    fn test_duplicate_priority_rejected() {
        let mut config = AppConfig::default();
        let mut second = config.services[0].clone();
        second.stack_id = "Second-ServiceStack".to_string();
        config.services.push(second);

        let err = compose(&config).unwrap_err();
        assert!(matches!(
            err,
            StackError::Validation(ValidationError::DuplicatePriority { priority: 100, .. })
        ));
    }
}
