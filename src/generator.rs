//! One generator pass: resolve roots, plan storage, emit statements.

use crate::core::{StitchError, StitchResult};
use crate::di::{ConfigProvider, MetadataProvider};
use crate::emit::{CompositionCode, Emitter};
use crate::graph::{DependencyGraph, GraphBuilder, RootRequest};
use crate::planner::Planner;
use crate::registry::RegistrySnapshot;
use std::sync::atomic::{AtomicBool, Ordering};
use stitch_core::DiagnosticSink;
use tracing::info;

/// Result of a pass. Diagnostics went to the sink handed to [`Generator::run`].
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub code: CompositionCode,
    pub graph: DependencyGraph,
}

pub struct Generator<'a> {
    registry: RegistrySnapshot,
    metadata: &'a dyn MetadataProvider,
    config: &'a dyn ConfigProvider,
}

impl<'a> Generator<'a> {
    pub fn new(
        registry: RegistrySnapshot,
        metadata: &'a dyn MetadataProvider,
        config: &'a dyn ConfigProvider,
    ) -> Self {
        Self {
            registry,
            metadata,
            config,
        }
    }

    pub fn run(
        &self,
        composition: &str,
        roots: &[RootRequest],
        sink: &mut dyn DiagnosticSink,
    ) -> StitchResult<GenerationOutput> {
        self.run_with_cancel(composition, roots, sink, &AtomicBool::new(false))
    }

    /// Like [`Generator::run`], checking `cancel` before each root
    ///
    /// A cancelled pass returns [`StitchError::Cancelled`] and no output.
    pub fn run_with_cancel(
        &self,
        composition: &str,
        roots: &[RootRequest],
        sink: &mut dyn DiagnosticSink,
        cancel: &AtomicBool,
    ) -> StitchResult<GenerationOutput> {
        info!(
            "Generating '{}': {} binding(s), {} root(s)",
            composition,
            self.registry.bindings().len(),
            roots.len()
        );

        let mut builder = GraphBuilder::new(self.registry.clone(), self.metadata, self.config, roots);
        for root in roots {
            if cancel.load(Ordering::Relaxed) {
                info!("Generation of '{}' cancelled", composition);
                return Err(StitchError::Cancelled);
            }
            builder.add_root(root, sink);
        }
        let graph = builder.finish();
        graph.verify_acyclic()?;

        let plan = Planner::new(self.config).plan(&graph, sink)?;
        let code = Emitter::new(&graph, &plan, self.config).emit(composition)?;

        info!(
            "Generated '{}': {} root(s), {} field(s)",
            composition,
            code.roots.len(),
            code.fields.len()
        );
        Ok(GenerationOutput { code, graph })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::mocks::{root, Scenario, TypeBuilder};
    use stitch_core::{CollectingSink, DiagnosticId, Lifetime};

    fn fixture() -> Scenario {
        let mut fixture = Scenario::new(vec![
            TypeBuilder::class("Service").ctor(&[("repo", "IRepo")]),
            TypeBuilder::class("Repo"),
        ]);
        fixture.bind("IService", "Service", Lifetime::Transient);
        fixture.bind("IRepo", "Repo", Lifetime::Singleton);
        fixture
    }

    #[test]
    fn test_run_produces_code_and_graph() {
        let fixture = fixture();
        let mut sink = CollectingSink::new();
        let generator = Generator::new(fixture.registry.snapshot(), &fixture.metadata, &fixture.config);

        let output = generator
            .run("Composition", &[root("Root", "IService"), root("Missing", "IMissing")], &mut sink)
            .unwrap();

        assert_eq!(output.code.composition, "Composition");
        assert_eq!(output.code.roots.len(), 1);
        assert_eq!(output.graph.roots().len(), 2);
        assert_eq!(sink.with_id(DiagnosticId::UnableToResolve).len(), 1);
    }

    #[test]
    fn test_cancelled_before_first_root() {
        let fixture = fixture();
        let mut sink = CollectingSink::new();
        let generator = Generator::new(fixture.registry.snapshot(), &fixture.metadata, &fixture.config);

        let cancel = AtomicBool::new(true);
        let result = generator.run_with_cancel("Composition", &[root("Root", "IService")], &mut sink, &cancel);
        assert!(matches!(result, Err(StitchError::Cancelled)));
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn test_registry_snapshot_is_isolated() {
        let mut fixture = fixture();
        let snapshot = fixture.registry.snapshot();
        fixture.bind("IService", "Repo", Lifetime::Transient);

        let mut sink = CollectingSink::new();
        let output = Generator::new(snapshot, &fixture.metadata, &fixture.config)
            .run("Composition", &[root("Root", "IService")], &mut sink)
            .unwrap();
        let node = output.graph.resolved_roots().next().unwrap().1;
        assert_eq!(output.graph.node(node).ty.to_string(), "Service");
    }

    #[test]
    fn test_singleton_in_lazy_cycle_in_any_root_order() {
        let types = || {
            vec![
                TypeBuilder::class("A").ctor(&[("s", "IS")]),
                TypeBuilder::class("S").ctor(&[("a", "Lazy<IA>")]),
            ]
        };
        for roots in [
            [root("First", "IA"), root("Second", "IS")],
            [root("Second", "IS"), root("First", "IA")],
        ] {
            let mut fixture = Scenario::new(types());
            fixture.bind("IA", "A", Lifetime::Transient);
            fixture.bind("IS", "S", Lifetime::Singleton);

            let mut sink = CollectingSink::new();
            let output = Generator::new(fixture.registry.snapshot(), &fixture.metadata, &fixture.config)
                .run("Composition", &roots, &mut sink)
                .unwrap();

            assert!(sink.diagnostics().is_empty(), "{:?}", sink.diagnostics());
            assert_eq!(output.code.roots.len(), 2);
            assert_eq!(output.code.fields.len(), 1);
        }
    }
}

