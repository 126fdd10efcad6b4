//! End-to-end run pipeline.
//!
//! Wires the five stages together: validate, build the graph, resolve
//! lookups, diff against prior state, plan waves, execute. `plan` stops
//! before any mutation; `apply` runs the full pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use stratus_provider::{AttributeMap, Provider};
use stratus_spec::{KindCatalog, Manifest, ManifestValidator};
use stratus_state::StateStore;

use crate::cancel::CancelToken;
use crate::diff::DiffEngine;
use crate::error::{CoreError, CoreResult};
use crate::executor::{Executor, ExecutorOptions};
use crate::graph::ResourceGraph;
use crate::lookup::LookupResolver;
use crate::plan::{Plan, Planner};
use crate::report::RunReport;

/// Everything a run needs after the configuration stages: the graph,
/// the ordered plan, and the initial output environment.
pub struct PreparedRun {
    pub graph: ResourceGraph,
    pub plan: Plan,
    /// Resolved lookups overlaid with prior-state outputs.
    pub env: HashMap<String, AttributeMap>,
}

/// Front door of the orchestration core.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    store: Arc<dyn StateStore>,
    catalog: KindCatalog,
    options: ExecutorOptions,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn Provider>, store: Arc<dyn StateStore>) -> Self {
        Self {
            provider,
            store,
            catalog: KindCatalog::builtin(),
            options: ExecutorOptions::default(),
        }
    }

    pub fn with_catalog(mut self, catalog: KindCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the configuration stages. No mutation happens here; a
    /// failure at this point means no change was applied.
    pub async fn prepare(&self, manifest: &Manifest) -> CoreResult<PreparedRun> {
        let validation = ManifestValidator::validate(manifest, &self.catalog);
        if !validation.valid {
            return Err(CoreError::InvalidManifest(validation.errors.join("; ")));
        }
        for warning in &validation.warnings {
            warn!("{}", warning);
        }

        let graph = ResourceGraph::build(manifest)?;

        let resolver = LookupResolver::new(self.provider.clone());
        let mut env = resolver.resolve_all(manifest).await?;

        let prior = self.store.read_all().await?;
        for (name, record) in &prior {
            env.insert(name.clone(), record.outputs.clone());
        }

        let changeset = DiffEngine::new(&self.catalog).diff(&graph, &prior, &env);
        let plan = Planner::plan(&prior, changeset)?;

        Ok(PreparedRun { graph, plan, env })
    }

    /// Diff only: the plan that `apply` would execute.
    pub async fn plan(&self, manifest: &Manifest) -> CoreResult<Plan> {
        Ok(self.prepare(manifest).await?.plan)
    }

    /// Diff and execute.
    pub async fn apply(&self, manifest: &Manifest, cancel: CancelToken) -> CoreResult<RunReport> {
        let prepared = self.prepare(manifest).await?;
        let executor = Executor::new(self.provider.clone(), self.store.clone())
            .with_options(self.options.clone());
        executor
            .execute(&manifest.name, prepared.plan, prepared.env, cancel)
            .await
    }
}
