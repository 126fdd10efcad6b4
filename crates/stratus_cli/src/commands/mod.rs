//! CLI command definitions.
//!
//! Each subcommand maps to one stage of the reconcile pipeline: `plan`
//! stops after diffing, `apply` executes the plan, `state` inspects the
//! persisted baseline.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use serde_json::json;
use stratus_provider::{AttributeMap, SimProvider};
use stratus_state::FileStateStore;

pub mod apply;
pub mod plan;
pub mod state;

/// Stratus - declarative resource reconciliation
#[derive(Parser)]
#[command(name = "stratus")]
#[command(version, about = "Stratus - declarative resource reconciliation")]
#[command(long_about = r#"
Stratus reconciles a declarative resource manifest against last-known
state: it derives the dependency graph, diffs desired against recorded
state, orders the changes into waves, and applies them concurrently
through the configured provider.

COMMANDS:
  plan   → Show the changes a manifest would apply (no mutation)
  apply  → Diff and execute, updating recorded state per entry
  state  → Inspect recorded resource state

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Configuration error (cycle, missing reference)
  4 - Partial failure (some entries failed or were blocked)
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the changes a manifest would apply
    Plan(plan::PlanArgs),

    /// Diff and execute a manifest
    Apply(apply::ApplyArgs),

    /// Inspect recorded resource state
    State(state::StateArgs),
}

/// Options shared by plan and apply.
#[derive(Args)]
pub struct RunArgs {
    /// Path to the manifest file (.yaml, .yml or .json)
    #[arg(short = 'f', long = "file")]
    pub manifest: PathBuf,

    /// State directory
    #[arg(long, default_value = ".stratus/state", env = "STRATUS_STATE_DIR")]
    pub state_dir: PathBuf,
}

/// Open the state store for a run.
pub fn open_store(dir: &PathBuf) -> anyhow::Result<Arc<FileStateStore>> {
    Ok(Arc::new(FileStateStore::open(dir)?))
}

/// The provider binding. Real cloud bindings attach here; the stock
/// build ships the in-memory simulation, seeded with answers for the
/// lookup kinds the example manifests use.
pub fn provider() -> Arc<SimProvider> {
    let mut ami = AttributeMap::new();
    ami.insert("id".to_string(), json!("ami-0f3c7d42"));

    let mut caller_ip = AttributeMap::new();
    caller_ip.insert("origin".to_string(), json!("198.51.100.7"));

    Arc::new(
        SimProvider::new()
            .with_lookup("aws/ami", ami)
            .with_lookup("http/caller-ip", caller_ip),
    )
}
