//! Plan command - diff only, no mutation.

use anyhow::Result;
use clap::Args;
use tracing::info;

use stratus_core::Orchestrator;
use stratus_spec::ManifestReader;

use super::RunArgs;

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub run: RunArgs,
}

pub async fn execute(args: PlanArgs) -> Result<()> {
    let manifest = ManifestReader::read(&args.run.manifest)?;
    info!("Planning manifest '{}'", manifest.name);

    let store = super::open_store(&args.run.state_dir)?;
    let orchestrator = Orchestrator::new(super::provider(), store);

    let plan = orchestrator.plan(&manifest).await?;

    if plan.is_empty() {
        println!("✅ No changes. Recorded state matches the manifest.");
        return Ok(());
    }

    println!(
        "📋 Plan for '{}': {} change(s) in {} wave(s)",
        manifest.name,
        plan.entry_count(),
        plan.waves.len()
    );
    for (i, wave) in plan.waves.iter().enumerate() {
        println!("  Wave {}:", i + 1);
        for entry in &wave.entries {
            println!(
                "    {} {} ({})",
                entry.change.op, entry.change.name, entry.change.kind
            );
        }
    }

    Ok(())
}
