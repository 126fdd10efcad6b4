//! Apply command - diff and execute.

use anyhow::Result;
use clap::Args;
use tracing::info;

use stratus_core::{CancelToken, EntryOutcome, ExecutorOptions, Orchestrator, RunStatus};
use stratus_spec::ManifestReader;

use super::RunArgs;

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Maximum concurrent provider calls per wave
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,
}

pub async fn execute(args: ApplyArgs) -> Result<()> {
    let manifest = ManifestReader::read(&args.run.manifest)?;
    info!("Applying manifest '{}'", manifest.name);

    let store = super::open_store(&args.run.state_dir)?;
    let options = ExecutorOptions {
        concurrency: args.concurrency,
        ..ExecutorOptions::default()
    };
    let orchestrator =
        Orchestrator::new(super::provider(), store).with_options(options);

    // Ctrl-C aborts in-flight retries and stops later waves; entries
    // already applied stay recorded.
    let cancel = CancelToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancellation requested, finishing in-flight entries...");
            signal_token.cancel();
        }
    });

    let report = orchestrator.apply(&manifest, cancel).await?;

    for entry in &report.entries {
        match &entry.outcome {
            EntryOutcome::Applied => {
                println!("   ✅ {} {} ({})", entry.op, entry.name, entry.kind)
            }
            EntryOutcome::Destroyed => {
                println!("   ✅ delete {} ({})", entry.name, entry.kind)
            }
            EntryOutcome::Failed { error } => {
                println!("   ❌ {} {} failed: {}", entry.op, entry.name, error)
            }
            EntryOutcome::Blocked { dependency } => {
                println!(
                    "   ⏭️  {} {} blocked by failed '{}'",
                    entry.op, entry.name, dependency
                )
            }
            EntryOutcome::Cancelled => {
                println!("   ⏹️  {} {} cancelled", entry.op, entry.name)
            }
        }
    }

    println!();
    match report.status {
        RunStatus::Success => {
            println!("✅ Run {} succeeded: {}", report.run_id, report.summary());
            Ok(())
        }
        RunStatus::PartialFailure => {
            println!(
                "❌ Run {} partially failed: {} (failed: {})",
                report.run_id,
                report.summary(),
                report.failed_names().join(", ")
            );
            anyhow::bail!("partial failure")
        }
        RunStatus::Fatal => {
            println!(
                "❌ Run {} failed fatally: {}",
                report.run_id,
                report.error.as_deref().unwrap_or("unknown error")
            );
            anyhow::bail!("fatal run error")
        }
    }
}
