//! State command - inspect recorded resource state.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use stratus_state::StateStore;

#[derive(Args)]
pub struct StateArgs {
    /// State directory
    #[arg(long, default_value = ".stratus/state", env = "STRATUS_STATE_DIR")]
    pub state_dir: PathBuf,

    #[command(subcommand)]
    pub command: StateCommands,
}

#[derive(Subcommand)]
pub enum StateCommands {
    /// List recorded resources
    List,
    /// Show one record as JSON
    Show {
        /// Logical name of the resource
        name: String,
    },
}

pub async fn execute(args: StateArgs) -> Result<()> {
    let store = super::open_store(&args.state_dir)?;

    match args.command {
        StateCommands::List => {
            let records = store.read_all().await?;
            if records.is_empty() {
                println!("No recorded state under {:?}", args.state_dir);
                return Ok(());
            }

            let mut names: Vec<&String> = records.keys().collect();
            names.sort();
            println!("{} recorded resource(s):", names.len());
            for name in names {
                let record = &records[name];
                println!(
                    "  {} ({}) id={} updated={}",
                    record.name, record.kind, record.id, record.updated_at
                );
            }
        }
        StateCommands::Show { name } => match store.get(&name).await? {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => anyhow::bail!("No recorded state for '{}'", name),
        },
    }

    Ok(())
}
