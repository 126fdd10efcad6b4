//! Stratus CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Configuration error (cycle, missing reference, bad manifest)
//! - 4: Partial failure (some entries failed or were blocked)

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const CONFIG_ERROR: u8 = 3;
    pub const PARTIAL_FAILURE: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            EnvFilter::from_default_env()
                .add_directive("stratus=info".parse().unwrap())
                .add_directive("warn".parse().unwrap()),
        )
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Plan(args) => commands::plan::execute(args).await,
        Commands::Apply(args) => commands::apply::execute(args).await,
        Commands::State(args) => commands::state::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(core) = e.downcast_ref::<stratus_core::CoreError>() {
        return match core {
            stratus_core::CoreError::Cycle(_)
            | stratus_core::CoreError::MissingReference { .. }
            | stratus_core::CoreError::DuplicateName(_)
            | stratus_core::CoreError::InvalidManifest(_)
            | stratus_core::CoreError::LookupFailed { .. }
            | stratus_core::CoreError::Spec(_) => ExitCodes::CONFIG_ERROR,
            _ => ExitCodes::GENERAL_ERROR,
        };
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("partial failure") {
        ExitCodes::PARTIAL_FAILURE
    } else if msg.contains("manifest") || msg.contains("unsupported") {
        ExitCodes::CONFIG_ERROR
    } else if msg.contains("argument") || msg.contains("not found") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
