// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! stacflow - STAC item pipeline engine
//!
//! Build, enrich, validate, and emit STAC item records from declarative
//! workflow documents.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stacflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stacflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Run {
            workflow,
            checkpoint_dir,
            no_resume,
            log_level,
        } => stacflow::cli::run::run(workflow, checkpoint_dir, no_resume, log_level, cli.verbose).await,
        Commands::Validate { workflow } => {
            stacflow::cli::validate::run(workflow, cli.verbose).await
        }
        Commands::Graph { workflow, format } => {
            stacflow::cli::graph::run(workflow, format, cli.verbose).await
        }
    }
}
