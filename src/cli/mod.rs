// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for stacflow.

pub mod graph;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// STAC item pipeline engine
///
/// Build, enrich, validate, and emit STAC item records from declarative
/// workflow documents.
#[derive(Parser, Debug)]
#[clap(
    name = "stacflow",
    version,
    about = "Declarative pipeline engine for STAC item records",
    long_about = None,
    after_help = "Examples:\n\
        stacflow run                          Execute the workflow\n\
        stacflow run -w pipelines/hls.yaml    Execute a specific workflow file\n\
        stacflow validate                     Check the workflow document\n\
        stacflow graph --format mermaid       Render the step DAG\n\n\
        See 'stacflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the workflow
    Run {
        /// Workflow file
        #[clap(short, long, default_value = "workflow.yaml")]
        workflow: PathBuf,

        /// Checkpoint root directory
        #[clap(long, default_value = "./checkpoints")]
        checkpoint_dir: PathBuf,

        /// Ignore existing checkpoints and start fresh
        #[clap(long)]
        no_resume: bool,

        /// Default log level for steps (workflow settings take precedence)
        #[clap(long, default_value = "INFO", value_name = "LEVEL")]
        log_level: crate::logging::LogLevel,
    },

    /// Validate the workflow document
    Validate {
        /// Workflow file to validate
        #[clap(default_value = "workflow.yaml")]
        workflow: PathBuf,
    },

    /// Show the step dependency graph
    Graph {
        /// Workflow file
        #[clap(default_value = "workflow.yaml")]
        workflow: PathBuf,

        /// Output format (text, dot, mermaid)
        #[clap(short, long, default_value = "text")]
        format: GraphFormat,
    },
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}
