// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Graph command - visualize the step DAG

use miette::Result;
use std::path::PathBuf;

use super::GraphFormat;
use crate::workflow::{DagBuilder, WorkflowDefinition};

/// Run the graph command
pub async fn run(workflow_path: PathBuf, format: GraphFormat, _verbose: bool) -> Result<()> {
    // Check workflow exists
    if !workflow_path.exists() {
        return Err(miette::miette!(
            "Workflow file not found: {}",
            workflow_path.display()
        ));
    }

    // Load workflow
    let workflow = WorkflowDefinition::from_file(&workflow_path)
        .map_err(|e| miette::miette!("Failed to load workflow: {}", e))?;

    // Build DAG
    let dag = DagBuilder::build(&workflow)?;

    // Output in requested format
    let output = match format {
        GraphFormat::Text => dag.to_text(&workflow)?,
        GraphFormat::Dot => dag.to_dot(),
        GraphFormat::Mermaid => dag.to_mermaid(),
    };

    println!("{}", output);

    Ok(())
}
