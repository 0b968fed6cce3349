// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Run command - execute the workflow

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::logging::LogLevel;
use crate::utils::spinner::create_spinner;
use crate::workflow::{StacManager, WorkflowDefinition, WorkflowResult, WorkflowStatus};

/// Run the workflow
pub async fn run(
    workflow_path: PathBuf,
    checkpoint_dir: PathBuf,
    no_resume: bool,
    log_level: LogLevel,
    verbose: bool,
) -> Result<()> {
    // Check workflow exists
    if !workflow_path.exists() {
        return Err(miette::miette!(
            "Workflow file not found: {}",
            workflow_path.display()
        ));
    }

    // Load workflow
    let mut workflow = WorkflowDefinition::from_file(&workflow_path)
        .map_err(|e| miette::miette!("Failed to load workflow: {}", e))?;

    if no_resume {
        workflow.resume_from_checkpoint = false;
    }

    let name = workflow.name.clone();
    let manager = StacManager::new(workflow)?
        .checkpoint_dir(checkpoint_dir)
        .log_level(log_level);

    println!();
    println!("{}: {}", "Workflow".bold(), name);
    println!("{}", "═".repeat(50));
    println!("Execution plan ({} steps):", manager.execution_order().len());
    for (i, step_id) in manager.execution_order().iter().enumerate() {
        println!("  {}. {}", i + 1, step_id);
    }
    println!();

    let spinner = create_spinner("Running workflow...");
    let report = manager.execute().await;
    spinner.finish_and_clear();

    // Per-pipeline summaries
    for result in report.results() {
        print_result(result, verbose);
    }

    println!();
    if report.all_succeeded() {
        println!("{}", "Workflow completed successfully".green());
        Ok(())
    } else {
        println!("{}", "Workflow failed".red());
        Err(miette::miette!("One or more pipelines failed"))
    }
}

fn print_result(result: &WorkflowResult, verbose: bool) {
    let label = match &result.matrix_entry {
        Some(entry) => entry
            .get("collection_id")
            .and_then(serde_json::Value::as_str)
            .map(|c| format!("[{c}] "))
            .unwrap_or_default(),
        None => String::new(),
    };

    let marker = match result.status {
        WorkflowStatus::Completed => "✓".green(),
        WorkflowStatus::CompletedWithFailures => "⚠".yellow(),
        WorkflowStatus::Failed => "✗".red(),
    };

    println!("  {} {}{}", marker, label, result.summary);

    if verbose && result.failure_count > 0 {
        for failure in result.failures.get_all() {
            eprintln!(
                "      {} [{}] {}: {}",
                failure.item_id.dimmed(),
                failure.step_id,
                failure.error_kind,
                failure.message.dimmed()
            );
        }
    }
}
