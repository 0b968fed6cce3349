// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Validate command - check the workflow document

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::modules::ModuleRegistry;
use crate::workflow::{WorkflowDefinition, WorkflowValidator};

/// Run the validate command
pub async fn run(workflow_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating workflow...".bold());
    println!();

    // Check workflow exists
    if !workflow_path.exists() {
        return Err(miette::miette!(
            "Workflow file not found: {}",
            workflow_path.display()
        ));
    }

    // Load workflow
    let workflow = match WorkflowDefinition::from_file(&workflow_path) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("  {} Failed to parse workflow", "✗".red());
            eprintln!();
            return Err(miette::miette!("Parse error: {}", e));
        }
    };

    println!("  {} Workflow file is valid YAML", "✓".green());

    // Validate structure
    let validation = WorkflowValidator::validate(&workflow, &ModuleRegistry::builtin())?;

    if !validation.errors.is_empty() {
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Workflow summary".bold());
        println!("  Name: {}", workflow.name);
        println!("  Steps: {}", workflow.steps.len());
        for step in &workflow.steps {
            let deps = if step.depends_on.is_empty() {
                String::new()
            } else {
                format!(" [depends: {}]", step.depends_on.join(", "))
            };
            println!("    - {} ({}){}", step.id, step.module, deps.dimmed());
        }
    }

    println!();

    if validation.is_valid() {
        if validation.has_warnings() {
            println!("{}", "Workflow is valid but has warnings.".yellow().bold());
        } else {
            println!("{}", "Workflow is valid!".green().bold());
        }
        Ok(())
    } else {
        Err(miette::miette!("Workflow validation failed"))
    }
}
