// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Workflow validation
//!
//! Validates a workflow document before execution: structural checks,
//! DAG health, registry resolution, and pipeline shape. The engine runs
//! linear pipelines only, so the topological order must shape into
//! exactly one source, any number of transformers, and exactly one sink.

use std::collections::HashSet;

use super::dag::DagBuilder;
use super::definition::WorkflowDefinition;
use crate::errors::StacflowError;
use crate::modules::{ModuleRegistry, ModuleRole};

/// Workflow validator
pub struct WorkflowValidator;

impl WorkflowValidator {
    /// Validate a workflow against a module registry
    pub fn validate(
        workflow: &WorkflowDefinition,
        registry: &ModuleRegistry,
    ) -> Result<ValidationResult, StacflowError> {
        let mut result = ValidationResult::new();

        if workflow.name.trim().is_empty() {
            result.add_error("Workflow name is empty");
        }

        if workflow.steps.is_empty() {
            result.add_error("Workflow has no steps defined");
        }

        // Check for duplicate step ids
        let mut seen_ids = HashSet::new();
        for step in &workflow.steps {
            if !seen_ids.insert(&step.id) {
                result.add_error(&format!("Duplicate step id: '{}'", step.id));
            }
        }

        // Check module names resolve
        let mut modules_known = true;
        for step in &workflow.steps {
            if !registry.contains(&step.module) {
                modules_known = false;
                result.add_error(&format!(
                    "Step '{}' uses unknown module '{}'",
                    step.id, step.module
                ));
            }
        }

        // Validate DAG structure (cycles and unknown dependencies)
        let order = match DagBuilder::build(workflow) {
            Ok(dag) => Some(dag.topological_order()?),
            Err(StacflowError::CircularDependency { steps }) => {
                result.add_error(&format!("Cycle in step dependencies: {}", steps.join(", ")));
                None
            }
            Err(StacflowError::UnknownDependency { step, dependency }) => {
                result.add_error(&format!(
                    "Step '{}' depends on unknown step '{}'",
                    step, dependency
                ));
                None
            }
            Err(e) => return Err(e),
        };

        // Pipeline shape: Source → Transformers* → Sink, over the execution order
        if let (Some(order), true) = (order, modules_known) {
            Self::validate_shape(workflow, &order, registry, &mut result);
        }

        // An empty matrix list is treated as "no matrix"; flag it so the
        // author knows which of the two they wrote
        if workflow
            .strategy
            .matrix
            .as_ref()
            .is_some_and(|entries| entries.is_empty())
        {
            result.add_warning("strategy.matrix is an empty list; running a single pipeline");
        }

        Ok(result)
    }

    fn validate_shape(
        workflow: &WorkflowDefinition,
        order: &[String],
        registry: &ModuleRegistry,
        result: &mut ValidationResult,
    ) {
        let roles: Vec<(&str, ModuleRole)> = order
            .iter()
            .filter_map(|id| {
                let step = workflow.get_step(id)?;
                let role = registry.role_of(&step.module)?;
                Some((id.as_str(), role))
            })
            .collect();

        if roles.len() != order.len() {
            return;
        }

        let sources: Vec<&str> = roles
            .iter()
            .filter(|(_, r)| *r == ModuleRole::Source)
            .map(|(id, _)| *id)
            .collect();
        let sinks: Vec<&str> = roles
            .iter()
            .filter(|(_, r)| *r == ModuleRole::Sink)
            .map(|(id, _)| *id)
            .collect();

        match sources.as_slice() {
            [] => result.add_error("Pipeline has no source step"),
            [only] => {
                if roles.first().map(|(id, _)| *id) != Some(*only) {
                    result.add_error(&format!(
                        "Source step '{}' must come first in the execution order",
                        only
                    ));
                }
            }
            many => result.add_error(&format!(
                "Pipeline has multiple source steps: {}",
                many.join(", ")
            )),
        }

        match sinks.as_slice() {
            [] => result.add_error("Pipeline has no sink step"),
            [only] => {
                if roles.last().map(|(id, _)| *id) != Some(*only) {
                    result.add_error(&format!(
                        "Sink step '{}' must come last in the execution order",
                        only
                    ));
                }
            }
            many => result.add_error(&format!(
                "Pipeline has multiple sink steps: {}",
                many.join(", ")
            )),
        }
    }
}

/// Result of workflow validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
