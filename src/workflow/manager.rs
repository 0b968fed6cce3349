// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Workflow orchestration
//!
//! [`StacManager`] is the top-level entry point: it compiles the workflow
//! eagerly at construction (configuration errors surface there, before any
//! work starts), then `execute` runs one pipeline — or one per matrix
//! entry, concurrently — and always returns structured results. Runtime
//! errors never escape `execute`; a fatal error becomes a `failed` result
//! carrying the error in its summary.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::dag::DagBuilder;
use super::executor::{ExecutionStep, StreamExecutor};
use super::definition::WorkflowDefinition;
use super::validation::WorkflowValidator;
use crate::checkpoint::{CheckpointHandle, CheckpointStore};
use crate::context::WorkflowContext;
use crate::errors::{StacflowError, StacflowResult};
use crate::failures::FailureCollector;
use crate::logging::{LogLevel, StepLogger};
use crate::modules::ModuleRegistry;

/// Outcome classification for one pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStatus {
    Completed,
    CompletedWithFailures,
    Failed,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::CompletedWithFailures => write!(f, "completed_with_failures"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of one pipeline execution
#[derive(Debug)]
pub struct WorkflowResult {
    pub success: bool,
    pub status: WorkflowStatus,
    pub summary: String,
    pub failure_count: usize,
    pub total_items_processed: u64,
    /// The matrix entry this result belongs to, when running a matrix
    pub matrix_entry: Option<Map<String, Value>>,
    /// Access to the captured failure records
    pub failures: FailureCollector,
}

/// Result of a workflow execution: one pipeline, or one per matrix entry
#[derive(Debug)]
pub enum ExecutionReport {
    Single(WorkflowResult),
    Matrix(Vec<WorkflowResult>),
}

impl ExecutionReport {
    /// All pipeline results, in matrix input order
    pub fn results(&self) -> Vec<&WorkflowResult> {
        match self {
            Self::Single(result) => vec![result],
            Self::Matrix(results) => results.iter().collect(),
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.results().iter().all(|r| r.success)
    }
}

/// Main orchestrator for executing stacflow workflows
pub struct StacManager {
    workflow: WorkflowDefinition,
    registry: ModuleRegistry,
    checkpoint_dir: PathBuf,
    log_level: LogLevel,
    execution_order: Vec<String>,
}

impl StacManager {
    /// Create a manager over the built-in module registry.
    ///
    /// The DAG is compiled and the workflow validated here; configuration
    /// problems fail construction and the engine produces no partial work.
    pub fn new(workflow: WorkflowDefinition) -> StacflowResult<Self> {
        Self::with_registry(workflow, ModuleRegistry::builtin())
    }

    /// Create a manager over a custom module registry
    pub fn with_registry(
        workflow: WorkflowDefinition,
        registry: ModuleRegistry,
    ) -> StacflowResult<Self> {
        // Cycles and unknown dependencies surface as typed errors
        let dag = DagBuilder::build(&workflow)?;
        let execution_order = dag.topological_order()?;

        let validation = WorkflowValidator::validate(&workflow, &registry)?;
        if !validation.is_valid() {
            return Err(StacflowError::InvalidWorkflow {
                reason: validation.errors.join("; "),
                help: None,
            });
        }

        let log_level = workflow.settings.logging.level.unwrap_or_default();

        tracing::info!(
            target: "stacflow::manager",
            workflow = %workflow.name,
            steps = workflow.steps.len(),
            "Initialized workflow"
        );
        tracing::debug!(
            target: "stacflow::manager",
            order = ?execution_order,
            "Execution order"
        );

        Ok(Self {
            workflow,
            registry,
            checkpoint_dir: PathBuf::from("./checkpoints"),
            log_level,
            execution_order,
        })
    }

    /// Override the checkpoint root directory (default `./checkpoints`)
    pub fn checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = dir.into();
        self
    }

    /// Default log level when the workflow's settings don't declare one
    pub fn log_level(mut self, level: LogLevel) -> Self {
        if self.workflow.settings.logging.level.is_none() {
            self.log_level = level;
        }
        self
    }

    /// Cached topological execution order
    pub fn execution_order(&self) -> &[String] {
        &self.execution_order
    }

    /// Execute the configured workflow.
    ///
    /// Never returns an error: fatal runtime problems become `failed`
    /// results with a `Critical error: …` summary.
    pub async fn execute(&self) -> ExecutionReport {
        match self.workflow.matrix() {
            Some(entries) => ExecutionReport::Matrix(self.execute_matrix(entries).await),
            None => ExecutionReport::Single(self.execute_single(None).await),
        }
    }

    /// Run one pipeline per matrix entry concurrently. One entry's fatal
    /// error does not abort its siblings; results keep input order.
    async fn execute_matrix(&self, entries: &[Map<String, Value>]) -> Vec<WorkflowResult> {
        tracing::info!(
            target: "stacflow::manager",
            workflow = %self.workflow.name,
            pipelines = entries.len(),
            "Executing matrix strategy"
        );

        let pipelines = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| self.execute_single(Some((index, entry))));
        let results = futures::future::join_all(pipelines).await;

        let succeeded = results.iter().filter(|r| r.success).count();
        tracing::info!(
            target: "stacflow::manager",
            workflow = %self.workflow.name,
            "Matrix strategy completed: {succeeded}/{} pipelines succeeded",
            results.len()
        );

        results
    }

    async fn execute_single(&self, matrix_entry: Option<(usize, &Map<String, Value>)>) -> WorkflowResult {
        let entry = matrix_entry.map(|(_, entry)| entry.clone());
        let collection_id = entry
            .as_ref()
            .and_then(|e| e.get("collection_id"))
            .and_then(Value::as_str)
            .unwrap_or("default")
            .to_string();

        let workflow_id = match matrix_entry {
            Some((_, entry)) if entry.get("collection_id").and_then(Value::as_str).is_some() => {
                format!("{}-{}", self.workflow.name, collection_id)
            }
            Some((index, _)) => format!("{}-entry{}", self.workflow.name, index),
            None => self.workflow.name.clone(),
        };

        let logger = StepLogger::for_workflow(&workflow_id, self.log_level);
        logger.info(format!("Starting workflow '{workflow_id}'"));

        let failures = FailureCollector::new();

        let store = match CheckpointStore::new(
            &workflow_id,
            &collection_id,
            &self.checkpoint_dir,
            self.workflow.resume_from_checkpoint,
        ) {
            Ok(store) => store,
            Err(e) => {
                logger.error(format!("Critical error in workflow '{workflow_id}': {e}"));
                return Self::failed_result(e, entry, failures);
            }
        };

        let ctx = Arc::new(WorkflowContext::new(
            workflow_id.clone(),
            logger.clone(),
            failures.clone(),
            CheckpointHandle::new(store),
            entry.clone().unwrap_or_default(),
        ));

        let total_items = match self.run_pipeline(ctx).await {
            Ok(total) => total,
            Err(e) => {
                logger.error(format!("Critical error in workflow '{workflow_id}': {e}"));
                return Self::failed_result(e, entry, failures);
            }
        };

        let failure_count = failures.len();
        let (success, status) = derive_status(total_items, failure_count);

        logger.info(format!(
            "Workflow '{workflow_id}' {status}: {total_items} items processed, {failure_count} failures"
        ));

        WorkflowResult {
            success,
            status,
            summary: format!("Processed {total_items} items with {failure_count} failures"),
            failure_count,
            total_items_processed: total_items,
            matrix_entry: entry,
            failures,
        }
    }

    async fn run_pipeline(&self, ctx: Arc<WorkflowContext>) -> StacflowResult<u64> {
        let steps = self.instantiate_modules(&ctx)?;
        StreamExecutor::run(steps, ctx).await
    }

    /// Instantiate all modules in execution order, merging the context's
    /// matrix data into each step config (matrix keys win), and inject
    /// step-specific loggers.
    fn instantiate_modules(&self, ctx: &Arc<WorkflowContext>) -> StacflowResult<Vec<ExecutionStep>> {
        let mut steps = Vec::with_capacity(self.execution_order.len());

        for step_id in &self.execution_order {
            let step = self
                .workflow
                .get_step(step_id)
                .expect("execution order only contains declared steps");

            let mut merged = step.config.clone();
            for (key, value) in &ctx.data {
                merged.insert(key.clone(), value.clone());
            }

            let mut module =
                self.registry
                    .instantiate(&step.module, &merged)
                    .map_err(|e| match e {
                        StacflowError::UnknownModule { .. } => e,
                        other => StacflowError::ModuleInit {
                            step: step_id.clone(),
                            reason: other.to_string(),
                        },
                    })?;

            let level = step.log_level.unwrap_or(self.log_level);
            module.set_logger(StepLogger::new(&ctx.workflow_id, step_id, level));
            ctx.logger
                .debug(format!("Instantiated {} for step '{step_id}'", step.module));

            steps.push(ExecutionStep { id: step_id.clone(), module });
        }

        Ok(steps)
    }

    fn failed_result(
        error: StacflowError,
        matrix_entry: Option<Map<String, Value>>,
        failures: FailureCollector,
    ) -> WorkflowResult {
        WorkflowResult {
            success: false,
            status: WorkflowStatus::Failed,
            summary: format!("Critical error: {error}"),
            failure_count: failures.len(),
            total_items_processed: 0,
            matrix_entry,
            failures,
        }
    }
}

/// Status truth table: no items is a failure, failures below the item
/// count still count as success, failures at or above it do not.
fn derive_status(total_items: u64, failure_count: usize) -> (bool, WorkflowStatus) {
    if total_items == 0 {
        (false, WorkflowStatus::Failed)
    } else if failure_count == 0 {
        (true, WorkflowStatus::Completed)
    } else if (failure_count as u64) < total_items {
        (true, WorkflowStatus::CompletedWithFailures)
    } else {
        (false, WorkflowStatus::Failed)
    }
}
