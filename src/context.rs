// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Workflow execution context
//!
//! One context is constructed per pipeline and shared by every step. It
//! bundles the workflow-scoped logger, the failure collector, the checkpoint
//! handle, and the inter-step data bag. During execution the context lives
//! behind an `Arc`, so the bag is read-only while items flow; matrix entries
//! get their own bag through [`WorkflowContext::fork`].

use serde_json::{Map, Value};

use crate::checkpoint::CheckpointHandle;
use crate::failures::FailureCollector;
use crate::logging::StepLogger;

/// Shared per-run state passed to all pipeline steps
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    /// Workflow id, suffixed with the collection id for matrix entries
    pub workflow_id: String,
    /// Workflow-scoped logger (steps receive their own via `set_logger`)
    pub logger: StepLogger,
    failures: FailureCollector,
    checkpoints: CheckpointHandle,
    /// Cross-step data bag, seeded with the matrix entry
    pub data: Map<String, Value>,
}

impl WorkflowContext {
    pub fn new(
        workflow_id: impl Into<String>,
        logger: StepLogger,
        failures: FailureCollector,
        checkpoints: CheckpointHandle,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            logger,
            failures,
            checkpoints,
            data,
        }
    }

    /// The shared failure collector
    pub fn failures(&self) -> &FailureCollector {
        &self.failures
    }

    /// The checkpoint handle for this pipeline
    pub fn checkpoints(&self) -> &CheckpointHandle {
        &self.checkpoints
    }

    /// String value from the data bag, if present
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Child context with the overlay merged over this bag. Overlay keys
    /// win on collision; logger, collector, and checkpoints are shared.
    pub fn fork(&self, overlay: &Map<String, Value>) -> Self {
        let mut data = self.data.clone();
        for (key, value) in overlay {
            data.insert(key.clone(), value.clone());
        }

        Self {
            workflow_id: self.workflow_id.clone(),
            logger: self.logger.clone(),
            failures: self.failures.clone(),
            checkpoints: self.checkpoints.clone(),
            data,
        }
    }
}
