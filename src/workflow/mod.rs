// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Workflow definitions and orchestration
//!
//! This module defines the workflow document schema, the DAG compiler,
//! pre-execution validation, the stream executor, and the orchestration
//! facade.

mod dag;
mod definition;
mod executor;
mod manager;
mod validation;

pub use dag::DagBuilder;
pub use definition::*;
pub use executor::{ExecutionStep, StreamExecutor};
pub use manager::{ExecutionReport, StacManager, WorkflowResult, WorkflowStatus};
pub use validation::{ValidationResult, WorkflowValidator};
