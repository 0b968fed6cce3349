// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! # stacflow - STAC item pipeline engine
//!
//! `stacflow` executes declarative workflows that build, enrich, validate,
//! and emit STAC (SpatioTemporal Asset Catalog) item records.
//!
//! ## Features
//!
//! - **Declarative workflows** - a YAML document declares a DAG of typed
//!   steps, compiled and validated before anything runs
//! - **Streaming execution** - items flow lazily from one source through
//!   transformers into one sink, with natural backpressure
//! - **Failure isolation** - item-level errors are collected and reported;
//!   the pipeline keeps going
//! - **Checkpointing** - completed items are tracked in Parquet files so
//!   interrupted runs resume without repeating work
//! - **Matrix strategy** - one workflow fans out into parallel pipelines,
//!   one per parameter map
//!
//! ## Quick Start
//!
//! ```bash
//! # Check the workflow document
//! stacflow validate
//!
//! # Run it
//! stacflow run
//!
//! # Render the step DAG
//! stacflow graph --format mermaid
//! ```

pub mod checkpoint;
pub mod cli;
pub mod context;
pub mod errors;
pub mod failures;
pub mod logging;
pub mod modules;
pub mod utils;
pub mod workflow;

// Re-export commonly used types
pub use checkpoint::{CheckpointHandle, CheckpointRecord, CheckpointStore};
pub use context::WorkflowContext;
pub use errors::{StacflowError, StacflowResult};
pub use failures::{FailureCollector, FailureRecord};
pub use logging::{LogLevel, StepLogger};
pub use modules::{Item, ItemStream, Module, ModuleRegistry, Sink, Source, Transform};
pub use workflow::{
    ExecutionReport, StacManager, StepDefinition, WorkflowDefinition, WorkflowResult,
    WorkflowStatus,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
