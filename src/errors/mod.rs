// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Error types for the pipeline engine
//!
//! A single error enum covers configuration problems (raised before any
//! pipeline work starts), fatal runtime errors (which abort one pipeline),
//! and item-level data errors (which are captured into the failure
//! collector and never propagate).

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for stacflow operations
pub type StacflowResult<T> = Result<T, StacflowError>;

/// Main error type for stacflow
#[derive(Error, Debug, Diagnostic)]
pub enum StacflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Workflow file not found: {path}")]
    #[diagnostic(
        code(stacflow::workflow_not_found),
        help("Check the path, or pass one explicitly with '--workflow'")
    )]
    WorkflowNotFound { path: PathBuf },

    #[error("Invalid workflow configuration: {reason}")]
    #[diagnostic(code(stacflow::invalid_workflow))]
    InvalidWorkflow {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Step '{step}' is invalid: {reason}")]
    #[diagnostic(code(stacflow::invalid_step))]
    InvalidStep { step: String, reason: String },

    #[error("Cycle detected in step dependencies: {}", steps.join(", "))]
    #[diagnostic(
        code(stacflow::circular_dependency),
        help("Review the depends_on declarations of the listed steps to break the cycle")
    )]
    CircularDependency { steps: Vec<String> },

    #[error("Step '{step}' depends on unknown step '{dependency}'")]
    #[diagnostic(
        code(stacflow::unknown_dependency),
        help("Check that '{dependency}' is declared in the workflow's steps")
    )]
    UnknownDependency { step: String, dependency: String },

    #[error("Unknown module: {module}")]
    #[diagnostic(
        code(stacflow::unknown_module),
        help("Available modules: StaticSourceModule, SeedModule, IngestModule, TransformModule, ScaffoldModule, ExtensionModule, UpdateModule, ValidateModule, OutputModule")
    )]
    UnknownModule { module: String },

    #[error("Failed to instantiate module for step '{step}': {reason}")]
    #[diagnostic(code(stacflow::module_init))]
    ModuleInit { step: String, reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Step '{step}' has no input stream")]
    #[diagnostic(
        code(stacflow::missing_source),
        help("A pipeline must begin with exactly one source step")
    )]
    MissingSource { step: String },

    #[error("Execution failed: {message}")]
    #[diagnostic(code(stacflow::execution_failed))]
    ExecutionFailed {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Sink '{step}' failed to finalize: {reason}")]
    #[diagnostic(code(stacflow::finalize_failed))]
    FinalizeFailed { step: String, reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Item-level Data Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Data error: {message}")]
    #[diagnostic(code(stacflow::data_processing))]
    DataProcessing { message: String },

    #[error("Validation failed: {message}")]
    #[diagnostic(code(stacflow::validation))]
    Validation { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Checkpoint Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Checkpoint error: {message}")]
    #[diagnostic(code(stacflow::checkpoint))]
    Checkpoint { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("File not found: {path}")]
    #[diagnostic(code(stacflow::file_not_found))]
    FileNotFound {
        path: PathBuf,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(stacflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(stacflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(stacflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(stacflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(stacflow::json_error))]
    Json { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(stacflow::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for StacflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for StacflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for StacflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<glob::PatternError> for StacflowError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl StacflowError {
    /// Short stable label for this error, used as the `error_kind` of
    /// failure records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WorkflowNotFound { .. } => "WorkflowNotFound",
            Self::InvalidWorkflow { .. } => "InvalidWorkflow",
            Self::InvalidStep { .. } => "InvalidStep",
            Self::CircularDependency { .. } => "CircularDependency",
            Self::UnknownDependency { .. } => "UnknownDependency",
            Self::UnknownModule { .. } => "UnknownModule",
            Self::ModuleInit { .. } => "ModuleInit",
            Self::MissingSource { .. } => "MissingSource",
            Self::ExecutionFailed { .. } => "ExecutionFailed",
            Self::FinalizeFailed { .. } => "FinalizeFailed",
            Self::DataProcessing { .. } => "DataProcessing",
            Self::Validation { .. } => "Validation",
            Self::Checkpoint { .. } => "Checkpoint",
            Self::FileNotFound { .. } => "FileNotFound",
            Self::FileReadError { .. } => "FileReadError",
            Self::FileWriteError { .. } => "FileWriteError",
            Self::Io { .. } => "Io",
            Self::Yaml { .. } => "Yaml",
            Self::Json { .. } => "Json",
            Self::GlobPattern { .. } => "GlobPattern",
        }
    }

    /// Create a data-processing error from any displayable cause
    pub fn data(message: impl Into<String>) -> Self {
        Self::DataProcessing { message: message.into() }
    }

    /// Create a checkpoint error from any displayable cause
    pub fn checkpoint(message: impl std::fmt::Display) -> Self {
        Self::Checkpoint { message: message.to_string() }
    }
}
