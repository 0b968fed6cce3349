// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Step-scoped logging
//!
//! Every pipeline step gets a [`StepLogger`] bound to the workflow id, the
//! step id, and an effective log level. The level is inherited from the
//! workflow unless the step declares its own `log_level`. Events below the
//! effective level are suppressed before they reach the tracing subscriber,
//! so a single workflow can mix quiet and chatty steps.

use serde::{Deserialize, Serialize};

/// Tracing target for all step-scoped events.
const TRACING_TARGET: &str = "stacflow::step";

/// Log level accepted by workflow documents
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    #[serde(rename = "DEBUG", alias = "debug")]
    Debug,
    #[serde(rename = "INFO", alias = "info")]
    Info,
    #[serde(rename = "WARNING", alias = "warning", alias = "WARN", alias = "warn")]
    Warning,
    #[serde(rename = "ERROR", alias = "error")]
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// Logger handle scoped to one step of one workflow run
#[derive(Debug, Clone)]
pub struct StepLogger {
    workflow_id: String,
    step_id: String,
    level: LogLevel,
}

impl StepLogger {
    /// Create a logger for a step, with its effective level already resolved
    pub fn new(workflow_id: impl Into<String>, step_id: impl Into<String>, level: LogLevel) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            step_id: step_id.into(),
            level,
        }
    }

    /// Workflow-scoped logger (step id "workflow"), used by the manager itself
    pub fn for_workflow(workflow_id: impl Into<String>, level: LogLevel) -> Self {
        Self::new(workflow_id, "workflow", level)
    }

    /// Derive a logger for another step, keeping the workflow id and level
    pub fn for_step(&self, step_id: impl Into<String>, level: Option<LogLevel>) -> Self {
        Self {
            workflow_id: self.workflow_id.clone(),
            step_id: step_id.into(),
            level: level.unwrap_or(self.level),
        }
    }

    /// The step this logger is bound to
    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    /// The effective level of this logger
    pub fn level(&self) -> LogLevel {
        self.level
    }

    fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        if self.enabled(LogLevel::Debug) {
            tracing::debug!(
                target: TRACING_TARGET,
                workflow = %self.workflow_id,
                step = %self.step_id,
                "{}",
                message.as_ref()
            );
        }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        if self.enabled(LogLevel::Info) {
            tracing::info!(
                target: TRACING_TARGET,
                workflow = %self.workflow_id,
                step = %self.step_id,
                "{}",
                message.as_ref()
            );
        }
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        if self.enabled(LogLevel::Warning) {
            tracing::warn!(
                target: TRACING_TARGET,
                workflow = %self.workflow_id,
                step = %self.step_id,
                "{}",
                message.as_ref()
            );
        }
    }

    pub fn error(&self, message: impl AsRef<str>) {
        if self.enabled(LogLevel::Error) {
            tracing::error!(
                target: TRACING_TARGET,
                workflow = %self.workflow_id,
                step = %self.step_id,
                "{}",
                message.as_ref()
            );
        }
    }
}
