// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Workflow definition structures
//!
//! Defines the schema for workflow YAML documents: the step list, the
//! optional matrix strategy, and run settings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::logging::LogLevel;
use crate::modules::ModuleConfig;

/// Workflow definition from a YAML document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Workflow name; participates in the checkpoint directory path
    pub name: String,

    /// Workflow description
    #[serde(default)]
    pub description: Option<String>,

    /// Document version (for future compatibility)
    #[serde(default = "default_version")]
    pub version: String,

    /// Execution strategy (matrix expansion)
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Run settings
    #[serde(default)]
    pub settings: SettingsConfig,

    /// Load completed-item state from existing checkpoints
    #[serde(default = "default_true")]
    pub resume_from_checkpoint: bool,

    /// Steps forming the pipeline DAG
    pub steps: Vec<StepDefinition>,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_true() -> bool {
    true
}

impl WorkflowDefinition {
    /// Load a workflow from a YAML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::StacflowError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::StacflowError::FileReadError {
                path: path.to_path_buf(),
                error: e.to_string(),
            }
        })?;

        Self::from_yaml(&content)
    }

    /// Parse a workflow from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, crate::StacflowError> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Serialize the workflow to YAML
    pub fn to_yaml(&self) -> Result<String, crate::StacflowError> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Get a step by id
    pub fn get_step(&self, id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// All step ids, in document order
    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id.as_str()).collect()
    }

    /// The matrix entries, when a non-empty matrix strategy is configured
    pub fn matrix(&self) -> Option<&[Map<String, Value>]> {
        self.strategy
            .matrix
            .as_deref()
            .filter(|entries| !entries.is_empty())
    }
}

/// A single workflow step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Step id (must be unique within the workflow)
    pub id: String,

    /// Module name; must resolve in the registry
    pub module: String,

    /// Opaque config mapping handed to the module constructor
    #[serde(default)]
    pub config: ModuleConfig,

    /// Step dependencies (other step ids)
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Override the inherited log level for this step's logger
    #[serde(default)]
    pub log_level: Option<LogLevel>,
}

/// Execution strategy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// One pipeline runs per entry; each entry's map is merged into every
    /// step's config and into the forked context data bag
    #[serde(default)]
    pub matrix: Option<Vec<Map<String, Value>>>,
}

/// Run settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Logging settings block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Workflow-wide log level; overrides the externally supplied default
    #[serde(default)]
    pub level: Option<LogLevel>,
}
